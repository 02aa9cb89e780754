pub mod query;
pub mod rank;
pub mod record;

// Re-export commonly used types
pub use query::{require_columns, RankQuery, REQUIRED_COLUMNS};
pub use rank::TaxonomicRank;
pub use record::LineageRecord;
