pub mod config;
pub mod dispatch;
pub mod index;
pub mod resolver;
pub mod taxonomy;

pub use crate::config::EngineConfig;
pub use crate::dispatch::Dispatcher;
pub use crate::index::{IndexStats, ReferenceIndex};
pub use crate::resolver::{resolve, validate_at_rank, MatchedRank, ResolutionResult};
pub use crate::taxonomy::{LineageRecord, RankQuery, TaxonomicRank};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinnaeusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LinnaeusError>;
