//! Per-specimen rank queries

use serde::{Deserialize, Serialize};

use super::rank::TaxonomicRank;
use crate::{LinnaeusError, Result};

/// Placeholder values a record source may carry for an unreported rank.
/// Treated the same as an empty cell.
const MISSING_SENTINELS: [&str; 3] = ["not collected", "not found", "unknown"];

/// The taxonomy columns a record source must supply before a batch starts
pub const REQUIRED_COLUMNS: [&str; 6] = ["phylum", "class", "order", "family", "genus", "species"];

/// Rank values reported for one specimen.
///
/// `None` means "not provided" and is never matched against. Constructing
/// through [`RankQuery::from_raw`] normalizes empty cells and the usual
/// placeholder sentinels to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankQuery {
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
}

impl RankQuery {
    /// Build a query from raw column values, normalizing blanks and sentinels
    pub fn from_raw(
        phylum: &str,
        class: &str,
        order: &str,
        family: &str,
        genus: &str,
        species: &str,
    ) -> Self {
        Self {
            phylum: normalize(phylum),
            class: normalize(class),
            order: normalize(order),
            family: normalize(family),
            genus: normalize(genus),
            species: normalize(species),
        }
    }

    /// Value provided for a rank, if any. Superkingdom and kingdom are not
    /// query ranks and always return `None`.
    pub fn rank_value(&self, rank: TaxonomicRank) -> Option<&str> {
        match rank {
            TaxonomicRank::Phylum => self.phylum.as_deref(),
            TaxonomicRank::Class => self.class.as_deref(),
            TaxonomicRank::Order => self.order.as_deref(),
            TaxonomicRank::Family => self.family.as_deref(),
            TaxonomicRank::Genus => self.genus.as_deref(),
            TaxonomicRank::Species => self.species.as_deref(),
            TaxonomicRank::Superkingdom | TaxonomicRank::Kingdom => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phylum.is_none()
            && self.class.is_none()
            && self.order.is_none()
            && self.family.is_none()
            && self.genus.is_none()
            && self.species.is_none()
    }
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || MISSING_SENTINELS
            .iter()
            .any(|s| trimmed.eq_ignore_ascii_case(s))
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Fail fast when a record source lacks any of the six taxonomy columns.
/// Column names are matched case-insensitively.
pub fn require_columns<S: AsRef<str>>(available: &[S]) -> Result<()> {
    let lowered: Vec<String> = available
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !lowered.iter().any(|col| col == *required))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LinnaeusError::Configuration(format!(
            "record source is missing taxonomy columns: {}",
            missing.join(", ")
        )))
    }
}
