//! Hierarchical query resolution against a shared reference index
//!
//! The resolver is a pure function over an immutable [`ReferenceIndex`]:
//! no shared mutable state, fully re-entrant, safe to call concurrently
//! from any number of worker threads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineConfig;
use crate::index::ReferenceIndex;
use crate::taxonomy::record::starts_with_ignore_case;
use crate::taxonomy::{LineageRecord, RankQuery, TaxonomicRank};

/// The most specific rank at which a query validated against a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedRank {
    Species,
    Genus,
    Family,
    Order,
    Class,
    Phylum,
    Unmatched,
    Error,
}

impl MatchedRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Genus => "genus",
            Self::Family => "family",
            Self::Order => "order",
            Self::Class => "class",
            Self::Phylum => "phylum",
            Self::Unmatched => "unmatched",
            Self::Error => "error",
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Unmatched | Self::Error)
    }
}

impl fmt::Display for MatchedRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<TaxonomicRank> for MatchedRank {
    fn from(rank: TaxonomicRank) -> Self {
        match rank {
            TaxonomicRank::Species => Self::Species,
            TaxonomicRank::Genus => Self::Genus,
            TaxonomicRank::Family => Self::Family,
            TaxonomicRank::Order => Self::Order,
            TaxonomicRank::Class => Self::Class,
            TaxonomicRank::Phylum => Self::Phylum,
            // Superkingdom and kingdom are never attempted as match ranks
            TaxonomicRank::Superkingdom | TaxonomicRank::Kingdom => Self::Unmatched,
        }
    }
}

/// Outcome of resolving one specimen query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Resolved identifier, `None` when unmatched
    pub tax_id: Option<String>,
    pub matched_rank: MatchedRank,
    /// Lineage string of the matched candidate record (not the query)
    pub lineage: Option<String>,
    /// Never set by the current algorithm; kept for forward compatibility
    pub mismatch: bool,
}

impl ResolutionResult {
    pub fn unmatched() -> Self {
        Self {
            tax_id: None,
            matched_rank: MatchedRank::Unmatched,
            lineage: None,
            mismatch: false,
        }
    }

    pub(crate) fn error() -> Self {
        Self {
            tax_id: Some("error".to_string()),
            matched_rank: MatchedRank::Error,
            lineage: None,
            mismatch: false,
        }
    }

    fn accepted(record: &LineageRecord, rank: MatchedRank) -> Self {
        Self {
            tax_id: Some(record.tax_id.clone()),
            matched_rank: rank,
            lineage: Some(record.lineage_string()),
            mismatch: false,
        }
    }

    /// Identifier column value for a downstream row writer
    pub fn taxid_or<'a>(&'a self, sentinel: &'a str) -> &'a str {
        self.tax_id.as_deref().unwrap_or(sentinel)
    }

    /// Lineage column value for a downstream row writer
    pub fn lineage_or<'a>(&'a self, sentinel: &'a str) -> &'a str {
        self.lineage.as_deref().unwrap_or(sentinel)
    }

    /// `Yes`/`No` column value for the mismatch flag
    pub fn mismatch_label(&self) -> &'static str {
        if self.mismatch {
            "Yes"
        } else {
            "No"
        }
    }
}

/// Case-insensitive agreement check between a candidate lineage and a query
/// at exactly one rank. False when either side lacks a value. Never cascades
/// internally.
pub fn validate_at_rank(candidate: &LineageRecord, query: &RankQuery, rank: TaxonomicRank) -> bool {
    let Some(target) = query.rank_value(rank) else {
        return false;
    };
    let value = candidate.rank_value(rank);
    if value.is_empty() {
        return false;
    }
    value.to_lowercase() == target.to_lowercase()
}

/// Validation gate for species- and genus-level hits.
///
/// The legacy pipeline checked family only; the cascading mode additionally
/// tries order, class and phylum, accepting on the first rank that agrees.
fn validation_passes(candidate: &LineageRecord, query: &RankQuery, config: &EngineConfig) -> bool {
    if config.cascade_validation {
        TaxonomicRank::FALLBACK_ORDER
            .iter()
            .any(|rank| validate_at_rank(candidate, query, *rank))
    } else {
        validate_at_rank(candidate, query, TaxonomicRank::Family)
    }
}

fn strip_genus_prefix<'a>(species: &'a str, genus: &'a str) -> &'a str {
    if starts_with_ignore_case(species, genus) {
        species[genus.len()..].trim()
    } else {
        species
    }
}

/// Resolve one specimen query with fixed precedence: species, then genus,
/// then each of family, order, class and phylum.
///
/// Whenever a rank yields multiple candidates, the first one in
/// reference-file encounter order that passes validation wins; later
/// candidates are never consulted.
pub fn resolve(
    index: &ReferenceIndex,
    query: &RankQuery,
    config: &EngineConfig,
) -> ResolutionResult {
    // Species attempt: needs both genus and species
    if let (Some(genus), Some(species)) = (query.genus.as_deref(), query.species.as_deref()) {
        let epithet = strip_genus_prefix(species, genus);
        if let Some(record) = index.species(genus, epithet) {
            if validation_passes(record, query, config) {
                return ResolutionResult::accepted(record, MatchedRank::Species);
            }
        }
    }

    // Genus attempt
    if let Some(genus) = query.genus.as_deref() {
        for record in index.candidates_at(TaxonomicRank::Genus, genus) {
            if validation_passes(record, query, config) {
                return ResolutionResult::accepted(record, MatchedRank::Genus);
            }
        }
    }

    // Fall back rank by rank, validating only at the attempted rank
    for rank in TaxonomicRank::FALLBACK_ORDER {
        if let Some(value) = query.rank_value(rank) {
            for record in index.candidates_at(rank, value) {
                if validate_at_rank(record, query, rank) {
                    return ResolutionResult::accepted(record, MatchedRank::from(rank));
                }
            }
        }
    }

    ResolutionResult::unmatched()
}
