/// Taxonomic ranks handled by the resolution engine
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard taxonomic ranks from superkingdom down to species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomicRank {
    Superkingdom,
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl TaxonomicRank {
    /// Ranks attempted (and validated) when neither species nor genus
    /// produced a match, most specific first
    pub const FALLBACK_ORDER: [TaxonomicRank; 4] = [
        TaxonomicRank::Family,
        TaxonomicRank::Order,
        TaxonomicRank::Class,
        TaxonomicRank::Phylum,
    ];

    /// Display order for lineage strings
    pub const LINEAGE_ORDER: [TaxonomicRank; 8] = [
        TaxonomicRank::Superkingdom,
        TaxonomicRank::Kingdom,
        TaxonomicRank::Phylum,
        TaxonomicRank::Class,
        TaxonomicRank::Order,
        TaxonomicRank::Family,
        TaxonomicRank::Genus,
        TaxonomicRank::Species,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superkingdom => "superkingdom",
            Self::Kingdom => "kingdom",
            Self::Phylum => "phylum",
            Self::Class => "class",
            Self::Order => "order",
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
        }
    }
}

impl fmt::Display for TaxonomicRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_order_most_specific_first() {
        assert_eq!(TaxonomicRank::FALLBACK_ORDER[0], TaxonomicRank::Family);
        assert_eq!(TaxonomicRank::FALLBACK_ORDER[3], TaxonomicRank::Phylum);
    }

    #[test]
    fn test_display_matches_reference_labels() {
        assert_eq!(TaxonomicRank::Superkingdom.to_string(), "superkingdom");
        assert_eq!(TaxonomicRank::Class.to_string(), "class");
        assert_eq!(TaxonomicRank::Species.to_string(), "species");
    }
}
