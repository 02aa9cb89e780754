//! Parsed reference rows and species-epithet derivation

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::rank::TaxonomicRank;

/// Markers that disqualify a derived species epithet from being indexed.
/// Checked against the lowercased value.
const SPECIES_QUALIFIERS: [&str; 6] = ["sp.", "cf.", "aff.", "subsp.", "var.", "x "];

/// One parsed row of a ranked-lineage reference dump.
///
/// Immutable once constructed; the index shares records across its maps via
/// `Arc` rather than cloning them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Opaque taxonomic identifier (first dump column, kept as a string)
    pub tax_id: String,
    pub scientific_name: String,
    /// Bare species epithet derived from the raw species column, with the
    /// genus prefix stripped; `None` when absent or qualifier-bearing
    pub species: Option<String>,
    pub genus: String,
    pub family: String,
    pub order: String,
    pub class: String,
    pub phylum: String,
    pub kingdom: String,
    pub superkingdom: String,
}

impl LineageRecord {
    /// Build a record from trimmed dump fields. The caller guarantees at
    /// least 10 fields; anything past index 9 is ignored.
    pub fn from_fields(fields: &[&str]) -> Self {
        let genus = fields[3];
        let species = derive_species(fields[2], genus, fields[1]);

        Self {
            tax_id: fields[0].to_string(),
            scientific_name: fields[1].to_string(),
            species,
            genus: genus.to_string(),
            family: fields[4].to_string(),
            order: fields[5].to_string(),
            class: fields[6].to_string(),
            phylum: fields[7].to_string(),
            kingdom: fields[8].to_string(),
            superkingdom: fields[9].to_string(),
        }
    }

    /// Value at a rank, empty string when the record lacks one
    pub fn rank_value(&self, rank: TaxonomicRank) -> &str {
        match rank {
            TaxonomicRank::Superkingdom => &self.superkingdom,
            TaxonomicRank::Kingdom => &self.kingdom,
            TaxonomicRank::Phylum => &self.phylum,
            TaxonomicRank::Class => &self.class,
            TaxonomicRank::Order => &self.order,
            TaxonomicRank::Family => &self.family,
            TaxonomicRank::Genus => &self.genus,
            TaxonomicRank::Species => self.species.as_deref().unwrap_or(""),
        }
    }

    /// `rank:value` pairs joined with `;` in lineage display order
    pub fn lineage_string(&self) -> String {
        let mut out = String::new();
        for (i, rank) in TaxonomicRank::LINEAGE_ORDER.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let _ = write!(out, "{}:{}", rank, self.rank_value(*rank));
        }
        out
    }
}

/// Byte-prefix comparison that never panics on a char boundary; taxon names
/// in the dumps are ASCII latin, so ASCII case folding is sufficient here.
pub(crate) fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

/// Derive the bare species epithet from the raw dump columns.
///
/// The species column takes precedence, with a duplicated genus prefix
/// stripped case-insensitively. When the species column is empty, fall back
/// to the scientific name, but only if it starts with the genus exactly
/// (legacy behavior: this check is case-sensitive).
fn derive_species(species_field: &str, genus: &str, scientific_name: &str) -> Option<String> {
    let raw = if !species_field.is_empty() {
        if !genus.is_empty() && starts_with_ignore_case(species_field, genus) {
            species_field[genus.len()..].trim().to_string()
        } else {
            species_field.to_string()
        }
    } else if !genus.is_empty() && scientific_name.starts_with(genus) {
        scientific_name[genus.len()..].trim().to_string()
    } else {
        return None;
    };

    if raw.is_empty() {
        return None;
    }

    let lower = raw.to_lowercase();
    if SPECIES_QUALIFIERS.iter().any(|q| lower.contains(q)) {
        return None;
    }

    Some(raw)
}
