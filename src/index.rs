//! Multi-keyed reference index over ranked-lineage dumps
//!
//! The index is built once per batch run in a single streamed pass and never
//! mutated afterwards, so any number of resolver threads can share it
//! without synchronization.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::taxonomy::{LineageRecord, TaxonomicRank};
use crate::Result;

/// Running counts kept during a build.
///
/// Exposed so a caller that owns progress reporting can render them; the
/// builder itself only emits `tracing` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Lines parsed into records
    pub lines_indexed: u64,
    /// Lines dropped for having fewer than 10 fields
    pub lines_skipped: u64,
    /// Records that contributed a `genus species` composite key
    pub species_indexed: u64,
    pub scientific_names: usize,
    pub species_keys: usize,
    pub genera: usize,
    pub families: usize,
    pub orders: usize,
    pub classes: usize,
    pub phyla: usize,
}

/// Immutable multi-keyed index over a ranked-lineage reference file.
///
/// Single-valued maps (scientific name, `genus species`) keep the last
/// occurrence on key collision. Multi-valued maps keep every record in file
/// encounter order; the same `Arc<LineageRecord>` is shared across all maps
/// it appears in.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    by_scientific_name: HashMap<String, Arc<LineageRecord>>,
    by_species: HashMap<String, Arc<LineageRecord>>,
    by_genus: HashMap<String, Vec<Arc<LineageRecord>>>,
    by_family: HashMap<String, Vec<Arc<LineageRecord>>>,
    by_order: HashMap<String, Vec<Arc<LineageRecord>>>,
    by_class: HashMap<String, Vec<Arc<LineageRecord>>>,
    by_phylum: HashMap<String, Vec<Arc<LineageRecord>>>,
    stats: IndexStats,
}

impl ReferenceIndex {
    /// Build the index from a reference file. Files ending in `.gz` are
    /// decompressed on the fly. Failing to open the file is the only fatal
    /// error; individual malformed lines are skipped.
    pub fn from_path(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading ranked-lineage reference from {}", path.display());

        let file = File::open(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            Self::from_reader(BufReader::new(GzDecoder::new(file)), config)
        } else {
            Self::from_reader(BufReader::new(file), config)
        }
    }

    /// Build the index from any line-oriented reader. Decoding is lossy:
    /// reference dumps occasionally carry irregular bytes and these must not
    /// abort the build.
    pub fn from_reader(mut reader: impl BufRead, config: &EngineConfig) -> Result<Self> {
        let mut index = ReferenceIndex::default();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&raw);
            let indexed = index.insert_line(line.trim_end_matches(['\n', '\r']));

            if indexed
                && config.progress_interval > 0
                && index.stats.lines_indexed % config.progress_interval == 0
            {
                debug!(
                    lines = index.stats.lines_indexed,
                    species = index.stats.species_indexed,
                    "reference build progress"
                );
            }
        }

        info!(
            lines = index.stats.lines_indexed,
            skipped = index.stats.lines_skipped,
            scientific_names = index.stats.scientific_names,
            species = index.stats.species_keys,
            genera = index.stats.genera,
            families = index.stats.families,
            orders = index.stats.orders,
            classes = index.stats.classes,
            phyla = index.stats.phyla,
            "finished loading taxonomic records"
        );

        Ok(index)
    }

    fn insert_line(&mut self, line: &str) -> bool {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 10 {
            self.stats.lines_skipped += 1;
            return false;
        }

        let record = Arc::new(LineageRecord::from_fields(&fields));
        self.stats.lines_indexed += 1;

        self.by_scientific_name
            .insert(record.scientific_name.to_lowercase(), Arc::clone(&record));

        if let Some(species) = &record.species {
            if !record.genus.is_empty() {
                let key = format!("{} {}", record.genus.to_lowercase(), species.to_lowercase());
                self.by_species.insert(key, Arc::clone(&record));
                self.stats.species_indexed += 1;
            }
        }

        insert_listed(&mut self.by_genus, &record.genus, &record);
        insert_listed(&mut self.by_family, &record.family, &record);
        insert_listed(&mut self.by_order, &record.order, &record);
        insert_listed(&mut self.by_class, &record.class, &record);
        insert_listed(&mut self.by_phylum, &record.phylum, &record);

        self.stats.scientific_names = self.by_scientific_name.len();
        self.stats.species_keys = self.by_species.len();
        self.stats.genera = self.by_genus.len();
        self.stats.families = self.by_family.len();
        self.stats.orders = self.by_order.len();
        self.stats.classes = self.by_class.len();
        self.stats.phyla = self.by_phylum.len();

        true
    }

    /// Look up a record by lowercased scientific name
    pub fn scientific_name(&self, name: &str) -> Option<&Arc<LineageRecord>> {
        self.by_scientific_name.get(&name.to_lowercase())
    }

    /// Look up the `genus species` composite key
    pub fn species(&self, genus: &str, epithet: &str) -> Option<&Arc<LineageRecord>> {
        let key = format!("{} {}", genus.to_lowercase(), epithet.to_lowercase());
        self.by_species.get(&key)
    }

    /// All records carrying `value` at `rank`, in file encounter order.
    /// Empty for ranks without a multi-valued index.
    pub fn candidates_at(&self, rank: TaxonomicRank, value: &str) -> &[Arc<LineageRecord>] {
        let map = match rank {
            TaxonomicRank::Genus => &self.by_genus,
            TaxonomicRank::Family => &self.by_family,
            TaxonomicRank::Order => &self.by_order,
            TaxonomicRank::Class => &self.by_class,
            TaxonomicRank::Phylum => &self.by_phylum,
            _ => return &[],
        };
        map.get(&value.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.stats.lines_indexed == 0
    }
}

fn insert_listed(
    map: &mut HashMap<String, Vec<Arc<LineageRecord>>>,
    value: &str,
    record: &Arc<LineageRecord>,
) {
    if value.is_empty() {
        return;
    }
    map.entry(value.to_lowercase())
        .or_default()
        .push(Arc::clone(record));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REFERENCE: &str = "\
9606|Homo sapiens|sapiens|Homo|Hominidae|Primates|Mammalia|Chordata|Animalia|Eukaryota|
9598|Pan troglodytes|troglodytes|Pan|Hominidae|Primates|Mammalia|Chordata|Animalia|Eukaryota|
9612|Canis sp.|Canis sp.|Canis|Canidae|Carnivora|Mammalia|Chordata|Animalia|Eukaryota|
truncated|line
7227|Drosophila melanogaster|melanogaster|Drosophila|Drosophilidae|Diptera|Insecta|Arthropoda|Animalia|Eukaryota|
";

    fn build(input: &str) -> ReferenceIndex {
        ReferenceIndex::from_reader(input.as_bytes(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_short_lines_skipped_without_error() {
        let index = build(REFERENCE);
        assert_eq!(index.stats().lines_indexed, 4);
        assert_eq!(index.stats().lines_skipped, 1);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_empty_input_builds_empty_index() {
        let index = build("");
        assert!(index.is_empty());
        assert_eq!(index.stats(), &IndexStats::default());
    }

    #[test]
    fn test_scientific_name_lookup_is_lowercased() {
        let index = build(REFERENCE);
        let record = index.scientific_name("HOMO SAPIENS").unwrap();
        assert_eq!(record.tax_id, "9606");
    }

    #[test]
    fn test_scientific_name_last_occurrence_wins() {
        let input = "\
1|Alpha beta|beta|Alpha|FamA|OrdA|ClsA|PhyA|KinA|SupA|
2|Alpha beta|beta|Alpha|FamB|OrdB|ClsB|PhyB|KinB|SupB|
";
        let index = build(input);
        assert_eq!(index.scientific_name("alpha beta").unwrap().tax_id, "2");
        assert_eq!(index.species("Alpha", "beta").unwrap().tax_id, "2");
    }

    #[test]
    fn test_qualifier_species_never_indexed() {
        let index = build(REFERENCE);
        assert!(index.species("Canis", "sp.").is_none());
        assert!(index.species("Canis", "Canis sp.").is_none());
        // The record itself is still reachable through the other indices
        assert_eq!(index.candidates_at(TaxonomicRank::Genus, "canis").len(), 1);
    }

    #[test]
    fn test_candidates_preserve_file_order() {
        let index = build(REFERENCE);
        let hominids = index.candidates_at(TaxonomicRank::Family, "Hominidae");
        let ids: Vec<&str> = hominids.iter().map(|r| r.tax_id.as_str()).collect();
        assert_eq!(ids, vec!["9606", "9598"]);
    }

    #[test]
    fn test_records_shared_not_cloned() {
        let index = build(REFERENCE);
        let via_family = &index.candidates_at(TaxonomicRank::Family, "hominidae")[0];
        let via_name = index.scientific_name("Homo sapiens").unwrap();
        assert!(Arc::ptr_eq(via_family, via_name));
    }

    #[test]
    fn test_lossy_decoding_keeps_line() {
        let mut input = b"1|Alpha \xff beta|beta|Alpha|Fam|Ord|Cls|Phy|Kin|Sup|\n".to_vec();
        input.extend_from_slice(
            b"2|Gamma delta|delta|Gamma|Fam|Ord|Cls|Phy|Kin|Sup|\n",
        );
        let index =
            ReferenceIndex::from_reader(input.as_slice(), &EngineConfig::default()).unwrap();
        assert_eq!(index.stats().lines_indexed, 2);
        assert_eq!(index.stats().lines_skipped, 0);
    }

    #[test]
    fn test_empty_rank_values_not_indexed() {
        let input = "1|Alpha beta|beta|Alpha||Ord|Cls|Phy|Kin|Sup|\n";
        let index = build(input);
        assert!(index.candidates_at(TaxonomicRank::Family, "").is_empty());
        assert_eq!(index.stats().families, 0);
        assert_eq!(index.stats().orders, 1);
    }

    #[test]
    fn test_stats_key_counts() {
        let index = build(REFERENCE);
        let stats = index.stats();
        assert_eq!(stats.scientific_names, 4);
        // Canis sp. is excluded from the species index
        assert_eq!(stats.species_keys, 3);
        assert_eq!(stats.genera, 4);
        assert_eq!(stats.families, 3);
        assert_eq!(stats.classes, 2);
        assert_eq!(stats.phyla, 2);
    }
}
