//! Bounded-parallel batch resolution
//!
//! Resolution is embarrassingly parallel: the index is shared read-only and
//! every resolve call is independent. The dispatcher owns the only
//! serialized step, reassembling results by the row identity carried with
//! each work item — never by completion order, which is arbitrary.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::index::ReferenceIndex;
use crate::resolver::{resolve, ResolutionResult};
use crate::taxonomy::RankQuery;
use crate::{LinnaeusError, Result};

/// Runs resolver calls over many records with a bounded worker pool.
///
/// Uses a local rayon pool rather than the global one so batch runs with
/// different widths stay independent within one process.
pub struct Dispatcher {
    pool: rayon::ThreadPool,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let workers = config.effective_workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| LinnaeusError::Configuration(e.to_string()))?;

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    /// Resolve a batch of queries, preserving input order in the output
    pub fn resolve_batch(
        &self,
        index: &ReferenceIndex,
        queries: &[RankQuery],
    ) -> Vec<ResolutionResult> {
        debug!(
            rows = queries.len(),
            workers = self.pool.current_num_threads(),
            "dispatching batch"
        );

        let mut indexed: Vec<(usize, ResolutionResult)> = self.pool.install(|| {
            queries
                .par_iter()
                .enumerate()
                .map(|(row, query)| (row, self.resolve_contained(index, query)))
                .collect()
        });

        // Reassemble by the row identity attached to each work item
        indexed.sort_unstable_by_key(|(row, _)| *row);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// Resolve rows from a record source that may fail to produce a query
    /// for some rows. A failed row yields the error sentinel and the batch
    /// continues; the output always has one result per input row, in input
    /// order.
    pub fn resolve_records(
        &self,
        index: &ReferenceIndex,
        rows: Vec<Result<RankQuery>>,
    ) -> Vec<ResolutionResult> {
        let mut indexed: Vec<(usize, ResolutionResult)> = self.pool.install(|| {
            rows.into_par_iter()
                .enumerate()
                .map(|(row, query)| match query {
                    Ok(query) => (row, self.resolve_contained(index, &query)),
                    Err(e) => {
                        warn!(row, error = %e, "row failed, emitting error sentinel");
                        (row, ResolutionResult::error())
                    }
                })
                .collect()
        });

        indexed.sort_unstable_by_key(|(row, _)| *row);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// A panic inside one resolve call must never abort the batch
    fn resolve_contained(&self, index: &ReferenceIndex, query: &RankQuery) -> ResolutionResult {
        match catch_unwind(AssertUnwindSafe(|| resolve(index, query, &self.config))) {
            Ok(result) => result,
            Err(_) => {
                warn!("resolver panicked on a row, emitting error sentinel");
                ResolutionResult::error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MatchedRank;
    use pretty_assertions::assert_eq;

    const REFERENCE: &str = "\
9606|Homo sapiens|sapiens|Homo|Hominidae|Primates|Mammalia|Chordata|Animalia|Eukaryota|
7227|Drosophila melanogaster|melanogaster|Drosophila|Drosophilidae|Diptera|Insecta|Arthropoda|Animalia|Eukaryota|
";

    fn index() -> ReferenceIndex {
        ReferenceIndex::from_reader(REFERENCE.as_bytes(), &EngineConfig::default()).unwrap()
    }

    fn dispatcher(workers: usize) -> Dispatcher {
        Dispatcher::new(&EngineConfig {
            workers,
            ..Default::default()
        })
        .unwrap()
    }

    fn queries() -> Vec<RankQuery> {
        vec![
            RankQuery::from_raw("", "", "", "Hominidae", "Homo", "sapiens"),
            RankQuery::from_raw("", "", "", "Drosophilidae", "Drosophila", "melanogaster"),
            RankQuery::default(),
            RankQuery::from_raw("Arthropoda", "", "", "", "", ""),
        ]
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let idx = index();
        let results = dispatcher(4).resolve_batch(&idx, &queries());
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].tax_id.as_deref(), Some("9606"));
        assert_eq!(results[1].tax_id.as_deref(), Some("7227"));
        assert_eq!(results[2].matched_rank, MatchedRank::Unmatched);
        assert_eq!(results[3].matched_rank, MatchedRank::Phylum);
    }

    #[test]
    fn test_empty_batch() {
        let idx = index();
        let results = dispatcher(4).resolve_batch(&idx, &[]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_worker_widths_agree() {
        let idx = index();
        let queries = queries();
        let narrow = dispatcher(1).resolve_batch(&idx, &queries);
        let default = dispatcher(4).resolve_batch(&idx, &queries);
        let wide = dispatcher(16).resolve_batch(&idx, &queries);
        assert_eq!(narrow, default);
        assert_eq!(default, wide);
    }

    #[test]
    fn test_failed_rows_become_error_sentinels() {
        let idx = index();
        let rows = vec![
            Ok(RankQuery::from_raw("", "", "", "Hominidae", "Homo", "sapiens")),
            Err(LinnaeusError::InvalidInput("non-string species cell".to_string())),
            Ok(RankQuery::default()),
        ];
        let results = dispatcher(2).resolve_records(&idx, rows);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].matched_rank, MatchedRank::Species);
        assert_eq!(results[1].matched_rank, MatchedRank::Error);
        assert_eq!(results[1].tax_id.as_deref(), Some("error"));
        assert_eq!(results[2].matched_rank, MatchedRank::Unmatched);
    }
}
