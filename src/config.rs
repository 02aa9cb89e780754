//! Engine configuration

use serde::{Deserialize, Serialize};

/// Configuration for a single batch run.
///
/// All fields have serde defaults so a caller can deserialize a partial
/// document and rely on the engine's defaults for the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool width for batch resolution (0 = all available cores)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Validate species/genus hits at each of family, order, class and
    /// phylum instead of family only. The legacy pipeline validated at
    /// family only; keep this off for compatible output.
    #[serde(default)]
    pub cascade_validation: bool,

    /// Emit a progress event after this many reference lines (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_workers() -> usize {
    4
}

fn default_progress_interval() -> u64 {
    500_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            cascade_validation: false,
            progress_interval: default_progress_interval(),
        }
    }
}

impl EngineConfig {
    /// Resolve the configured width to an actual thread count
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}
