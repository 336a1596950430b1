//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::annotate::ReferenceGenome;

/// Quiet period applied to debounced field edits.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Tunables for the reconciliation engine. Constructed by the embedding
/// application; all fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing-edge debounce period for text edits, in milliseconds.
    pub debounce_ms: u64,
    /// Reference genome passed to every annotation lookup.
    pub reference_genome: ReferenceGenome,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            reference_genome: ReferenceGenome::default(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
