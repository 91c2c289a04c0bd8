//! Engine configuration for performance and safety limits.

use serde::{Deserialize, Serialize};

/// Engine configuration controlling match limits and capture sizes.
///
/// # Defaults
///
/// - `max_matches_per_rule`: 10 000
/// - `max_capture_text_bytes`: 1 048 576 (1 MiB)
///
/// Missing keys fall back to these defaults when deserialising, so a
/// partial configuration document only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum number of findings emitted per rule before truncation.
    max_matches_per_rule: usize,
    /// Maximum bytes of source text kept per finding or capture.
    max_capture_text_bytes: usize,
}

impl EngineConfig {
    /// Creates a new engine configuration with explicit values.
    #[must_use]
    pub const fn new(max_matches_per_rule: usize, max_capture_text_bytes: usize) -> Self {
        Self {
            max_matches_per_rule,
            max_capture_text_bytes,
        }
    }

    /// Returns the maximum findings per rule.
    #[must_use]
    pub const fn max_matches_per_rule(&self) -> usize {
        self.max_matches_per_rule
    }

    /// Returns the maximum capture text bytes.
    #[must_use]
    pub const fn max_capture_text_bytes(&self) -> usize {
        self.max_capture_text_bytes
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_matches_per_rule: 10_000,
            max_capture_text_bytes: 1_048_576,
        }
    }
}
