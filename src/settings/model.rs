//! User-facing settings and the throughput profile derived from them.

use serde::{Deserialize, Serialize};

/// Settings shared with the settings provider.
///
/// Field names on the wire follow the provider's storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether the engine may load on every site.
    #[serde(rename = "enableOnAllSites", default = "default_true")]
    pub whole_site_enabled: bool,

    /// Favour responsiveness over scan throughput.
    #[serde(rename = "performanceMode", default = "default_true")]
    pub performance_mode: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            whole_site_enabled: true,
            performance_mode: true,
        }
    }
}

impl Settings {
    /// Scan and batching limits for these settings.
    #[must_use]
    pub const fn throughput(&self) -> ThroughputProfile {
        if self.performance_mode {
            ThroughputProfile::PERFORMANCE
        } else {
            ThroughputProfile::STANDARD
        }
    }
}

/// Limits applied to one scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputProfile {
    /// Maximum candidates collected per pass.
    pub max_candidates: usize,
    /// Units processed per batch.
    pub batch_size: usize,
    /// Yield to other tasks between batches.
    pub yield_between_batches: bool,
}

impl ThroughputProfile {
    /// Small batches with a cooperative yield between them.
    pub const PERFORMANCE: Self = Self {
        max_candidates: 200,
        batch_size: 10,
        yield_between_batches: true,
    };

    /// Large batches processed back-to-back.
    pub const STANDARD: Self = Self {
        max_candidates: 1000,
        batch_size: 50,
        yield_between_batches: false,
    };
}
