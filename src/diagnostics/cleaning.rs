use super::timing::TimingBreakdown;
use crate::islands::IslandSuppressionStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Side channel returned by every cleaning call next to the cleaned image.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningDiagnostics {
    pub timings: TimingBreakdown,
    /// Present when the isolated-pixel post-filter ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub island_stats: Option<IslandSuppressionStats>,
    /// Algorithm-specific counts, e.g. kept pixels or the noise estimate.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, f64>,
}

impl CleaningDiagnostics {
    pub fn count(&mut self, name: impl Into<String>, value: f64) {
        self.counters.insert(name.into(), value);
    }

    pub fn counter(&self, name: &str) -> Option<f64> {
        self.counters.get(name).copied()
    }
}
