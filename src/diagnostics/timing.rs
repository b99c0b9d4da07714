use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock time spent in one stage of a cleaning run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Per-stage timings of a single `clean` call plus its total.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn with_total(total_ms: f64) -> Self {
        Self {
            total_ms,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Run `f`, record its duration under `label` and return its value.
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.push(label, elapsed_ms(start));
        out
    }

    /// Sum of the recorded stages.
    pub fn stage_sum_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

/// Milliseconds since `start`.
#[inline]
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_records_stage_and_passes_value_through() {
        let mut timings = TimingBreakdown::default();
        let v = timings.time("square", || 7 * 7);
        assert_eq!(v, 49);
        assert_eq!(timings.stages.len(), 1);
        assert_eq!(timings.stages[0].label, "square");
        assert!(timings.stages[0].elapsed_ms >= 0.0);
    }

    #[test]
    fn serializes_camel_case() {
        let mut timings = TimingBreakdown::with_total(2.5);
        timings.push("fill", 1.0);
        let json = serde_json::to_value(&timings).unwrap();
        assert_eq!(json["totalMs"], 2.5);
        assert_eq!(json["stages"][0]["elapsedMs"], 1.0);
        assert!((timings.stage_sum_ms() - 1.0).abs() < 1e-12);
    }
}
