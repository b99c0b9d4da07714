//! Benchmark report model and its JSON form.

use crate::diagnostics::{elapsed_ms, CleaningDiagnostics};
use crate::error::ProcessingError;
use crate::image::io::{to_sorted_json, write_json_file};
use chrono::Local;
use log::warn;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Why an image has no result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorDescriptor {
    /// Error kind, e.g. `WrongDimension` or `Panic`.
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    /// File the image was loaded from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Label of the image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ErrorDescriptor {
    pub fn from_error(err: &ProcessingError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            filename: None,
            name: None,
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: "Panic".to_string(),
            message: message.into(),
            filename: None,
            name: None,
        }
    }

    pub fn with_source(mut self, filename: Option<&Path>, name: &str) -> Self {
        self.filename = filename.map(|p| p.display().to_string());
        self.name = Some(name.to_string());
        self
    }
}

/// Outcome of one corpus entry.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ImageResult {
    /// Entry metadata, flattened into the JSON object.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
    pub image_label: String,
    /// Wall-clock duration of the cleaning call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// Non-finite values are written as `"inf"`, `"-inf"` or `"nan"`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_scores"
    )]
    pub score: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_name: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<CleaningDiagnostics>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// JSON has no inf or NaN; keep them distinguishable from each other and from
/// missing values.
struct ScoreValue(f64);

impl Serialize for ScoreValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("nan")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

fn serialize_scores<S: Serializer>(
    scores: &Option<Vec<f64>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match scores {
        Some(values) => serializer.collect_seq(values.iter().map(|&v| ScoreValue(v))),
        None => serializer.serialize_none(),
    }
}

/// Keys of the per-image JSON object owned by the driver.
pub const RESERVED_KEYS: [&str; 6] = [
    "image_label",
    "execution_time_ms",
    "score",
    "score_name",
    "error",
    "diagnostics",
];

/// Prefix given to corpus metadata keys that collide with [`RESERVED_KEYS`].
pub const METADATA_PREFIX: &str = "metadata_";

impl ImageResult {
    pub fn new(image_label: impl Into<String>) -> Self {
        Self {
            image_label: image_label.into(),
            ..Self::default()
        }
    }

    /// Attach corpus metadata. Keys that would shadow a result field are
    /// renamed with [`METADATA_PREFIX`].
    pub fn set_metadata(&mut self, metadata: BTreeMap<String, Value>) {
        self.metadata = metadata
            .into_iter()
            .map(|(key, value)| {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    let renamed = format!("{METADATA_PREFIX}{key}");
                    warn!(
                        "image {}: metadata key `{key}` renamed to `{renamed}`",
                        self.image_label
                    );
                    (renamed, value)
                } else {
                    (key, value)
                }
            })
            .collect();
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkReport {
    pub algo: String,
    pub label: String,
    pub options: Value,
    pub benchmark_method: Option<String>,
    /// Local start time, RFC 3339.
    pub date_time: String,
    pub system: String,
    pub run_duration_ms: f64,
    pub num_failures: usize,
    pub io: Vec<ImageResult>,
}

impl BenchmarkReport {
    /// Indented JSON with keys sorted at every level.
    pub fn to_json(&self) -> Result<String, String> {
        to_sorted_json(self)
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        write_json_file(path, self)
    }
}

/// Collects image results while a run is in progress.
pub struct ReportBuilder {
    algo: String,
    label: String,
    options: Value,
    benchmark_method: Option<String>,
    date_time: String,
    started: Instant,
    io: Vec<ImageResult>,
}

impl ReportBuilder {
    /// Start the run clock and stamp the start time.
    pub fn start(algo: &str, options: Value, benchmark_method: Option<&str>) -> Self {
        Self {
            algo: algo.to_string(),
            label: algo.to_string(),
            options: strip_nulls(options),
            benchmark_method: benchmark_method.map(str::to_string),
            date_time: Local::now().to_rfc3339(),
            started: Instant::now(),
            io: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn push(&mut self, result: ImageResult) {
        self.io.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ImageResult>) {
        self.io.extend(results);
    }

    pub fn finish(self) -> BenchmarkReport {
        let num_failures = self.io.iter().filter(|r| r.is_failure()).count();
        BenchmarkReport {
            algo: self.algo,
            label: self.label,
            options: self.options,
            benchmark_method: self.benchmark_method,
            date_time: self.date_time,
            system: system_description(),
            run_duration_ms: elapsed_ms(self.started),
            num_failures,
            io: self.io,
        }
    }
}

/// Host description, e.g. `linux x86_64 (unix)`.
pub fn system_description() -> String {
    use std::env::consts::{ARCH, FAMILY, OS};
    format!("{OS} {ARCH} ({FAMILY})")
}

/// Drop `null` members from option objects.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Mean of every score name over the images that produced it. Non-finite
/// values are skipped.
pub fn mean_scores(report: &BenchmarkReport) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for result in &report.io {
        let (Some(values), Some(names)) = (&result.score, &result.score_name) else {
            continue;
        };
        for (name, &value) in names.iter().zip(values) {
            if value.is_finite() {
                let entry = sums.entry(name.clone()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }
    sums.into_iter()
        .map(|(name, (sum, n))| (name, sum / n as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scored(label: &str, values: Vec<f64>) -> ImageResult {
        ImageResult {
            score_name: Some(vec!["mse".to_string(), "psnr".to_string()]),
            score: Some(values),
            ..ImageResult::new(label)
        }
    }

    #[test]
    fn finish_counts_failures() {
        let mut builder = ReportBuilder::start("identity", json!({}), Some("mse"));
        builder.push(scored("a", vec![1.0, 20.0]));
        let mut failed = ImageResult::new("b");
        failed.error = Some(ErrorDescriptor::from_error(&ProcessingError::EmptyOutputImage));
        builder.push(failed);
        let report = builder.with_label("baseline").finish();
        assert_eq!(report.num_failures, 1);
        assert_eq!(report.label, "baseline");
        assert_eq!(report.io.len(), 2);
        assert!(report.run_duration_ms >= 0.0);
    }

    #[test]
    fn mean_scores_skip_failures_and_infinities() {
        let mut builder = ReportBuilder::start("identity", json!({}), Some("mse"));
        builder.push(scored("a", vec![1.0, f64::INFINITY]));
        builder.push(scored("b", vec![3.0, 30.0]));
        builder.push(ImageResult::new("c"));
        let means = mean_scores(&builder.finish());
        assert_eq!(means["mse"], 2.0);
        assert_eq!(means["psnr"], 30.0);
    }

    #[test]
    fn image_result_json_flattens_metadata() {
        let mut result = scored("img", vec![0.5, 1.0]);
        result.metadata.insert("event_id".to_string(), json!(7));
        result.error = None;
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["event_id"], 7);
        assert_eq!(value["image_label"], "img");
        assert_eq!(value["score_name"][1], "psnr");
        assert!(value.get("error").is_none());
        assert!(value.get("source").is_none());
    }

    #[test]
    fn reserved_metadata_keys_do_not_shadow_results() {
        let mut result = ImageResult::new("img");
        result.set_metadata(BTreeMap::from([
            ("score".to_string(), json!([42.0])),
            ("error".to_string(), json!("none")),
            ("event_id".to_string(), json!(3)),
        ]));
        result.error = Some(ErrorDescriptor::from_error(&ProcessingError::EmptyOutputImage));
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("score").is_none());
        assert_eq!(value["error"]["type"], "EmptyOutputImage");
        assert_eq!(value["metadata_score"], json!([42.0]));
        assert_eq!(value["metadata_error"], "none");
        assert_eq!(value["event_id"], 3);
    }

    #[test]
    fn non_finite_scores_are_spelled_out() {
        let result = scored("img", vec![f64::INFINITY, f64::NAN]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["score"], json!(["inf", "nan"]));

        let result = ImageResult {
            score_name: Some(vec!["sspd".to_string(), "mse".to_string()]),
            score: Some(vec![f64::NEG_INFINITY, 0.25]),
            ..ImageResult::new("img")
        };
        let text = to_sorted_json(&result).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["score"], json!(["-inf", 0.25]));
    }

    #[test]
    fn error_descriptor_uses_type_key() {
        let err = ErrorDescriptor::from_error(&ProcessingError::wrong_dimension(&[3]))
            .with_source(Some(Path::new("/data/x.json")), "x");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "WrongDimension");
        assert_eq!(value["filename"], "/data/x.json");
        assert_eq!(value["name"], "x");
    }

    #[test]
    fn report_json_is_key_sorted() {
        let report = ReportBuilder::start("threshold", json!({"b": 1, "a": null}), None).finish();
        let text = report.to_json().unwrap();
        let algo = text.find("\"algo\"").unwrap();
        let system = text.find("\"system\"").unwrap();
        assert!(algo < system);
        assert!(!text.contains("\"a\""));
    }
}
