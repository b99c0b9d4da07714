use crate::cleaning::CleaningOptions;
use crate::metrics::MetricOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report destination; the report goes to stdout when unset.
    pub json_out: Option<PathBuf>,
    /// Directory for PNG dumps of raw, cleaned and reference images.
    pub debug_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Corpus files or directories of `*.json` files.
    pub corpus: Vec<PathBuf>,
    pub algorithm: CleaningOptions,
    pub metric: Option<String>,
    pub metric_options: MetricOptions,
    pub parallel: bool,
    /// Report label; the algorithm name when unset.
    pub label: Option<String>,
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
