//! Sources of (raw, reference) image pairs.
//!
//! A [`Corpus`] is indexed: the driver asks for labels and entries by
//! position, so loading happens inside the per-image failure boundary and a
//! broken file only fails its own entry.
//!
//! [`JsonFileCorpus`] reads one JSON document per image:
//!
//! ```json
//! {
//!   "raw": [[0.0, 1.5, null], [2.0, 0.0, 0.5]],
//!   "reference": [[0.0, 1.0, null], [2.0, 0.0, 0.0]],
//!   "geometry": "optional name of a registered geometry",
//!   "coords": {"x": [[...]], "y": [[...]]},
//!   "metadata": {"event_id": 42}
//! }
//! ```
//!
//! `null` is a missing pixel. Without `coords` or `geometry` the regular
//! pixel grid is used.

use crate::error::ProcessingError;
use crate::geometry::{GeometryCache, PixelCoordinates};
use crate::image::ImageF64;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One image pair ready for cleaning.
#[derive(Clone, Debug)]
pub struct CorpusEntry {
    pub label: String,
    /// File the entry was read from, if any.
    pub source: Option<PathBuf>,
    pub raw: ImageF64,
    pub reference: ImageF64,
    pub coords: Arc<PixelCoordinates>,
    /// Free-form values copied into the report next to the image result.
    pub metadata: BTreeMap<String, Value>,
}

impl CorpusEntry {
    /// Entry on the regular pixel grid without metadata.
    pub fn new(label: impl Into<String>, raw: ImageF64, reference: ImageF64) -> Self {
        let coords = Arc::new(PixelCoordinates::grid(raw.w, raw.h));
        Self {
            label: label.into(),
            source: None,
            raw,
            reference,
            coords,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

pub trait Corpus: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label of entry `index`, available without loading it.
    fn label(&self, index: usize) -> String;

    /// Path of entry `index`, if it comes from a file.
    fn source(&self, _index: usize) -> Option<PathBuf> {
        None
    }

    fn load(&self, index: usize) -> Result<CorpusEntry, ProcessingError>;
}

/// Corpus held in memory, mostly for programmatic runs and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCorpus {
    entries: Vec<CorpusEntry>,
}

impl InMemoryCorpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: CorpusEntry) {
        self.entries.push(entry);
    }
}

impl Corpus for InMemoryCorpus {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn label(&self, index: usize) -> String {
        self.entries
            .get(index)
            .map_or_else(|| format!("#{index}"), |e| e.label.clone())
    }

    fn load(&self, index: usize) -> Result<CorpusEntry, ProcessingError> {
        self.entries
            .get(index)
            .cloned()
            .ok_or_else(|| ProcessingError::Other(format!("no corpus entry {index}")))
    }
}

#[derive(Deserialize)]
struct CoordsDocument {
    x: Value,
    y: Value,
}

#[derive(Deserialize)]
struct ImageDocument {
    raw: Value,
    reference: Value,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    coords: Option<CoordsDocument>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

/// Corpus of JSON image files, one image per file.
#[derive(Debug, Default)]
pub struct JsonFileCorpus {
    paths: Vec<PathBuf>,
    geometries: GeometryCache,
}

impl JsonFileCorpus {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            geometries: GeometryCache::new(),
        }
    }

    /// Expand directories into their `*.json` files (sorted by name); plain
    /// files are taken as given.
    pub fn from_paths(inputs: &[PathBuf]) -> Result<Self, String> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut found: Vec<PathBuf> = fs::read_dir(input)
                    .map_err(|e| format!("Failed to list corpus dir {}: {e}", input.display()))?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                    .collect();
                found.sort();
                paths.extend(found);
            } else {
                paths.push(input.clone());
            }
        }
        Ok(Self::new(paths))
    }

    /// Use `geometries` for named and regular coordinate grids.
    pub fn with_geometries(mut self, geometries: GeometryCache) -> Self {
        self.geometries = geometries;
        self
    }

    pub fn geometries(&self) -> &GeometryCache {
        &self.geometries
    }

    fn coords_for(
        &self,
        doc: &ImageDocument,
        raw: &ImageF64,
    ) -> Result<Arc<PixelCoordinates>, ProcessingError> {
        let coords = if let Some(c) = &doc.coords {
            Arc::new(PixelCoordinates::new(
                image_from_json(&c.x)?,
                image_from_json(&c.y)?,
            )?)
        } else if let Some(name) = &doc.geometry {
            self.geometries
                .named(name)
                .ok_or_else(|| ProcessingError::Other(format!("unknown geometry `{name}`")))?
        } else {
            self.geometries.grid(raw.w, raw.h)
        };
        coords.check_matches(raw)?;
        Ok(coords)
    }
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl Corpus for JsonFileCorpus {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn label(&self, index: usize) -> String {
        self.paths
            .get(index)
            .map_or_else(|| format!("#{index}"), |p| file_label(p))
    }

    fn source(&self, index: usize) -> Option<PathBuf> {
        self.paths.get(index).cloned()
    }

    fn load(&self, index: usize) -> Result<CorpusEntry, ProcessingError> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| ProcessingError::Other(format!("no corpus entry {index}")))?;
        let contents = fs::read_to_string(path).map_err(|e| {
            ProcessingError::Other(format!("Failed to read image {}: {e}", path.display()))
        })?;
        let doc: ImageDocument = serde_json::from_str(&contents).map_err(|e| {
            ProcessingError::Other(format!("Failed to parse image {}: {e}", path.display()))
        })?;
        let raw = image_from_json(&doc.raw)?;
        let reference = image_from_json(&doc.reference)?;
        if !raw.same_shape(&reference) {
            return Err(ProcessingError::wrong_dimension(&reference.shape()));
        }
        let coords = self.coords_for(&doc, &raw)?;
        Ok(CorpusEntry {
            label: file_label(path),
            source: Some(path.clone()),
            raw,
            reference,
            coords,
            metadata: doc.metadata,
        })
    }
}

/// Shape of a nested JSON array, following first elements.
fn json_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

/// Parse a rank-2 JSON array of numbers and nulls into an image. Any other
/// rank, and ragged rows, are `WrongDimension`.
pub fn image_from_json(value: &Value) -> Result<ImageF64, ProcessingError> {
    let shape = json_shape(value);
    let Value::Array(rows) = value else {
        return Err(ProcessingError::wrong_dimension(&shape));
    };
    let mut data = Vec::new();
    let mut width = None;
    for row in rows {
        let Value::Array(cells) = row else {
            return Err(ProcessingError::wrong_dimension(&shape));
        };
        if *width.get_or_insert(cells.len()) != cells.len() {
            return Err(ProcessingError::wrong_dimension(&[rows.len(), cells.len()]));
        }
        for cell in cells {
            data.push(match cell {
                Value::Null => f64::NAN,
                Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
                Value::Array(_) => return Err(ProcessingError::wrong_dimension(&shape)),
                other => {
                    return Err(ProcessingError::Other(format!(
                        "pixel values must be numbers or null, got {other}"
                    )))
                }
            });
        }
    }
    ImageF64::from_vec(width.unwrap_or(0), rows.len(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rank_two_arrays_with_nulls() {
        let img = image_from_json(&json!([[1.0, null], [2, 3.5]])).unwrap();
        assert_eq!(img.shape(), [2, 2]);
        assert_eq!(img.get(0, 1), 2.0);
        assert!(img.get(1, 0).is_nan());
    }

    #[test]
    fn other_ranks_are_wrong_dimension() {
        let err = image_from_json(&json!([1.0, 2.0])).unwrap_err();
        assert_eq!(err, ProcessingError::WrongDimension { shape: vec![2] });
        let err = image_from_json(&json!([[[1.0], [2.0]]])).unwrap_err();
        assert_eq!(err, ProcessingError::WrongDimension { shape: vec![1, 2, 1] });
        let err = image_from_json(&json!(3.0)).unwrap_err();
        assert_eq!(err, ProcessingError::WrongDimension { shape: vec![] });
    }

    #[test]
    fn ragged_rows_are_wrong_dimension() {
        let err = image_from_json(&json!([[1.0, 2.0], [3.0]])).unwrap_err();
        assert!(matches!(err, ProcessingError::WrongDimension { .. }));
    }

    #[test]
    fn strings_are_rejected() {
        let err = image_from_json(&json!([["a"]])).unwrap_err();
        assert!(matches!(err, ProcessingError::Other(_)));
    }

    #[test]
    fn json_corpus_loads_files_and_shares_grids() {
        let dir = tempfile::tempdir().unwrap();
        for (name, event) in [("b_event", 2), ("a_event", 1)] {
            let doc = json!({
                "raw": [[0.0, 1.0], [null, 2.0]],
                "reference": [[0.0, 1.0], [0.0, 2.0]],
                "metadata": {"event_id": event}
            });
            fs::write(dir.path().join(format!("{name}.json")), doc.to_string()).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let corpus = JsonFileCorpus::from_paths(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.label(0), "a_event");
        let a = corpus.load(0).unwrap();
        let b = corpus.load(1).unwrap();
        assert_eq!(a.metadata["event_id"], 1);
        assert!(a.raw.get(0, 1).is_nan());
        assert!(Arc::ptr_eq(&a.coords, &b.coords));
        assert_eq!(corpus.geometries().len(), 1);
    }

    #[test]
    fn named_geometry_and_explicit_coords() {
        let dir = tempfile::tempdir().unwrap();
        let named = dir.path().join("named.json");
        fs::write(
            &named,
            json!({"raw": [[1.0, 2.0]], "reference": [[1.0, 2.0]], "geometry": "pair"})
                .to_string(),
        )
        .unwrap();
        let explicit = dir.path().join("explicit.json");
        fs::write(
            &explicit,
            json!({"raw": [[1.0, 2.0]], "reference": [[1.0, 2.0]],
                   "coords": {"x": [[10.0, 20.0]], "y": [[0.0, 0.0]]}})
            .to_string(),
        )
        .unwrap();
        let missing = dir.path().join("missing.json");

        let mut cache = GeometryCache::new();
        cache.register("pair", PixelCoordinates::centered_grid(2, 1, 0.5));
        let corpus = JsonFileCorpus::new(vec![named, explicit, missing]).with_geometries(cache);

        assert_eq!(corpus.load(0).unwrap().coords.x.get(1, 0), 0.25);
        assert_eq!(corpus.load(1).unwrap().coords.x.get(1, 0), 20.0);
        assert!(matches!(corpus.load(2), Err(ProcessingError::Other(_))));
    }
}
