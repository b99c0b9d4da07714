#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod benchmark;
pub mod cleaning;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod metrics;

// Numeric building blocks shared by cleaning and scoring.
pub mod angle;
pub mod geometry;
pub mod islands;
pub mod shape;

// --- High-level re-exports -------------------------------------------------

// Main entry points: driver, algorithms, reports.
pub use crate::benchmark::{
    BenchmarkDriver, BenchmarkReport, Corpus, CorpusEntry, InMemoryCorpus, JsonFileCorpus,
};
pub use crate::cleaning::{Cleaned, CleaningAlgorithm, CleaningOptions};
pub use crate::error::ProcessingError;

// Scoring.
pub use crate::metrics::{assess, MetricInput, MetricOptions, MetricSelection, ScoreRecord};

// Geometry and images.
pub use crate::geometry::{GeometryCache, PixelCoordinates};
pub use crate::image::ImageF64;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use clean_bench::prelude::*;
///
/// # fn main() -> Result<(), ProcessingError> {
/// let mut corpus = InMemoryCorpus::default();
/// let reference = ImageF64::filled(16, 16, 1.0);
/// let raw = reference.map(|v| v + 0.1);
/// corpus.push(CorpusEntry::new("flat", raw, reference));
///
/// let algorithm = CleaningOptions::default().build()?;
/// let report = BenchmarkDriver::new(algorithm).with_metric("mse")?.run(&corpus);
/// println!("failures={} duration_ms={:.3}", report.num_failures, report.run_duration_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::ImageF64;
    pub use crate::{
        BenchmarkDriver, CleaningAlgorithm, CleaningOptions, CorpusEntry, InMemoryCorpus,
        ProcessingError,
    };
}
