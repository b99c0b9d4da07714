//! Benchmark driver: clean every image of a corpus, score it, report.
//!
//! Per run the driver goes through `start → (load → clean → assess → record)
//! × N → finish`. Each image is processed inside one failure boundary: an
//! error *or a panic* while loading, cleaning or scoring it becomes an
//! [`ErrorDescriptor`] on that image's result and the run continues.
//!
//! The driver keeps no per-image state. Aggregation across images, such as
//! [`mean_scores`], works on the finished [`BenchmarkReport`].

mod corpus;
mod report;

pub use corpus::{image_from_json, Corpus, CorpusEntry, InMemoryCorpus, JsonFileCorpus};
pub use report::{
    mean_scores, system_description, BenchmarkReport, ErrorDescriptor, ImageResult,
    ReportBuilder, METADATA_PREFIX, RESERVED_KEYS,
};

use crate::cleaning::CleaningAlgorithm;
use crate::diagnostics::elapsed_ms;
use crate::error::ProcessingError;
use crate::metrics::{assess, MetricInput, MetricOptions, MetricSelection};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

pub struct BenchmarkDriver {
    algorithm: Box<dyn CleaningAlgorithm>,
    metric: Option<MetricSelection>,
    metric_options: MetricOptions,
    label: Option<String>,
}

impl BenchmarkDriver {
    /// Driver that only cleans; see [`with_metric`](Self::with_metric).
    pub fn new(algorithm: Box<dyn CleaningAlgorithm>) -> Self {
        Self {
            algorithm,
            metric: None,
            metric_options: MetricOptions::default(),
            label: None,
        }
    }

    /// Score every cleaned image with metric (or group) `name`. Unknown names
    /// fail here, before any image is processed.
    pub fn with_metric(mut self, name: &str) -> Result<Self, ProcessingError> {
        self.metric = Some(MetricSelection::resolve(name)?);
        Ok(self)
    }

    pub fn with_metric_options(mut self, options: MetricOptions) -> Self {
        self.metric_options = options;
        self
    }

    /// Report label; defaults to the algorithm name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn algorithm(&self) -> &dyn CleaningAlgorithm {
        self.algorithm.as_ref()
    }

    /// Process the corpus in order on the calling thread.
    pub fn run(&self, corpus: &dyn Corpus) -> BenchmarkReport {
        let mut builder = self.start(corpus);
        for index in 0..corpus.len() {
            builder.push(self.process(corpus, index));
        }
        self.finish(builder)
    }

    /// Process the corpus on the rayon pool. Results keep corpus order.
    pub fn run_parallel(&self, corpus: &dyn Corpus) -> BenchmarkReport {
        let mut builder = self.start(corpus);
        let results: Vec<ImageResult> = (0..corpus.len())
            .into_par_iter()
            .map(|index| self.process(corpus, index))
            .collect();
        builder.extend(results);
        self.finish(builder)
    }

    fn start(&self, corpus: &dyn Corpus) -> ReportBuilder {
        let method = self.metric.as_ref().map(MetricSelection::name);
        info!(
            "benchmark {}: {} images, metric {}",
            self.algorithm.name(),
            corpus.len(),
            method.unwrap_or("none")
        );
        let builder = ReportBuilder::start(self.algorithm.name(), self.algorithm.options(), method);
        match &self.label {
            Some(label) => builder.with_label(label.clone()),
            None => builder,
        }
    }

    fn finish(&self, builder: ReportBuilder) -> BenchmarkReport {
        let report = builder.finish();
        info!(
            "benchmark {} done: {} images, {} failures, {:.1} ms",
            report.algo,
            report.io.len(),
            report.num_failures,
            report.run_duration_ms
        );
        report
    }

    /// One image, inside its failure boundary.
    fn process(&self, corpus: &dyn Corpus, index: usize) -> ImageResult {
        let label = corpus.label(index);
        let mut result = ImageResult::new(label.clone());
        result.source = corpus.source(index);

        let outcome = guarded(|| self.process_entry(corpus, index, &mut result));
        if let Err(error) = outcome {
            let error = error.with_source(result.source.as_deref(), &label);
            warn!("image {label} failed: {}: {}", error.kind, error.message);
            result.score = None;
            result.score_name = None;
            result.error = Some(error);
        }
        result
    }

    fn process_entry(
        &self,
        corpus: &dyn Corpus,
        index: usize,
        result: &mut ImageResult,
    ) -> Result<(), ProcessingError> {
        let entry = corpus.load(index)?;
        result.set_metadata(entry.metadata);
        if entry.source.is_some() {
            result.source = entry.source;
        }

        let input = entry.raw.clone();
        let start = Instant::now();
        let cleaned = self.algorithm.clean(&input)?;
        let clean_ms = elapsed_ms(start);
        result.execution_time_ms = Some(clean_ms);
        debug!("image {} cleaned in {clean_ms:.3} ms", entry.label);

        if let Some(selection) = &self.metric {
            let metric_input = MetricInput {
                raw: &entry.raw,
                cleaned: &cleaned.image,
                reference: &entry.reference,
                coords: &entry.coords,
            };
            let record = assess(selection, &metric_input, &self.metric_options)?;
            result.score = Some(record.values);
            result.score_name = Some(record.names);
        }
        result.diagnostics = Some(cleaned.diagnostics);
        Ok(())
    }
}

/// Run `step` inside a failure boundary: an error or a panic becomes an
/// [`ErrorDescriptor`].
pub fn guarded<T>(
    step: impl FnOnce() -> Result<T, ProcessingError>,
) -> Result<T, ErrorDescriptor> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ErrorDescriptor::from_error(&err)),
        Err(payload) => Err(ErrorDescriptor::panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
