use super::{Cleaned, CleaningAlgorithm};
use crate::diagnostics::{elapsed_ms, CleaningDiagnostics};
use crate::error::ProcessingError;
use crate::image::ImageF64;
use serde_json::Value;
use std::time::Instant;

pub(super) const NAME: &str = "identity";

/// Returns a copy of its input.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl CleaningAlgorithm for Identity {
    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Value {
        Value::Object(Default::default())
    }

    fn clean(&self, image: &ImageF64) -> Result<Cleaned, ProcessingError> {
        let start = Instant::now();
        let image = image.clone();
        let mut diagnostics = CleaningDiagnostics::default();
        diagnostics.timings.total_ms = elapsed_ms(start);
        Ok(Cleaned { image, diagnostics })
    }
}
