//! Error kinds raised while cleaning or scoring a single image.
//!
//! Every variant is recoverable at the per-image boundary of the benchmark
//! driver: it is turned into an [`ErrorDescriptor`](crate::benchmark::ErrorDescriptor)
//! and the run moves on to the next image.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProcessingError {
    /// A metric name (or group) that is not in the metric table.
    #[error("unknown metric method `{0}`")]
    UnknownMethod(String),
    /// The cleaned image has no positive total intensity.
    #[error("cleaned image is empty (total intensity <= 0)")]
    EmptyOutputImage,
    /// The reference image has no positive total intensity.
    #[error("reference image is empty (total intensity <= 0)")]
    EmptyReferenceImage,
    /// The array handed to an algorithm is not a usable 2D image.
    #[error("expected a non-empty 2D image, got shape {shape:?}")]
    WrongDimension { shape: Vec<usize> },
    #[error("{0}")]
    Other(String),
}

impl ProcessingError {
    /// Stable identifier written into the `type` field of report errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMethod(_) => "UnknownMethod",
            Self::EmptyOutputImage => "EmptyOutputImage",
            Self::EmptyReferenceImage => "EmptyReferenceImage",
            Self::WrongDimension { .. } => "WrongDimension",
            Self::Other(_) => "Other",
        }
    }

    pub fn wrong_dimension(shape: &[usize]) -> Self {
        Self::WrongDimension {
            shape: shape.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant_name() {
        assert_eq!(ProcessingError::EmptyOutputImage.kind(), "EmptyOutputImage");
        assert_eq!(
            ProcessingError::UnknownMethod("foo".into()).kind(),
            "UnknownMethod"
        );
        assert_eq!(
            ProcessingError::wrong_dimension(&[3, 4, 5]).to_string(),
            "expected a non-empty 2D image, got shape [3, 4, 5]"
        );
    }
}
