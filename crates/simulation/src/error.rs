//! Error types for synthetic part generation.

use thiserror::Error;

/// Errors that can occur while generating a synthetic cloud.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Radius, height or density is non-positive or non-finite.
    #[error("invalid shape parameters: {reason}")]
    InvalidShapeParameters { reason: String },

    /// A defect parameter is out of range.
    #[error("invalid defect parameters: {reason}")]
    InvalidDefectParameters { reason: String },

    /// Jitter amplitude is negative or non-finite.
    #[error("jitter amplitude must be finite and >= 0, got {amplitude}")]
    InvalidJitter { amplitude: f64 },

    /// The defect removed every sample.
    #[error("defect removed every point of the {shape} sample")]
    EmptyResult { shape: &'static str },
}

impl GeometryError {
    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Self::InvalidShapeParameters {
            reason: reason.into(),
        }
    }

    pub(crate) fn defect(reason: impl Into<String>) -> Self {
        Self::InvalidDefectParameters {
            reason: reason.into(),
        }
    }
}

/// Result type for generation.
pub type GeometryResult<T> = Result<T, GeometryError>;
