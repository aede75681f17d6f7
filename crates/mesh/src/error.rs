use thiserror::Error;

/// Errors raised by surface reconstruction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// Too few points, or all points coplanar.
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry { reason: String },

    #[error("point {index} has a non-finite coordinate")]
    NonFiniteInput { index: usize },
}

impl MeshError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}

pub type MeshResult<T> = Result<T, MeshError>;
