use thiserror::Error;

/// Errors raised while building a spatial index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    /// The input cloud has no points.
    #[error("cannot build a spatial index over an empty point set")]
    EmptyInput,

    /// A stored point has a NaN or infinite coordinate.
    #[error("point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
