pub use partscan_core::CloudRole;
use partscan_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InspectionError {
    #[error("{role} cloud is empty")]
    EmptyCloud { role: CloudRole },

    /// Tolerance must be finite and strictly positive.
    #[error("tolerance must be finite and > 0, got {0}")]
    InvalidTolerance(f64),

    #[error("classification policy {field} must be {expected}, got {value}")]
    InvalidPolicy {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("{role} cloud has a non-finite coordinate at point {index}")]
    NonFiniteInput { role: CloudRole, index: usize },

    #[error("failed to index {role} cloud: {source}")]
    Index {
        role: CloudRole,
        #[source]
        source: SpatialError,
    },
}

pub type InspectionResult<T> = Result<T, InspectionError>;
