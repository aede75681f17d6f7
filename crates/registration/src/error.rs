pub use partscan_core::CloudRole;
use partscan_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// Rigid registration needs at least three points on each side.
    #[error("{role} cloud has {count} points, at least 3 are required")]
    InsufficientPoints { role: CloudRole, count: usize },

    #[error("{role} cloud has a non-finite coordinate at point {index}")]
    NonFiniteInput { role: CloudRole, index: usize },

    #[error("failed to index reference cloud: {0}")]
    Index(#[from] SpatialError),
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;
