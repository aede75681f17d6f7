#![forbid(unsafe_code)]

pub mod error;
pub mod kdtree;

pub use error::{SpatialError, SpatialResult};
pub use kdtree::{mean_spacing, KdTree, Neighbor};
