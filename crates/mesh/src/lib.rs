#![forbid(unsafe_code)]
//! Surface reconstruction from point clouds for export.

pub mod error;
mod hull;
pub mod mesh;
pub mod surface;

pub use error::{MeshError, MeshResult};
pub use mesh::TriangleMesh;
pub use surface::{reconstruct, ReconstructionMethod};
