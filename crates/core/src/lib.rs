#![forbid(unsafe_code)]

pub mod bbox;
pub mod cloud;
pub mod point;
pub mod reference;
pub mod role;
pub mod transform;

pub use bbox::Aabb;
pub use cloud::PointCloud;
pub use point::Point3;
pub use reference::ReferenceModel;
pub use role::CloudRole;
pub use transform::{apply_transform, RigidTransform};
