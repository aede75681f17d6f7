#![forbid(unsafe_code)]

pub mod correspondence;
pub mod error;
pub mod icp;

pub use correspondence::{find_correspondences, mean_distance, Correspondence};
pub use error::{CloudRole, RegistrationError, RegistrationResult};
pub use icp::{align, AlignmentResult, AlignmentWarning, IcpParams};
