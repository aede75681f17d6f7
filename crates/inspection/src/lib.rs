#![forbid(unsafe_code)]
//! Deviation analysis of an aligned sample against its reference.
//!
//! [`analyze`] measures nearest-neighbour deviations in both directions,
//! summarises where the out-of-tolerance points lie, and [`classify`] maps
//! that summary onto the defect taxonomy using a [`ClassificationPolicy`].

pub mod classify;
pub mod deviation;
pub mod error;
pub mod report;
pub mod signature;

pub use classify::{classify, ClassificationPolicy, DefectClass, PartEnd};
pub use deviation::DeviationStats;
pub use error::{CloudRole, InspectionError, InspectionResult};
pub use report::{analyze, DefectReport, ReportCondition, Verdict};
pub use signature::{DeviationSignature, RegionShape, ANGULAR_SECTORS};
