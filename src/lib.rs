#![forbid(unsafe_code)]
//! Point-cloud inspection of manufactured parts.
//!
//! A scanned or simulated sample is aligned to a reference with ICP, every
//! point's deviation from the reference is measured, and the pattern of
//! out-of-tolerance points is classified as a defect type. [`pipeline::inspect`]
//! ties the workspace crates together.

pub mod config;
pub mod logging;
pub mod pipeline;

pub use config::{ConfigError, InspectionConfig};
pub use pipeline::{inspect, InspectionOutcome, InspectionSummary, PipelineError};
