#![forbid(unsafe_code)]
//! File formats and the scanner line protocol.

pub mod device;
pub mod error;
pub mod stl;
pub mod xyz;

pub use device::{parse_sample_line, read_device_stream, DeviceCapture, DeviceGeometry};
pub use error::{IoError, IoResult};
pub use stl::{read_stl, sample_mesh_vertices, write_stl_ascii, write_stl_binary};
pub use xyz::{read_xyz, write_xyz};
