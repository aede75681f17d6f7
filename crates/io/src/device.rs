//! Line protocol of the turntable scanner.
//!
//! Each reading is `layer|distance|table_angle_deg|spindle_height`. The
//! sensor looks at the rotation axis from a fixed distance, so the part
//! radius at that reading is the sensor-to-axis distance minus the measured
//! distance. A line reading `FIM` ends the capture.

use partscan_core::{Point3, PointCloud};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::BufRead;
use tracing::{debug, info};

use crate::error::IoResult;

/// End-of-capture sentinel.
pub const END_OF_CAPTURE: &str = "FIM";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceGeometry {
    /// Distance from the sensor to the turntable axis (mm).
    pub sensor_to_table_mm: f64,
}

impl Default for DeviceGeometry {
    fn default() -> Self {
        Self {
            sensor_to_table_mm: 103.44,
        }
    }
}

/// Result of reading a device stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceCapture {
    pub cloud: PointCloud,
    /// Non-empty lines that were not valid readings.
    pub skipped_lines: usize,
    /// Whether the stream ended with the sentinel rather than EOF.
    pub terminated: bool,
}

/// Parses one reading into a Cartesian point, or `None` if the line is not a
/// well-formed reading.
pub fn parse_sample_line(line: &str, geometry: &DeviceGeometry) -> Option<Point3> {
    let mut fields = line.trim().split('|');
    let _layer = fields.next()?;
    let distance: f64 = fields.next()?.trim().parse().ok()?;
    let angle_deg: f64 = fields.next()?.trim().parse().ok()?;
    let height: f64 = fields.next()?.trim().parse().ok()?;
    if fields.next().is_some() {
        return None;
    }

    let radius = geometry.sensor_to_table_mm - distance;
    let theta = angle_deg.to_radians();
    let p = Point3::new(radius * theta.cos(), radius * theta.sin(), height);
    p.is_finite().then_some(p)
}

/// Reads readings until the sentinel line or EOF.
///
/// Blank lines are ignored. Malformed lines, including lines that are not
/// valid UTF-8, are counted and skipped; only read failures are errors.
pub fn read_device_stream<R: BufRead>(mut reader: R, geometry: &DeviceGeometry) -> IoResult<DeviceCapture> {
    let mut capture = DeviceCapture::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        // Serial noise can carry bytes that are not UTF-8; they are dropped
        // and whatever text remains is parsed as usual.
        let decoded = String::from_utf8_lossy(&buf);
        let had_noise = matches!(decoded, Cow::Owned(_));
        let line = decoded.replace(char::REPLACEMENT_CHARACTER, "");
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if had_noise {
                capture.skipped_lines += 1;
                debug!(line = line_no, "skipping undecodable device line");
            }
            continue;
        }
        if trimmed.eq_ignore_ascii_case(END_OF_CAPTURE) {
            capture.terminated = true;
            break;
        }
        match parse_sample_line(trimmed, geometry) {
            Some(p) => capture.cloud.push(p),
            None => {
                capture.skipped_lines += 1;
                debug!(line = line_no, content = trimmed, "skipping malformed device line");
            }
        }
    }

    info!(
        points = capture.cloud.len(),
        skipped = capture.skipped_lines,
        terminated = capture.terminated,
        "device capture finished"
    );
    Ok(capture)
}
