//! Plain-text `.xyz` point files: one `x y z` triple per line.

use partscan_core::PointCloud;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{IoError, IoResult};

/// Reads an `.xyz` file.
///
/// Blank lines and lines starting with `#` are skipped; values may be
/// separated by whitespace or commas. Extra columns after the third are
/// ignored.
pub fn read_xyz(path: impl AsRef<Path>) -> IoResult<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::open(path, e))?;
    let cloud = parse_xyz(BufReader::new(file))?;
    debug!(path = %path.display(), points = cloud.len(), "read xyz");
    Ok(cloud)
}

pub(crate) fn parse_xyz<R: BufRead>(reader: R) -> IoResult<PointCloud> {
    let mut cloud = PointCloud::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty());
        let mut coords = [0.0f64; 3];
        for (axis, slot) in coords.iter_mut().enumerate() {
            let field = fields
                .next()
                .ok_or_else(|| IoError::parse(i + 1, format!("expected 3 values, got {axis}")))?;
            *slot = field
                .parse()
                .map_err(|e| IoError::parse(i + 1, format!("'{field}': {e}")))?;
        }
        cloud.x.push(coords[0]);
        cloud.y.push(coords[1]);
        cloud.z.push(coords[2]);
    }
    Ok(cloud)
}

/// Writes `cloud` as `.xyz`.
///
/// Uses shortest round-trip float formatting, so [`read_xyz`] reproduces
/// every coordinate bit for bit.
pub fn write_xyz(path: impl AsRef<Path>, cloud: &PointCloud) -> IoResult<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    for i in 0..cloud.len() {
        writeln!(out, "{} {} {}", cloud.x[i], cloud.y[i], cloud.z[i])?;
    }
    out.flush()?;
    debug!(path = %path.display(), points = cloud.len(), "wrote xyz");
    Ok(())
}
