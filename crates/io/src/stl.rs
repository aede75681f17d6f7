//! STL export and import.
//!
//! Binary layout: an 80-byte header, a little-endian `u32` facet count, then
//! 50 bytes per facet (normal and three vertices as `f32` triples, plus a
//! `u16` attribute count). ASCII files start with `solid`.

use hashbrown::HashMap;
use partscan_core::{Point3, PointCloud};
use partscan_mesh::TriangleMesh;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{IoError, IoResult};

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Writes `mesh` as binary STL.
pub fn write_stl_binary(path: impl AsRef<Path>, mesh: &TriangleMesh) -> IoResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    let mut header = [b' '; HEADER_SIZE];
    let text = b"binary STL written by partscan";
    header[..text.len()].copy_from_slice(text);
    writer.write_all(&header)?;

    let count = u32::try_from(mesh.triangle_count())
        .map_err(|_| IoError::invalid_content("too many triangles for STL"))?;
    writer.write_all(&count.to_le_bytes())?;

    for i in 0..mesh.triangle_count() {
        write_f32_triple(&mut writer, mesh.face_normal(i))?;
        for v in mesh.triangle(i) {
            write_f32_triple(&mut writer, v.to_array())?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    writer.flush()?;
    debug!(path = %path.display(), triangles = count, "wrote binary stl");
    Ok(())
}

fn write_f32_triple<W: Write>(writer: &mut W, v: [f64; 3]) -> IoResult<()> {
    for c in v {
        writer.write_all(&(c as f32).to_le_bytes())?;
    }
    Ok(())
}

/// Writes `mesh` as ASCII STL under the solid name `name`.
pub fn write_stl_ascii(path: impl AsRef<Path>, mesh: &TriangleMesh, name: &str) -> IoResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "solid {name}")?;
    for i in 0..mesh.triangle_count() {
        let [nx, ny, nz] = mesh.face_normal(i);
        writeln!(writer, "  facet normal {nx:.6e} {ny:.6e} {nz:.6e}")?;
        writeln!(writer, "    outer loop")?;
        for v in mesh.triangle(i) {
            writeln!(writer, "      vertex {:.6e} {:.6e} {:.6e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {name}")?;
    writer.flush()?;
    debug!(path = %path.display(), triangles = mesh.triangle_count(), "wrote ascii stl");
    Ok(())
}

/// Reads an STL file, detecting ASCII or binary.
///
/// Facet corners with identical coordinates are merged into one vertex.
pub fn read_stl(path: impl AsRef<Path>) -> IoResult<TriangleMesh> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path).map_err(|e| IoError::open(path, e))?);

    let mut head = Vec::with_capacity(HEADER_SIZE + 4);
    (&mut reader)
        .take((HEADER_SIZE + 4) as u64)
        .read_to_end(&mut head)?;
    if head.len() < 6 {
        return Err(IoError::invalid_content("file too small to be STL"));
    }

    let text = String::from_utf8_lossy(&head[..head.len().min(HEADER_SIZE)]);
    let looks_ascii =
        text.trim_start().starts_with("solid") && !head[..head.len().min(HEADER_SIZE)].contains(&0);

    let mesh = if looks_ascii {
        read_ascii(head.as_slice().chain(reader))?
    } else {
        read_binary(&head, reader)?
    };
    debug!(
        path = %path.display(),
        ascii = looks_ascii,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "read stl"
    );
    Ok(mesh)
}

/// Welds facet corners into an indexed mesh.
#[derive(Default)]
struct MeshBuilder {
    mesh: TriangleMesh,
    index: HashMap<[u64; 3], u32>,
}

impl MeshBuilder {
    fn vertex(&mut self, p: [f64; 3]) -> u32 {
        let key = [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()];
        let mesh = &mut self.mesh;
        *self.index.entry(key).or_insert_with(|| {
            mesh.vertices.push(Point3::from(p));
            (mesh.vertices.len() - 1) as u32
        })
    }

    fn facet(&mut self, corners: [[f64; 3]; 3]) {
        let tri = corners.map(|c| self.vertex(c));
        self.mesh.triangles.push(tri);
    }
}

fn read_binary<R: Read>(head: &[u8], mut reader: R) -> IoResult<TriangleMesh> {
    if head.len() < HEADER_SIZE + 4 {
        return Err(IoError::InvalidHeader {
            expected: HEADER_SIZE + 4,
            got: head.len(),
        });
    }
    let count = u32::from_le_bytes([
        head[HEADER_SIZE],
        head[HEADER_SIZE + 1],
        head[HEADER_SIZE + 2],
        head[HEADER_SIZE + 3],
    ]);

    let mut builder = MeshBuilder::default();
    let mut buf = [0u8; TRIANGLE_SIZE];
    for i in 0..count {
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => IoError::InvalidFaceCount {
                expected: count,
                got: i,
            },
            _ => IoError::Io(e),
        })?;
        builder.facet([
            read_f32_triple(&buf[12..24]),
            read_f32_triple(&buf[24..36]),
            read_f32_triple(&buf[36..48]),
        ]);
    }
    Ok(builder.mesh)
}

fn read_f32_triple(buf: &[u8]) -> [f64; 3] {
    let c = |k: usize| f64::from(f32::from_le_bytes([buf[k], buf[k + 1], buf[k + 2], buf[k + 3]]));
    [c(0), c(4), c(8)]
}

fn read_ascii<R: BufRead>(reader: R) -> IoResult<TriangleMesh> {
    let mut builder = MeshBuilder::default();
    let mut corners: Vec<[f64; 3]> = Vec::with_capacity(3);

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "outer" => corners.clear(),
            "vertex" => {
                let mut v = [0.0; 3];
                for slot in &mut v {
                    let field = parts
                        .next()
                        .ok_or_else(|| IoError::parse(i + 1, "vertex needs 3 coordinates"))?;
                    *slot = field
                        .parse()
                        .map_err(|e| IoError::parse(i + 1, format!("'{field}': {e}")))?;
                }
                corners.push(v);
            }
            "endfacet" => {
                if corners.len() != 3 {
                    return Err(IoError::parse(
                        i + 1,
                        format!("facet has {} vertices", corners.len()),
                    ));
                }
                builder.facet([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }
    Ok(builder.mesh)
}

/// Draws `n` distinct mesh vertices at random as a point cloud; returns every
/// vertex when the mesh has `n` or fewer.
pub fn sample_mesh_vertices(mesh: &TriangleMesh, n: usize, seed: u64) -> PointCloud {
    if n >= mesh.vertex_count() {
        return PointCloud::from_points(&mesh.vertices);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, mesh.vertex_count(), n).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| mesh.vertices[i]).collect()
}
