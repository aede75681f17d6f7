use hashbrown::HashMap;
use partscan_core::{Point3, PointCloud};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::hull::convex_hull;
use crate::mesh::TriangleMesh;

/// Surface construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionMethod {
    /// Closed convex envelope; concavities are bridged over.
    #[default]
    ConvexHull,
    /// Delaunay triangulation of the cloud's directions about its centroid,
    /// lifted back to the original points. Keeps concavities of star-shaped
    /// parts.
    DelaunaySurface,
}

impl fmt::Display for ReconstructionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReconstructionMethod::ConvexHull => "hull",
            ReconstructionMethod::DelaunaySurface => "delaunay",
        })
    }
}

impl FromStr for ReconstructionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hull" | "convex" | "convex-hull" | "convex_hull" => Ok(Self::ConvexHull),
            "delaunay" | "delaunay-surface" | "delaunay_surface" => Ok(Self::DelaunaySurface),
            other => Err(format!("unknown reconstruction method '{other}'")),
        }
    }
}

/// Build a closed triangle mesh over `cloud`.
///
/// Only points that end up on the surface become mesh vertices; they keep
/// their original coordinates.
pub fn reconstruct(cloud: &PointCloud, method: ReconstructionMethod) -> MeshResult<TriangleMesh> {
    if let Some(index) = cloud.first_non_finite() {
        return Err(MeshError::NonFiniteInput { index });
    }
    let points = cloud.to_points();

    let triangles = match method {
        ReconstructionMethod::ConvexHull => convex_hull(&points)?,
        ReconstructionMethod::DelaunaySurface => spherical_delaunay(&points)?,
    };

    let mesh = compact(&points, &triangles);
    debug!(
        %method,
        input = points.len(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "reconstructed surface"
    );
    Ok(mesh)
}

/// The Delaunay triangulation of points on a sphere is their convex hull,
/// so triangulating the unit directions from the centroid and reusing the
/// connectivity on the original points gives a surface that follows the
/// part inward where it is dented.
fn spherical_delaunay(points: &[Point3]) -> MeshResult<Vec<[usize; 3]>> {
    if points.len() < 4 {
        return Err(MeshError::degenerate(format!(
            "need at least 4 points, got {}",
            points.len()
        )));
    }
    let centroid = Point3::from(
        points
            .iter()
            .fold(Point3::ORIGIN.to_vector(), |acc, p| acc + p.to_vector())
            / points.len() as f64,
    );

    let mut directions = Vec::with_capacity(points.len());
    let mut source = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let d = p.to_vector() - centroid.to_vector();
        let len = d.norm();
        if len > f64::EPSILON {
            directions.push(Point3::from(d / len));
            source.push(i);
        }
    }

    let triangles = convex_hull(&directions)?;
    Ok(triangles
        .into_iter()
        .map(|[a, b, c]| [source[a], source[b], source[c]])
        .collect())
}

/// Renumber the used points densely, in order of first use.
fn compact(points: &[Point3], triangles: &[[usize; 3]]) -> TriangleMesh {
    let mut remap: HashMap<usize, u32> = HashMap::new();
    let mut mesh = TriangleMesh::new();
    mesh.triangles.reserve(triangles.len());

    for tri in triangles {
        let mut out = [0u32; 3];
        for (slot, &i) in out.iter_mut().zip(tri) {
            *slot = *remap.entry(i).or_insert_with(|| {
                mesh.vertices.push(points[i]);
                (mesh.vertices.len() - 1) as u32
            });
        }
        mesh.triangles.push(out);
    }
    mesh
}
