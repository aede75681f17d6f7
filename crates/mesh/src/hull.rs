//! Incremental 3D convex hull.

use hashbrown::HashSet;
use partscan_core::Point3;
use tracing::trace;

use crate::error::{MeshError, MeshResult};

/// Relative tolerance for orientation tests, scaled by the input extent.
const REL_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
struct Face {
    v: [usize; 3],
    /// Unit outward normal.
    normal: [f64; 3],
    /// Plane offset: `normal · x = offset` on the face.
    offset: f64,
}

impl Face {
    fn new(points: &[Point3], v: [usize; 3]) -> Option<Self> {
        let a = points[v[0]].to_vector();
        let n = (points[v[1]].to_vector() - a).cross(&(points[v[2]].to_vector() - a));
        let len = n.norm();
        if len == 0.0 {
            return None;
        }
        let n = n / len;
        Some(Self {
            v,
            normal: [n.x, n.y, n.z],
            offset: n.dot(&a),
        })
    }

    fn distance(&self, p: &Point3) -> f64 {
        self.normal[0] * p.x + self.normal[1] * p.y + self.normal[2] * p.z - self.offset
    }

    fn flipped(self, points: &[Point3]) -> Option<Self> {
        Face::new(points, [self.v[0], self.v[2], self.v[1]])
    }
}

/// Triangles of the convex hull of `points`, indexing into `points`, wound
/// outward.
///
/// Starts from a tetrahedron on extreme points, then inserts the remaining
/// points one at a time: the faces a point can see are removed and the hole
/// is closed with a fan from the point to the horizon. Points inside or on
/// the current hull are skipped, so interior and face-coplanar points are
/// never hull vertices.
pub(crate) fn convex_hull(points: &[Point3]) -> MeshResult<Vec<[usize; 3]>> {
    if points.len() < 4 {
        return Err(MeshError::degenerate(format!(
            "need at least 4 points, got {}",
            points.len()
        )));
    }

    let eps = REL_EPS * extent(points).max(f64::MIN_POSITIVE);
    let [i0, i1, i2, i3] = initial_simplex(points, eps)?;

    let seeds = [i0, i1, i2, i3];
    let interior = Point3::from(
        seeds
            .iter()
            .fold(Point3::ORIGIN.to_vector(), |acc, &i| acc + points[i].to_vector())
            / 4.0,
    );

    let mut faces = Vec::with_capacity(points.len() * 2);
    for v in [[i0, i1, i2], [i0, i1, i3], [i0, i2, i3], [i1, i2, i3]] {
        let face = Face::new(points, v)
            .ok_or_else(|| MeshError::degenerate("initial simplex is flat"))?;
        let face = if face.distance(&interior) > 0.0 {
            face.flipped(points)
                .ok_or_else(|| MeshError::degenerate("initial simplex is flat"))?
        } else {
            face
        };
        faces.push(face);
    }

    for (idx, p) in points.iter().enumerate() {
        if seeds.contains(&idx) {
            continue;
        }

        let visible: Vec<bool> = faces.iter().map(|f| f.distance(p) > eps).collect();
        if !visible.iter().any(|&v| v) {
            continue;
        }

        // Directed edges of the visible region; an edge whose twin is not
        // in the set borders a face that stays, so it is on the horizon.
        let mut edges: HashSet<(usize, usize)> = HashSet::new();
        for (face, _) in faces.iter().zip(&visible).filter(|(_, seen)| **seen) {
            let [a, b, c] = face.v;
            edges.insert((a, b));
            edges.insert((b, c));
            edges.insert((c, a));
        }
        let horizon: Vec<(usize, usize)> = edges
            .iter()
            .copied()
            .filter(|&(a, b)| !edges.contains(&(b, a)))
            .collect();

        faces = faces
            .into_iter()
            .zip(visible)
            .filter_map(|(f, seen)| (!seen).then_some(f))
            .collect();

        for (a, b) in horizon {
            if let Some(face) = Face::new(points, [a, b, idx]) {
                faces.push(face);
            }
        }
        trace!(point = idx, faces = faces.len(), "hull insert");
    }

    Ok(faces.into_iter().map(|f| f.v).collect())
}

fn extent(points: &[Point3]) -> f64 {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for p in points {
        for (k, v) in p.to_array().into_iter().enumerate() {
            min[k] = min[k].min(v);
            max[k] = max[k].max(v);
        }
    }
    (0..3).map(|k| max[k] - min[k]).fold(0.0, f64::max)
}

/// Four affinely independent points spanning as much volume as a greedy
/// search finds.
fn initial_simplex(points: &[Point3], eps: f64) -> MeshResult<[usize; 4]> {
    // Widest pair among the axis extremes.
    let mut extremes = [0usize; 6];
    for (i, p) in points.iter().enumerate() {
        let a = p.to_array();
        for k in 0..3 {
            if a[k] < points[extremes[2 * k]].to_array()[k] {
                extremes[2 * k] = i;
            }
            if a[k] > points[extremes[2 * k + 1]].to_array()[k] {
                extremes[2 * k + 1] = i;
            }
        }
    }
    let mut best = (0.0, extremes[0], extremes[1]);
    for &a in &extremes {
        for &b in &extremes {
            let d = points[a].distance_squared(&points[b]);
            if d > best.0 {
                best = (d, a, b);
            }
        }
    }
    let (spread, i0, i1) = best;
    if spread.sqrt() <= eps {
        return Err(MeshError::degenerate("all points coincide"));
    }

    // Farthest from the line i0-i1.
    let p0 = points[i0].to_vector();
    let dir = (points[i1].to_vector() - p0).normalize();
    let (line_dist, i2) = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let d = p.to_vector() - p0;
            ((d - dir * d.dot(&dir)).norm(), i)
        })
        .fold((0.0, i0), |acc, x| if x.0 > acc.0 { x } else { acc });
    if line_dist <= eps {
        return Err(MeshError::degenerate("all points are collinear"));
    }

    // Farthest from the plane i0-i1-i2.
    let normal = (points[i1].to_vector() - p0)
        .cross(&(points[i2].to_vector() - p0))
        .normalize();
    let (plane_dist, i3) = points
        .iter()
        .enumerate()
        .map(|(i, p)| ((p.to_vector() - p0).dot(&normal).abs(), i))
        .fold((0.0, i0), |acc, x| if x.0 > acc.0 { x } else { acc });
    if plane_dist <= eps {
        return Err(MeshError::degenerate("all points are coplanar"));
    }

    Ok([i0, i1, i2, i3])
}
