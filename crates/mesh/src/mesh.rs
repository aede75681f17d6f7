use hashbrown::HashMap;
use partscan_core::{Point3, PointCloud};
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh. Triangles wind counter-clockwise seen from
/// outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Unit normal of triangle `i`, or zero for a sliver.
    pub fn face_normal(&self, i: usize) -> [f64; 3] {
        let [a, b, c] = self.triangle(i);
        let n = (b.to_vector() - a.to_vector()).cross(&(c.to_vector() - a.to_vector()));
        let len = n.norm();
        if len > f64::EPSILON {
            [n.x / len, n.y / len, n.z / len]
        } else {
            [0.0; 3]
        }
    }

    pub fn triangle_area(&self, i: usize) -> f64 {
        let [a, b, c] = self.triangle(i);
        0.5 * (b.to_vector() - a.to_vector())
            .cross(&(c.to_vector() - a.to_vector()))
            .norm()
    }

    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len()).map(|i| self.triangle_area(i)).sum()
    }

    /// Number of triangles using each undirected edge.
    fn edge_use(&self) -> HashMap<(u32, u32), usize> {
        let mut uses: HashMap<(u32, u32), usize> = HashMap::with_capacity(self.triangles.len() * 3 / 2);
        for &[a, b, c] in &self.triangles {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *uses.entry((u.min(v), u.max(v))).or_default() += 1;
            }
        }
        uses
    }

    /// Edges used by exactly one triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_use().values().filter(|&&n| n == 1).count()
    }

    /// True when every edge is shared by exactly two triangles.
    pub fn is_closed(&self) -> bool {
        !self.triangles.is_empty() && self.edge_use().values().all(|&n| n == 2)
    }

    pub fn to_point_cloud(&self) -> PointCloud {
        PointCloud::from_points(&self.vertices)
    }

    /// Signed volume enclosed by a closed mesh; positive for outward
    /// winding.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                let a = self.vertices[a as usize].to_vector();
                let b = self.vertices[b as usize].to_vector();
                let c = self.vertices[c as usize].to_vector();
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }
}
