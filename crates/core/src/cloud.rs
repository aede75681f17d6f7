use serde::{Deserialize, Serialize};

use crate::{Aabb, Point3};

/// Ordered set of surface samples stored as separate coordinate columns.
///
/// Order carries no geometric meaning; it is kept for provenance so that a
/// generated point can be traced back to the sample that produced it.
/// Duplicate points are legal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
        }
    }

    pub fn from_xyz(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        Self { x, y, z }
    }

    pub fn from_points(points: &[Point3]) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push(*p);
        }
        cloud
    }

    pub fn from_array(data: &[f64], num_points: usize) -> Self {
        assert_eq!(
            data.len(),
            num_points * 3,
            "interleaved xyz input must have num_points * 3 floats"
        );

        let mut cloud = Self::with_capacity(num_points);
        for chunk in data.chunks_exact(3).take(num_points) {
            cloud.push(Point3::new(chunk[0], chunk[1], chunk[2]));
        }
        cloud
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push(&mut self, p: Point3) {
        self.x.push(p.x);
        self.y.push(p.y);
        self.z.push(p.z);
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_xyz(&self.x, &self.y, &self.z)
    }

    pub fn point(&self, i: usize) -> Point3 {
        Point3::new(self.x[i], self.y[i], self.z[i])
    }

    pub fn iter_points(&self) -> impl Iterator<Item = Point3> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| Point3::new(*x, *y, *z))
    }

    pub fn to_points(&self) -> Vec<Point3> {
        self.iter_points().collect()
    }

    /// Arithmetic mean of all points, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Point3> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        Some(Point3::new(
            self.x.iter().sum::<f64>() / n,
            self.y.iter().sum::<f64>() / n,
            self.z.iter().sum::<f64>() / n,
        ))
    }

    /// Index of the first point with a NaN or infinite coordinate.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.iter_points().position(|p| !p.is_finite())
    }

    pub fn select(&self, indices: &[usize]) -> Self {
        let mut out = Self::with_capacity(indices.len());

        for &idx in indices {
            assert!(idx < self.len(), "index out of bounds in select");
            out.push(self.point(idx));
        }

        out
    }

    /// Select all points NOT in the given index set.
    ///
    /// This is the complement of [`select`](Self::select); the returned
    /// cloud preserves the relative order of the retained points.
    ///
    /// # Panics
    ///
    /// Panics if any index in `indices` is out of bounds.
    pub fn select_inverse(&self, indices: &[usize]) -> Self {
        let n = self.len();
        let mut exclude = vec![false; n];
        for &idx in indices {
            assert!(idx < n, "index out of bounds in select_inverse");
            exclude[idx] = true;
        }

        let kept: Vec<usize> = (0..n).filter(|&i| !exclude[i]).collect();
        self.select(&kept)
    }

    pub fn to_array(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len() * 3);
        for i in 0..self.len() {
            out.push(self.x[i]);
            out.push(self.y[i]);
            out.push(self.z[i]);
        }
        out
    }
}

impl FromIterator<Point3> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3>>(iter: I) -> Self {
        let mut cloud = PointCloud::new();
        for p in iter {
            cloud.push(p);
        }
        cloud
    }
}
