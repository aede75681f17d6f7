use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use partscan_core::{Point3, PointCloud};
use std::num::NonZero;

use crate::error::{SpatialError, SpatialResult};

/// Closest stored point to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the cloud the tree was built from.
    pub index: usize,
    pub point: Point3,
    /// Euclidean (not squared) distance to the query.
    pub distance: f64,
}

/// A KdTree for nearest-neighbour queries on 3D point clouds.
///
/// Built on top of kiddo v5's `ImmutableKdTree`, which uses a cache-optimized
/// layout for faster queries than the mutable variant. The tree is built once
/// and cannot be modified afterwards, so it can be shared freely between
/// reader threads.
///
/// The tree stores `u32` indices mapping back to the original PointCloud.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f64, u32, 3, 32>,
    points: Vec<[f64; 3]>,
}

impl KdTree {
    /// Build a KdTree from a PointCloud.
    ///
    /// Points are extracted into a contiguous `[[f64; 3]]` slice and fed to
    /// kiddo's `ImmutableKdTree` constructor, which builds a balanced tree in
    /// one pass.
    pub fn build(cloud: &PointCloud) -> SpatialResult<Self> {
        if cloud.is_empty() {
            return Err(SpatialError::EmptyInput);
        }
        if let Some(index) = cloud.first_non_finite() {
            return Err(SpatialError::NonFinitePoint { index });
        }

        let points: Vec<[f64; 3]> = cloud.iter_points().map(Point3::to_array).collect();
        let tree = ImmutableKdTree::new_from_slice(&points);

        Ok(Self { tree, points })
    }

    /// Returns the number of points in the tree.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; construction rejects empty input.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Point3 {
        Point3::from(self.points[index])
    }

    /// Closest stored point to `query`.
    ///
    /// Returns `None` only if `query` has a NaN or infinite coordinate. When
    /// several stored points are equidistant, the one returned is whichever
    /// the tree traversal reaches first; callers must not depend on which.
    pub fn nearest(&self, query: &Point3) -> Option<Neighbor> {
        if !query.is_finite() {
            return None;
        }

        let nn = self
            .tree
            .nearest_one::<SquaredEuclidean>(&query.to_array());
        let index = nn.item as usize;

        Some(Neighbor {
            index,
            point: self.point(index),
            distance: nn.distance.sqrt(),
        })
    }

    /// Find the `k` nearest neighbours to `query`.
    ///
    /// Returns `(indices, distances)` where distances are **Euclidean**
    /// (not squared), sorted in ascending order by distance.
    ///
    /// Edge cases:
    /// - Returns empty if `k == 0` or query contains NaN.
    /// - If `k > len()`, returns all points.
    pub fn knn(&self, query: &Point3, k: usize) -> (Vec<usize>, Vec<f64>) {
        let Some(nz_k) = NonZero::new(k) else {
            return (Vec::new(), Vec::new());
        };
        if !query.is_finite() {
            return (Vec::new(), Vec::new());
        }

        let results = self
            .tree
            .nearest_n::<SquaredEuclidean>(&query.to_array(), nz_k);

        let mut indices = Vec::with_capacity(results.len());
        let mut distances = Vec::with_capacity(results.len());
        for nn in results {
            indices.push(nn.item as usize);
            distances.push(nn.distance.sqrt());
        }

        (indices, distances)
    }

    /// Find all points within `radius` (Euclidean distance) of `query`.
    ///
    /// Returns indices of points where `euclidean_dist <= radius`, sorted by
    /// index. Empty if radius <= 0, radius is non-finite, or query contains
    /// NaN.
    pub fn radius_search(&self, query: &Point3, radius: f64) -> Vec<usize> {
        if radius <= 0.0 || !radius.is_finite() || !query.is_finite() {
            return Vec::new();
        }

        let radius_sq = radius * radius;

        // kiddo's `within_unsorted` uses strict `<`. To include points
        // exactly on the boundary (dist == radius), we query with a tiny
        // epsilon added, then post-filter with `<=`.
        let query_radius_sq = radius_sq + f64::EPSILON * radius_sq.max(1.0);

        let results = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&query.to_array(), query_radius_sq);

        let mut indices: Vec<usize> = results
            .into_iter()
            .filter(|nn| nn.distance <= radius_sq)
            .map(|nn| nn.item as usize)
            .collect();

        indices.sort_unstable();
        indices
    }
}

/// Mean distance from each point of `cloud` to its closest *other* point in
/// `tree`, where `tree` was built over `cloud`.
///
/// Returns 0.0 for a single-point cloud.
pub fn mean_spacing(cloud: &PointCloud, tree: &KdTree) -> f64 {
    if cloud.len() < 2 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for p in cloud.iter_points() {
        let (_, distances) = tree.knn(&p, 2);
        if let Some(&d) = distances.get(1) {
            sum += d;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
