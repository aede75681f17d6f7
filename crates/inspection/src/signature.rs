//! Spatial layout of out-of-tolerance points.

use partscan_core::{Point3, PointCloud};
use partscan_spatial::KdTree;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::TAU;

/// Number of azimuth sectors used for angular coverage.
pub const ANGULAR_SECTORS: usize = 36;

/// Geometry of the reference used to normalise region shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReferenceFrame {
    pub centroid: Point3,
    pub z_min: f64,
    pub z_max: f64,
    /// Largest distance of a reference point from the z axis through the
    /// centroid.
    pub radius: f64,
}

impl ReferenceFrame {
    pub fn of(reference: &PointCloud, centroid: Point3) -> Self {
        let aabb = reference.aabb();
        let radius = reference
            .iter_points()
            .map(|p| (p.x - centroid.x).hypot(p.y - centroid.y))
            .fold(0.0, f64::max);
        Self {
            centroid,
            z_min: aabb.min[2],
            z_max: aabb.max[2],
            radius,
        }
    }

    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }
}

/// Knobs that control how region shapes are measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ShapeParams {
    /// Points closer to the axis than this fraction of the reference radius
    /// have no meaningful azimuth and are left out of angular coverage.
    pub axis_exclusion: f64,
    /// Width of the top and bottom end bands as a fraction of height.
    pub end_band: f64,
    /// Flood-fill linking distance (mm).
    pub cluster_radius: f64,
}

/// Shape of one flagged point set, normalised to the reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionShape {
    pub count: usize,
    /// Fraction of [`ANGULAR_SECTORS`] azimuth sectors containing a point.
    pub angular_coverage: f64,
    /// z span of the set divided by the reference height.
    pub z_extent_ratio: f64,
    /// Share of the set lying in the top end band.
    pub top_share: f64,
    /// Share of the set lying in the bottom end band.
    pub bottom_share: f64,
    /// Connected components under the cluster radius.
    pub clusters: usize,
}

impl RegionShape {
    pub(crate) fn measure(points: &PointCloud, frame: &ReferenceFrame, params: &ShapeParams) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let n = points.len() as f64;

        let mut sectors = [false; ANGULAR_SECTORS];
        let min_rho = params.axis_exclusion * frame.radius;
        for p in points.iter_points() {
            let dx = p.x - frame.centroid.x;
            let dy = p.y - frame.centroid.y;
            if dx.hypot(dy) < min_rho {
                continue;
            }
            let azimuth = dy.atan2(dx).rem_euclid(TAU);
            let sector = ((azimuth / TAU) * ANGULAR_SECTORS as f64) as usize;
            sectors[sector.min(ANGULAR_SECTORS - 1)] = true;
        }
        let hit = sectors.iter().filter(|&&s| s).count();

        let height = frame.height();
        let aabb = points.aabb();
        let z_extent_ratio = if height > 0.0 {
            (aabb.max[2] - aabb.min[2]) / height
        } else {
            0.0
        };

        let band = params.end_band * height;
        let top = points.z.iter().filter(|&&z| z >= frame.z_max - band).count();
        let bottom = points.z.iter().filter(|&&z| z <= frame.z_min + band).count();

        Self {
            count: points.len(),
            angular_coverage: hit as f64 / ANGULAR_SECTORS as f64,
            z_extent_ratio,
            top_share: top as f64 / n,
            bottom_share: bottom as f64 / n,
            clusters: count_clusters(points, params.cluster_radius),
        }
    }
}

/// Number of connected components when points within `radius` of each other
/// are linked.
pub(crate) fn count_clusters(points: &PointCloud, radius: f64) -> usize {
    let Ok(tree) = KdTree::build(points) else {
        return 0;
    };
    if radius <= 0.0 {
        return points.len();
    }

    let n = points.len();
    let mut visited = vec![false; n];
    let mut clusters = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        clusters += 1;

        let mut queue = VecDeque::new();
        queue.push_back(i);
        visited[i] = true;

        while let Some(current) = queue.pop_front() {
            for neighbor in tree.radius_search(&points.point(current), radius) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    clusters
}

/// Spatial signature of a comparison: how many points are out of tolerance
/// on each side, which way the excess points moved, and where the flagged
/// regions lie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationSignature {
    /// Combined out-of-tolerance fraction over both clouds.
    pub fraction_out_of_tolerance: f64,
    /// Sample points farther than tolerance from the reference.
    pub excess: RegionShape,
    /// Reference points farther than tolerance from the sample.
    pub missing: RegionShape,
    /// Mean signed deviation of flagged sample points; negative is inward.
    pub mean_signed_excess: f64,
    /// Largest inward deviation among flagged sample points (>= 0).
    pub max_inward: f64,
    /// Largest outward deviation among flagged sample points (>= 0).
    pub max_outward: f64,
}

impl DeviationSignature {
    pub fn flagged_count(&self) -> usize {
        self.excess.count + self.missing.count
    }
}
