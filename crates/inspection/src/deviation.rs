//! Per-point nearest-neighbour deviations and their aggregate statistics.

use partscan_core::{Point3, PointCloud};
use partscan_spatial::KdTree;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Deviation of one point from the other cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PointDeviation {
    pub distance: f64,
    /// `distance` with the sign of `(s - r) · (r - c)`: positive when the
    /// point sits outside the reference surface.
    pub signed: f64,
}

/// Distance from every sample point to its nearest reference point, with a
/// sign taken relative to `reference_centroid`.
///
/// Both clouds must be finite; the caller validates this.
pub(crate) fn sample_deviations(
    sample: &PointCloud,
    reference_tree: &KdTree,
    reference_centroid: &Point3,
) -> Vec<PointDeviation> {
    let c = reference_centroid.to_vector();
    (0..sample.len())
        .into_par_iter()
        .map(|i| {
            let s = sample.point(i);
            match reference_tree.nearest(&s) {
                Some(nn) => {
                    let r = nn.point.to_vector();
                    let outward = (s.to_vector() - r).dot(&(r - c));
                    let signed = if outward < 0.0 {
                        -nn.distance
                    } else {
                        nn.distance
                    };
                    PointDeviation {
                        distance: nn.distance,
                        signed,
                    }
                }
                None => PointDeviation {
                    distance: f64::INFINITY,
                    signed: f64::INFINITY,
                },
            }
        })
        .collect()
}

/// Distance from every reference point to its nearest sample point.
pub(crate) fn coverage_deviations(reference: &PointCloud, sample_tree: &KdTree) -> Vec<f64> {
    (0..reference.len())
        .into_par_iter()
        .map(|i| {
            sample_tree
                .nearest(&reference.point(i))
                .map_or(f64::INFINITY, |nn| nn.distance)
        })
        .collect()
}

/// Summary of a set of unsigned deviations (mm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationStats {
    pub mean: f64,
    pub max: f64,
    pub rms: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl DeviationStats {
    /// All-zero for an empty slice.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let max = values.iter().copied().fold(0.0, f64::max);
        let sum_sq: f64 = values.iter().map(|v| v * v).sum();
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            max,
            rms: (sum_sq / n).sqrt(),
            std_dev: variance.sqrt(),
        }
    }
}

/// Indices of values strictly greater than `tolerance`.
pub(crate) fn out_of_tolerance(values: impl Iterator<Item = f64>, tolerance: f64) -> Vec<usize> {
    values
        .enumerate()
        .filter(|(_, d)| *d > tolerance)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stats_of_known_values() {
        let stats = DeviationStats::from_values(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.rms, (30.0f64 / 4.0).sqrt());
        assert_relative_eq!(stats.std_dev, 1.25f64.sqrt());
    }

    #[test]
    fn stats_of_empty_slice() {
        assert_eq!(DeviationStats::from_values(&[]), DeviationStats::default());
    }

    #[test]
    fn sign_follows_outward_direction() {
        let reference = PointCloud::from_points(&[
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        ]);
        let centroid = reference.centroid().unwrap();
        let tree = KdTree::build(&reference).unwrap();
        let sample = PointCloud::from_points(&[
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(0.0, 0.7, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ]);

        let devs = sample_deviations(&sample, &tree, &centroid);
        assert_relative_eq!(devs[0].signed, 0.5, epsilon = 1e-12);
        assert_relative_eq!(devs[1].signed, -0.3, epsilon = 1e-12);
        assert_eq!(devs[2].distance, 0.0);
        assert_eq!(devs[2].signed, 0.0);
    }

    #[test]
    fn coverage_sees_missing_points() {
        let reference = PointCloud::from_xyz(vec![0.0, 1.0, 5.0], vec![0.0; 3], vec![0.0; 3]);
        let sample = PointCloud::from_xyz(vec![0.0, 1.0], vec![0.0; 2], vec![0.0; 2]);
        let tree = KdTree::build(&sample).unwrap();
        assert_eq!(coverage_deviations(&reference, &tree), vec![0.0, 0.0, 4.0]);
    }

    #[test]
    fn out_of_tolerance_is_strict() {
        let idx = out_of_tolerance([0.5, 1.0, 1.5].into_iter(), 1.0);
        assert_eq!(idx, vec![2]);
    }
}
