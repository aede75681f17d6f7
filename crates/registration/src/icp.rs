use nalgebra::{Matrix3, Vector3, SVD};
use partscan_core::{apply_transform, PointCloud, RigidTransform};
use partscan_spatial::KdTree;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::correspondence::{find_correspondences, mean_distance, Correspondence};
use crate::error::{CloudRole, RegistrationError, RegistrationResult};

/// Ratio of the second to the largest singular value below which the
/// cross-covariance is treated as rank-deficient.
const SINGULAR_RATIO: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpParams {
    pub max_iterations: usize,
    /// Stop once the mean correspondence distance, or its change between
    /// iterations, falls below this value (mm).
    pub convergence_threshold: f64,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 1e-6,
        }
    }
}

/// Non-fatal conditions met during alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentWarning {
    /// Correspondences could not constrain a rotation at this (1-based)
    /// iteration, so only the centroids were matched.
    DegenerateCorrespondences { iteration: usize },
    /// The iteration cap was reached before the error settled.
    NotConverged { iterations: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Maps the sample into the reference frame.
    pub transform: RigidTransform,
    /// Mean nearest-neighbour distance of the transformed sample (mm).
    pub final_error: f64,
    pub iterations: usize,
    pub converged: bool,
    pub warnings: Vec<AlignmentWarning>,
}

impl AlignmentResult {
    pub fn is_degenerate(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, AlignmentWarning::DegenerateCorrespondences { .. }))
    }
}

/// Point-to-point ICP registration using SVD.
///
/// Aligns `sample` onto `reference` by iteratively pairing each sample point
/// with its nearest reference point and solving for the rigid transform that
/// best maps the pairs (Kabsch). Neither input is modified.
pub fn align(
    sample: &PointCloud,
    reference: &PointCloud,
    params: &IcpParams,
) -> RegistrationResult<AlignmentResult> {
    check_input(sample, CloudRole::Sample)?;
    check_input(reference, CloudRole::Reference)?;

    let tree = KdTree::build(reference)?;
    let threshold = params.convergence_threshold;

    let mut current = sample.clone();
    let mut cumulative = RigidTransform::identity();
    let mut warnings = Vec::new();

    let mut prev_error = f64::INFINITY;
    let mut final_error = f64::INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=params.max_iterations {
        iterations = iteration;

        let correspondences = find_correspondences(&current, &tree);
        let error = mean_distance(&correspondences);
        debug!(iteration, error, "icp iteration");

        if error <= threshold || (prev_error - error).abs() < threshold {
            converged = true;
            final_error = error;
            break;
        }
        prev_error = error;

        let step = match estimate_step(&current, &tree, &correspondences) {
            Step::Rigid(t) => t,
            Step::TranslationOnly(t) => {
                warn!(iteration, "degenerate correspondences, matching centroids only");
                warnings.push(AlignmentWarning::DegenerateCorrespondences { iteration });
                t
            }
        };

        current = apply_transform(&current, &step);
        cumulative = cumulative.compose(&step);
    }

    if !converged {
        final_error = mean_distance(&find_correspondences(&current, &tree));
        warn!(iterations, final_error, "icp hit the iteration cap");
        warnings.push(AlignmentWarning::NotConverged { iterations });
    }

    debug!(
        iterations,
        final_error,
        converged,
        rotation_rad = cumulative.rotation_angle(),
        translation_mm = cumulative.translation_norm(),
        "icp finished"
    );

    Ok(AlignmentResult {
        transform: cumulative,
        final_error,
        iterations,
        converged,
        warnings,
    })
}

fn check_input(cloud: &PointCloud, role: CloudRole) -> RegistrationResult<()> {
    if cloud.len() < 3 {
        return Err(RegistrationError::InsufficientPoints {
            role,
            count: cloud.len(),
        });
    }
    if let Some(index) = cloud.first_non_finite() {
        return Err(RegistrationError::NonFiniteInput { role, index });
    }
    Ok(())
}

enum Step {
    Rigid(RigidTransform),
    TranslationOnly(RigidTransform),
}

/// Compute the rigid transform that best maps the corresponding source
/// points onto their target points.
///
/// Falls back to a pure centroid shift when fewer than three distinct
/// targets are matched or the cross-covariance is rank-deficient.
fn estimate_step(source: &PointCloud, target: &KdTree, correspondences: &[Correspondence]) -> Step {
    let n = correspondences.len();
    if n == 0 {
        return Step::TranslationOnly(RigidTransform::identity());
    }

    let mut src_centroid = Vector3::zeros();
    let mut tgt_centroid = Vector3::zeros();
    for c in correspondences {
        src_centroid += source.point(c.source_index).to_vector();
        tgt_centroid += target.point(c.target_index).to_vector();
    }
    let n_f = n as f64;
    src_centroid /= n_f;
    tgt_centroid /= n_f;

    let centroid_shift = || {
        let t = tgt_centroid - src_centroid;
        RigidTransform::translation(t[0], t[1], t[2])
    };

    let mut targets: Vec<usize> = correspondences.iter().map(|c| c.target_index).collect();
    targets.sort_unstable();
    targets.dedup();
    if targets.len() < 3 {
        return Step::TranslationOnly(centroid_shift());
    }

    // H = sum (src_i - src_centroid)(tgt_i - tgt_centroid)^T
    let mut h = Matrix3::<f64>::zeros();
    for c in correspondences {
        let s = source.point(c.source_index).to_vector() - src_centroid;
        let t = target.point(c.target_index).to_vector() - tgt_centroid;
        h += s * t.transpose();
    }

    match kabsch_rotation(h) {
        Some(rotation) => {
            let translation = tgt_centroid - rotation * src_centroid;
            Step::Rigid(RigidTransform::from_parts(&rotation, &translation))
        }
        None => Step::TranslationOnly(centroid_shift()),
    }
}

/// Proper rotation `R = V U^T` from the SVD of the cross-covariance `H`,
/// or `None` when `H` has rank below two.
fn kabsch_rotation(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = SVD::new(h, true, true);

    let mut sv: Vec<f64> = svd.singular_values.iter().copied().collect();
    sv.sort_by(|a, b| b.total_cmp(a));
    if sv[0] <= f64::EPSILON || sv[1] <= SINGULAR_RATIO * sv[0] {
        return None;
    }

    let u = svd.u?;
    let mut v_t = svd.v_t?;

    // Handle reflection: if det(V * U^T) < 0, negate the last row of V^T
    let det = (v_t.transpose() * u.transpose()).determinant();
    if det < 0.0 {
        v_t[(2, 0)] = -v_t[(2, 0)];
        v_t[(2, 1)] = -v_t[(2, 1)];
        v_t[(2, 2)] = -v_t[(2, 2)];
    }

    Some(v_t.transpose() * u.transpose())
}
