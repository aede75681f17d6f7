use partscan_core::PointCloud;
use partscan_spatial::{mean_spacing, KdTree};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classify::{classify, ClassificationPolicy, DefectClass};
use crate::deviation::{
    coverage_deviations, out_of_tolerance, sample_deviations, DeviationStats,
};
use crate::error::{CloudRole, InspectionError, InspectionResult};
use crate::signature::{DeviationSignature, ReferenceFrame, RegionShape, ShapeParams};

/// Soft outcome attached to a report instead of failing the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum ReportCondition {
    /// Bounding-box diagonals differ by more than the policy allows; the
    /// sample is probably a different part or in different units.
    ScaleMismatch {
        sample_diagonal: f64,
        reference_diagonal: f64,
        ratio: f64,
    },
}

/// Overall decision derived from a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected { class: DefectClass },
    Inconclusive,
}

/// Result of one sample-versus-reference comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
    pub tolerance: f64,
    /// Unsigned distance from each sample point to the reference (mm).
    pub sample_deviations: Vec<f64>,
    /// `sample_deviations` signed positive outward.
    pub signed_deviations: Vec<f64>,
    /// Distance from each reference point to the sample (mm).
    pub coverage_deviations: Vec<f64>,
    /// Statistics over `sample_deviations`.
    pub stats: DeviationStats,
    /// Statistics over `coverage_deviations`.
    pub coverage_stats: DeviationStats,
    /// Flagged points over both clouds divided by the total point count.
    pub fraction_out_of_tolerance: f64,
    pub sample_fraction_out: f64,
    pub coverage_fraction_out: f64,
    pub signature: DeviationSignature,
    pub class: DefectClass,
    pub conditions: Vec<ReportCondition>,
}

impl DefectReport {
    pub fn verdict(&self) -> Verdict {
        if !self.conditions.is_empty() {
            Verdict::Inconclusive
        } else if self.class.is_ok() {
            Verdict::Approved
        } else {
            Verdict::Rejected { class: self.class }
        }
    }

    pub fn is_approved(&self) -> bool {
        self.verdict() == Verdict::Approved
    }

    /// Indices of sample points beyond tolerance.
    pub fn flagged_sample_indices(&self) -> Vec<usize> {
        out_of_tolerance(self.sample_deviations.iter().copied(), self.tolerance)
    }

    /// Indices of reference points the sample does not cover.
    pub fn flagged_reference_indices(&self) -> Vec<usize> {
        out_of_tolerance(self.coverage_deviations.iter().copied(), self.tolerance)
    }
}

/// Compare an aligned sample against the reference.
///
/// Deviations are measured in both directions: sample points that stray
/// from the reference surface, and reference points the sample fails to
/// cover. Both clouds must be non-empty and finite.
pub fn analyze(
    aligned: &PointCloud,
    reference: &PointCloud,
    tolerance: f64,
    policy: &ClassificationPolicy,
) -> InspectionResult<DefectReport> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(InspectionError::InvalidTolerance(tolerance));
    }
    policy.validate()?;
    for (cloud, role) in [(aligned, CloudRole::Sample), (reference, CloudRole::Reference)] {
        if cloud.is_empty() {
            return Err(InspectionError::EmptyCloud { role });
        }
        if let Some(index) = cloud.first_non_finite() {
            return Err(InspectionError::NonFiniteInput { role, index });
        }
    }

    let reference_tree = KdTree::build(reference).map_err(|source| InspectionError::Index {
        role: CloudRole::Reference,
        source,
    })?;
    let sample_tree = KdTree::build(aligned).map_err(|source| InspectionError::Index {
        role: CloudRole::Sample,
        source,
    })?;

    let centroid = reference
        .centroid()
        .ok_or(InspectionError::EmptyCloud {
            role: CloudRole::Reference,
        })?;

    let deviations = sample_deviations(aligned, &reference_tree, &centroid);
    let sample_deviations: Vec<f64> = deviations.iter().map(|d| d.distance).collect();
    let signed_deviations: Vec<f64> = deviations.iter().map(|d| d.signed).collect();
    let coverage_deviations = coverage_deviations(reference, &sample_tree);

    let flagged_sample = out_of_tolerance(sample_deviations.iter().copied(), tolerance);
    let flagged_reference = out_of_tolerance(coverage_deviations.iter().copied(), tolerance);

    let total = (aligned.len() + reference.len()) as f64;
    let fraction_out_of_tolerance = (flagged_sample.len() + flagged_reference.len()) as f64 / total;
    let sample_fraction_out = flagged_sample.len() as f64 / aligned.len() as f64;
    let coverage_fraction_out = flagged_reference.len() as f64 / reference.len() as f64;

    let frame = ReferenceFrame::of(reference, centroid);
    let params = ShapeParams {
        axis_exclusion: policy.axis_exclusion,
        end_band: policy.end_band,
        cluster_radius: policy.cluster_radius_factor * mean_spacing(reference, &reference_tree),
    };

    let mut signed_sum = 0.0;
    let mut max_inward: f64 = 0.0;
    let mut max_outward: f64 = 0.0;
    for &i in &flagged_sample {
        let s = signed_deviations[i];
        signed_sum += s;
        if s < 0.0 {
            max_inward = max_inward.max(-s);
        } else {
            max_outward = max_outward.max(s);
        }
    }
    let mean_signed_excess = if flagged_sample.is_empty() {
        0.0
    } else {
        signed_sum / flagged_sample.len() as f64
    };

    let signature = DeviationSignature {
        fraction_out_of_tolerance,
        excess: RegionShape::measure(&aligned.select(&flagged_sample), &frame, &params),
        missing: RegionShape::measure(&reference.select(&flagged_reference), &frame, &params),
        mean_signed_excess,
        max_inward,
        max_outward,
    };
    let class = classify(&signature, policy);

    let mut conditions = Vec::new();
    if let Some(condition) = scale_check(aligned, reference, policy.max_scale_ratio) {
        warn!(?condition, "sample and reference differ in scale");
        conditions.push(condition);
    }

    let stats = DeviationStats::from_values(&sample_deviations);
    let coverage_stats = DeviationStats::from_values(&coverage_deviations);

    info!(
        class = %class,
        fraction = fraction_out_of_tolerance,
        excess = signature.excess.count,
        missing = signature.missing.count,
        mean_mm = stats.mean,
        max_mm = stats.max,
        "inspection complete"
    );

    Ok(DefectReport {
        tolerance,
        sample_deviations,
        signed_deviations,
        coverage_deviations,
        stats,
        coverage_stats,
        fraction_out_of_tolerance,
        sample_fraction_out,
        coverage_fraction_out,
        signature,
        class,
        conditions,
    })
}

fn scale_check(sample: &PointCloud, reference: &PointCloud, max_ratio: f64) -> Option<ReportCondition> {
    let sample_diagonal = sample.aabb().diagonal();
    let reference_diagonal = reference.aabb().diagonal();
    let (big, small) = if sample_diagonal >= reference_diagonal {
        (sample_diagonal, reference_diagonal)
    } else {
        (reference_diagonal, sample_diagonal)
    };
    let ratio = if big == 0.0 {
        1.0
    } else if small == 0.0 {
        f64::INFINITY
    } else {
        big / small
    };

    (ratio > max_ratio).then_some(ReportCondition::ScaleMismatch {
        sample_diagonal,
        reference_diagonal,
        ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PartEnd;
    use partscan_core::{apply_transform, RigidTransform};
    use partscan_simulation::{generate, CapEnd, DefectKind, DefectSpec, Shape};
    use proptest::prelude::*;

    const TOLERANCE: f64 = 3.0;

    fn cylinder() -> Shape {
        Shape::Cylinder {
            radius: 10.0,
            height: 20.0,
        }
    }

    fn reference() -> PointCloud {
        generate(&cylinder(), 2500, None).unwrap()
    }

    fn inspect_preset(kind: DefectKind) -> DefectReport {
        let spec = DefectSpec::preset(kind, &cylinder()).unwrap();
        let sample = generate(&cylinder(), 2500, Some(&spec)).unwrap();
        analyze(&sample, &reference(), TOLERANCE, &ClassificationPolicy::default()).unwrap()
    }

    #[test]
    fn self_comparison_is_clean() {
        let cloud = reference();
        let report = analyze(&cloud, &cloud, 0.01, &ClassificationPolicy::default()).unwrap();
        assert_eq!(report.stats, DeviationStats::default());
        assert_eq!(report.fraction_out_of_tolerance, 0.0);
        assert_eq!(report.class, DefectClass::Ok);
        assert_eq!(report.verdict(), Verdict::Approved);
        assert!(report.conditions.is_empty());
        assert_eq!(report.sample_deviations.len(), cloud.len());
        assert_eq!(report.coverage_deviations.len(), cloud.len());
    }

    #[test]
    fn side_hole_is_detected_and_grows_with_radius() {
        let reference = reference();
        let policy = ClassificationPolicy::default();
        let mut last = 0.0;
        for radius in [5.0, 6.0, 7.0] {
            let spec = DefectSpec::SideHole {
                azimuth: 0.0,
                z: 0.0,
                radius,
            };
            let sample = generate(&cylinder(), 2500, Some(&spec)).unwrap();
            let report = analyze(&sample, &reference, TOLERANCE, &policy).unwrap();
            assert!(report.fraction_out_of_tolerance > last, "radius {radius}");
            assert!(matches!(report.class, DefectClass::SideHole { .. }), "{:?}", report.class);
            assert_eq!(report.signature.excess.count, 0);
            last = report.fraction_out_of_tolerance;
        }
    }

    #[test]
    fn side_hole_fraction_tracks_hole_area() {
        // With a tolerance much smaller than the hole, only reference points
        // within the tolerance of the hole rim still find a neighbour, so
        // the missing share approaches the removed area share from below.
        // At 3 mm that rim margin eats most of a small hole.
        const DENSITY: usize = 10_000;
        let shape = cylinder();
        let reference = generate(&shape, DENSITY, None).unwrap();
        let policy = ClassificationPolicy::default();

        for radius in [3.0, 4.0, 5.0, 6.0, 7.0] {
            let spec = DefectSpec::SideHole {
                azimuth: 0.0,
                z: 0.0,
                radius,
            };
            let sample = generate(&shape, DENSITY, Some(&spec)).unwrap();
            let report = analyze(&sample, &reference, 0.5, &policy).unwrap();

            let area_share = std::f64::consts::PI * radius * radius / shape.surface_area();
            let ratio = report.coverage_fraction_out / area_share;
            assert!((0.6..=1.1).contains(&ratio), "radius {radius}: ratio {ratio}");
        }
    }

    #[test]
    fn removal_presets_are_classified() {
        assert!(matches!(
            inspect_preset(DefectKind::TopHole).class,
            DefectClass::TopHole { .. }
        ));
        assert!(matches!(
            inspect_preset(DefectKind::MissingCap).class,
            DefectClass::MissingCap {
                end: PartEnd::Top,
                ..
            }
        ));
        assert!(matches!(
            inspect_preset(DefectKind::Broken).class,
            DefectClass::Broken { .. }
        ));
    }

    #[test]
    fn missing_bottom_cap_names_the_end() {
        let spec = DefectSpec::MissingCap {
            end: CapEnd::Bottom,
        };
        let sample = generate(&cylinder(), 2500, Some(&spec)).unwrap();
        let report =
            analyze(&sample, &reference(), TOLERANCE, &ClassificationPolicy::default()).unwrap();
        assert!(matches!(
            report.class,
            DefectClass::MissingCap {
                end: PartEnd::Bottom,
                ..
            }
        ));
    }

    #[test]
    fn deformation_presets_are_classified() {
        let dent = inspect_preset(DefectKind::Dent);
        assert!(matches!(dent.class, DefectClass::Dent { .. }), "{:?}", dent.class);
        assert!(dent.signature.mean_signed_excess < 0.0);

        let stretch = inspect_preset(DefectKind::Stretch);
        assert!(
            matches!(stretch.class, DefectClass::Stretch { .. }),
            "{:?}",
            stretch.class
        );
        assert!(stretch.signature.mean_signed_excess > 0.0);
        assert!(stretch.stats.max > TOLERANCE);
    }

    #[test]
    fn fraction_counts_both_directions() {
        let report = inspect_preset(DefectKind::Stretch);
        let n_s = report.sample_deviations.len();
        let n_r = report.coverage_deviations.len();
        let flagged = report.flagged_sample_indices().len() + report.flagged_reference_indices().len();
        assert_eq!(
            report.fraction_out_of_tolerance,
            flagged as f64 / (n_s + n_r) as f64
        );
        assert_eq!(
            report.sample_fraction_out,
            report.flagged_sample_indices().len() as f64 / n_s as f64
        );
    }

    #[test]
    fn scaled_sample_is_inconclusive() {
        let reference = reference();
        let big: PointCloud = reference
            .iter_points()
            .map(|p| partscan_core::Point3::new(p.x * 5.0, p.y * 5.0, p.z * 5.0))
            .collect();
        let report = analyze(&big, &reference, TOLERANCE, &ClassificationPolicy::default()).unwrap();
        assert!(matches!(
            report.conditions.as_slice(),
            [ReportCondition::ScaleMismatch { ratio, .. }] if (*ratio - 5.0).abs() < 1e-9
        ));
        assert_eq!(report.verdict(), Verdict::Inconclusive);
    }

    #[test]
    fn rejects_bad_input() {
        let cloud = reference();
        let policy = ClassificationPolicy::default();
        assert_eq!(
            analyze(&PointCloud::new(), &cloud, 1.0, &policy).unwrap_err(),
            InspectionError::EmptyCloud {
                role: CloudRole::Sample
            }
        );
        assert_eq!(
            analyze(&cloud, &PointCloud::new(), 1.0, &policy).unwrap_err(),
            InspectionError::EmptyCloud {
                role: CloudRole::Reference
            }
        );
        assert_eq!(
            analyze(&cloud, &cloud, 0.0, &policy).unwrap_err(),
            InspectionError::InvalidTolerance(0.0)
        );
        let mut bad = cloud.clone();
        bad.z[7] = f64::INFINITY;
        assert_eq!(
            analyze(&bad, &cloud, 1.0, &policy).unwrap_err(),
            InspectionError::NonFiniteInput {
                role: CloudRole::Sample,
                index: 7
            }
        );
    }

    #[test]
    fn out_of_range_policy_is_rejected() {
        let cloud = reference();
        let policy = ClassificationPolicy {
            ok_fraction: -0.1,
            ..ClassificationPolicy::default()
        };
        assert!(matches!(
            analyze(&cloud, &cloud, TOLERANCE, &policy),
            Err(InspectionError::InvalidPolicy {
                field: "ok_fraction",
                ..
            })
        ));
    }

    #[test]
    fn rejected_verdict_carries_class() {
        let report = inspect_preset(DefectKind::Broken);
        assert_eq!(
            report.verdict(),
            Verdict::Rejected {
                class: report.class
            }
        );
        assert!(!report.is_approved());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn self_comparison_is_ok_for_any_tolerance(
            tolerance in 1e-6f64..100.0,
            angle in 0.0f64..std::f64::consts::TAU,
        ) {
            let pose = RigidTransform::from_axis_angle([0.3, 0.5, 1.0], angle, [1.0, -2.0, 3.0]);
            let cloud = apply_transform(&generate(&Shape::Sphere { radius: 4.0 }, 300, None).unwrap(), &pose);
            let report = analyze(&cloud, &cloud, tolerance, &ClassificationPolicy::default()).unwrap();
            prop_assert_eq!(report.stats.max, 0.0);
            prop_assert_eq!(report.fraction_out_of_tolerance, 0.0);
            prop_assert_eq!(report.class, DefectClass::Ok);
        }
    }
}
