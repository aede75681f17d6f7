//! End-to-end inspection: align the sample, then compare it to the reference.

use partscan_core::{apply_transform, PointCloud, ReferenceModel, RigidTransform};
use partscan_inspection::{
    analyze, DefectClass, DefectReport, DeviationStats, InspectionError, ReportCondition, Verdict,
};
use partscan_registration::{align, AlignmentResult, AlignmentWarning, RegistrationError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span};

use crate::config::{ConfigError, InspectionConfig};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("alignment failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error("deviation analysis failed: {0}")]
    Inspection(#[from] InspectionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectionOutcome {
    pub alignment: AlignmentResult,
    /// The sample moved into the reference frame.
    pub aligned: PointCloud,
    pub report: DefectReport,
}

impl InspectionOutcome {
    pub fn verdict(&self) -> Verdict {
        self.report.verdict()
    }

    pub fn summary(&self) -> InspectionSummary {
        InspectionSummary {
            verdict: self.verdict(),
            class: self.report.class,
            tolerance_mm: self.report.tolerance,
            fraction_out_of_tolerance: self.report.fraction_out_of_tolerance,
            sample_points: self.aligned.len(),
            flagged_sample_points: self.report.flagged_sample_indices().len(),
            uncovered_reference_points: self.report.flagged_reference_indices().len(),
            sample_stats: self.report.stats,
            coverage_stats: self.report.coverage_stats,
            transform: self.alignment.transform,
            icp_iterations: self.alignment.iterations,
            icp_converged: self.alignment.converged,
            icp_final_error: self.alignment.final_error,
            warnings: self.alignment.warnings.clone(),
            conditions: self.report.conditions.clone(),
        }
    }
}

/// Compact, serializable view of an [`InspectionOutcome`] without per-point data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionSummary {
    pub verdict: Verdict,
    pub class: DefectClass,
    pub tolerance_mm: f64,
    pub fraction_out_of_tolerance: f64,
    pub sample_points: usize,
    pub flagged_sample_points: usize,
    pub uncovered_reference_points: usize,
    pub sample_stats: DeviationStats,
    pub coverage_stats: DeviationStats,
    pub transform: RigidTransform,
    pub icp_iterations: usize,
    pub icp_converged: bool,
    pub icp_final_error: f64,
    pub warnings: Vec<AlignmentWarning>,
    pub conditions: Vec<ReportCondition>,
}

/// Aligns `sample` to `reference` with ICP, applies the transform and
/// analyses the deviations of the aligned sample.
pub fn inspect(
    sample: &PointCloud,
    reference: &ReferenceModel,
    config: &InspectionConfig,
) -> Result<InspectionOutcome, PipelineError> {
    config.validate()?;
    let _span = info_span!("inspect", sample = sample.len(), reference = reference.len()).entered();

    let alignment = align(sample, reference.cloud(), &config.icp)?;
    let aligned = apply_transform(sample, &alignment.transform);
    let report = analyze(
        &aligned,
        reference.cloud(),
        config.inspection.tolerance_mm,
        &config.classification,
    )?;

    info!(
        verdict = ?report.verdict(),
        icp_iterations = alignment.iterations,
        icp_error = alignment.final_error,
        "inspection finished"
    );
    Ok(InspectionOutcome {
        alignment,
        aligned,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use partscan_simulation::{generate, generate_with, DefectKind, DefectSpec, GenerateOptions};

    fn reference(config: &InspectionConfig) -> ReferenceModel {
        let shape = config.simulation.cylinder();
        ReferenceModel::new(generate(&shape, config.simulation.density, None).unwrap())
    }

    #[test]
    fn offset_good_part_is_approved() {
        let config = InspectionConfig::default();
        let options = GenerateOptions {
            jitter: None,
            pose: Some(RigidTransform::from_axis_angle(
                [0.0, 0.0, 1.0],
                1f64.to_radians(),
                [0.3, -0.2, 0.1],
            )),
        };
        let shape = config.simulation.cylinder();
        let sample = generate_with(&shape, config.simulation.density, None, &options).unwrap();

        let outcome = inspect(&sample, &reference(&config), &config).unwrap();
        assert_eq!(outcome.verdict(), Verdict::Approved);
        assert!(outcome.alignment.final_error < 0.5);
        assert_eq!(outcome.aligned.len(), sample.len());
    }

    #[test]
    fn side_hole_is_rejected() {
        let config = InspectionConfig::default();
        let shape = config.simulation.cylinder();
        let hole = DefectSpec::preset(DefectKind::SideHole, &shape).unwrap();
        let sample = generate(&shape, config.simulation.density, Some(&hole)).unwrap();

        let outcome = inspect(&sample, &reference(&config), &config).unwrap();
        assert!(matches!(
            outcome.verdict(),
            Verdict::Rejected {
                class: DefectClass::SideHole { .. }
            }
        ));
        let summary = outcome.summary();
        assert!(summary.uncovered_reference_points > 0);
        assert!(summary.fraction_out_of_tolerance > 0.0);
    }

    #[test]
    fn invalid_config_is_reported_before_work() {
        let mut config = InspectionConfig::default();
        config.inspection.tolerance_mm = 0.0;
        let cloud = generate(&config.simulation.sphere(), 100, None).unwrap();
        let reference = ReferenceModel::new(cloud.clone());
        assert!(matches!(
            inspect(&cloud, &reference, &config),
            Err(PipelineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn registration_errors_pass_through() {
        let config = InspectionConfig::default();
        let tiny = PointCloud::from_xyz(vec![0.0, 1.0], vec![0.0; 2], vec![0.0; 2]);
        assert!(matches!(
            inspect(&tiny, &reference(&config), &config),
            Err(PipelineError::Registration(_))
        ));
    }
}
