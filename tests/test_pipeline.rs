use partscan::config::InspectionConfig;
use partscan::pipeline::inspect;
use partscan_core::{ReferenceModel, RigidTransform};
use partscan_inspection::{DefectClass, Verdict};
use partscan_simulation::{generate, generate_with, DefectKind, DefectSpec, GenerateOptions, Jitter};

fn setup() -> (InspectionConfig, ReferenceModel) {
    let config = InspectionConfig::default();
    let shape = config.simulation.cylinder();
    let reference = generate(&shape, config.simulation.density, None).unwrap();
    (config, ReferenceModel::new(reference))
}

/// Simulate every defect preset on the default cylinder and check that the
/// full align-and-analyse pipeline names it.
#[test]
fn every_preset_is_identified() {
    let (config, reference) = setup();
    let shape = config.simulation.cylinder();

    for kind in DefectKind::ALL {
        let spec = DefectSpec::preset(kind, &shape);
        let sample = generate(&shape, config.simulation.density, spec.as_ref()).unwrap();
        let outcome = inspect(&sample, &reference, &config).unwrap();

        let expected = match kind {
            DefectKind::None => "ok",
            other => other.as_str(),
        };
        assert_eq!(
            outcome.report.class.label(),
            expected,
            "{kind}: {:?}",
            outcome.report.signature
        );
        if kind == DefectKind::None {
            assert_eq!(outcome.verdict(), Verdict::Approved);
        } else {
            assert!(matches!(outcome.verdict(), Verdict::Rejected { .. }), "{kind}");
        }
    }
}

#[test]
fn misplaced_part_is_aligned_before_comparison() {
    let (config, reference) = setup();
    let shape = config.simulation.cylinder();
    let pose = RigidTransform::from_axis_angle([0.3, 0.2, 1.0], 1f64.to_radians(), [0.4, 0.3, -0.2]);
    let options = GenerateOptions {
        jitter: Some(Jitter {
            amplitude: 0.05,
            seed: 11,
        }),
        pose: Some(pose),
    };

    let good = generate_with(&shape, config.simulation.density, None, &options).unwrap();
    let outcome = inspect(&good, &reference, &config).unwrap();
    assert_eq!(outcome.verdict(), Verdict::Approved);
    assert!(outcome.alignment.final_error < 0.2);
    // Without alignment the pose alone leaves a visible offset.
    assert!(outcome.alignment.transform.translation_norm() > 0.1);

    let hole = DefectSpec::preset(DefectKind::SideHole, &shape).unwrap();
    let holed = generate_with(&shape, config.simulation.density, Some(&hole), &options).unwrap();
    let outcome = inspect(&holed, &reference, &config).unwrap();
    assert!(matches!(outcome.report.class, DefectClass::SideHole { .. }));
}

#[test]
fn tighter_tolerance_flags_more() {
    let (mut config, reference) = setup();
    let shape = config.simulation.cylinder();
    let stretch = DefectSpec::preset(DefectKind::Stretch, &shape).unwrap();
    let sample = generate(&shape, config.simulation.density, Some(&stretch)).unwrap();

    let loose = inspect(&sample, &reference, &config).unwrap();
    config.inspection.tolerance_mm = 1.0;
    let tight = inspect(&sample, &reference, &config).unwrap();
    assert!(tight.report.fraction_out_of_tolerance > loose.report.fraction_out_of_tolerance);
}

#[test]
fn summary_serializes_without_point_data() {
    let (config, reference) = setup();
    let outcome = inspect(reference.cloud(), &reference, &config).unwrap();
    let json = serde_json::to_value(outcome.summary()).unwrap();
    assert_eq!(json["verdict"]["verdict"], "approved");
    assert_eq!(json["class"]["class"], "ok");
    assert!(json.get("sample_deviations").is_none());
}
