use partscan::config::InspectionConfig;
use partscan::pipeline::inspect;
use partscan_core::ReferenceModel;
use partscan_simulation::{generate, DefectKind, DefectSpec};

fn main() {
    let config = InspectionConfig::default();
    let shape = config.simulation.cylinder();
    let reference = ReferenceModel::new(
        generate(&shape, config.simulation.density, None).expect("valid shape"),
    );

    println!(
        "{:<12} {:>8} {:>10} {:>10}  verdict",
        "defect", "points", "out [%]", "max [mm]"
    );
    for kind in DefectKind::ALL {
        let spec = DefectSpec::preset(kind, &shape);
        let sample = generate(&shape, config.simulation.density, spec.as_ref()).expect("valid preset");
        let outcome = inspect(&sample, &reference, &config).expect("inspection runs");
        println!(
            "{:<12} {:>8} {:>10.2} {:>10.3}  {:?}",
            kind.as_str(),
            sample.len(),
            100.0 * outcome.report.fraction_out_of_tolerance,
            outcome.report.stats.max.max(outcome.report.coverage_stats.max),
            outcome.verdict()
        );
    }
}
