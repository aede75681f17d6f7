use partscan_core::RigidTransform;
use partscan_registration::{align, IcpParams};
use partscan_simulation::{generate, generate_with, GenerateOptions, Jitter, Shape};

fn main() {
    let shape = Shape::Cylinder {
        radius: 10.0,
        height: 20.0,
    };
    let reference = generate(&shape, 2500, None).expect("valid shape");
    println!("Reference: {} points", reference.len());

    // The same part placed slightly off the turntable axis, with sensor noise.
    let pose = RigidTransform::from_axis_angle([0.2, 0.0, 1.0], 1.5f64.to_radians(), [0.8, -0.4, 0.3]);
    let options = GenerateOptions {
        jitter: Some(Jitter {
            amplitude: 0.05,
            seed: 1,
        }),
        pose: Some(pose),
    };
    let sample = generate_with(&shape, 2500, None, &options).expect("valid shape");
    println!("Sample: {} points (rotated 1.5 deg, shifted ~0.9 mm)", sample.len());

    let result = align(&sample, &reference, &IcpParams::default()).expect("well-formed clouds");
    println!("ICP converged: {}", result.converged);
    println!("ICP iterations: {}", result.iterations);
    println!("Mean residual: {:.4} mm", result.final_error);
    println!(
        "Recovered rotation: {:.3} deg, translation: [{:.4}, {:.4}, {:.4}]",
        result.transform.rotation_angle().to_degrees(),
        result.transform.translation[0],
        result.transform.translation[1],
        result.transform.translation[2]
    );
    for warning in &result.warnings {
        println!("Warning: {warning:?}");
    }
}
