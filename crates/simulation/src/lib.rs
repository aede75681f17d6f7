//! Synthetic parts for exercising the inspection pipeline.
//!
//! A [`Shape`] is sampled on a deterministic parametric grid, an optional
//! [`DefectSpec`] deforms or removes samples, and [`generate_with`] can add
//! seeded jitter and a rigid pose on top.

pub mod defect;
pub mod error;
mod sampling;
pub mod shape;

pub use defect::{CapEnd, DefectKind, DefectSpec};
pub use error::{GeometryError, GeometryResult};
pub use shape::Shape;

use partscan_core::{PointCloud, RigidTransform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Uniform per-coordinate noise in `[-amplitude, amplitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub amplitude: f64,
    pub seed: u64,
}

/// Extra perturbations applied after the defect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub jitter: Option<Jitter>,
    /// Rigid pose applied last, simulating a part placed off-center.
    pub pose: Option<RigidTransform>,
}

/// Sample `shape` at roughly `density` points, optionally injecting a defect.
///
/// Output is a pure function of the arguments.
pub fn generate(
    shape: &Shape,
    density: usize,
    defect: Option<&DefectSpec>,
) -> GeometryResult<PointCloud> {
    generate_with(shape, density, defect, &GenerateOptions::default())
}

/// Like [`generate`], then applies jitter and finally the pose from `options`.
pub fn generate_with(
    shape: &Shape,
    density: usize,
    defect: Option<&DefectSpec>,
    options: &GenerateOptions,
) -> GeometryResult<PointCloud> {
    shape.validate()?;
    if density == 0 {
        return Err(GeometryError::shape("density must be > 0"));
    }
    if let Some(spec) = defect {
        spec.validate()?;
    }
    if let Some(jitter) = options.jitter {
        if !jitter.amplitude.is_finite() || jitter.amplitude < 0.0 {
            return Err(GeometryError::InvalidJitter {
                amplitude: jitter.amplitude,
            });
        }
    }

    let mut samples = sampling::sample_baseline(shape, density);
    let baseline = samples.len();
    if let Some(spec) = defect {
        samples = defect::apply_defect(shape, samples, spec);
    }
    if samples.is_empty() {
        return Err(GeometryError::EmptyResult { shape: shape.name() });
    }

    debug!(
        shape = shape.name(),
        density,
        baseline,
        kept = samples.len(),
        defect = %defect.map_or(DefectKind::None, DefectSpec::kind),
        "generated synthetic part"
    );

    let mut cloud: PointCloud = samples.into_iter().map(|s| s.point).collect();

    if let Some(jitter) = options.jitter.filter(|j| j.amplitude > 0.0) {
        let mut rng = StdRng::seed_from_u64(jitter.seed);
        let a = jitter.amplitude;
        for i in 0..cloud.len() {
            cloud.x[i] += rng.gen_range(-a..=a);
            cloud.y[i] += rng.gen_range(-a..=a);
            cloud.z[i] += rng.gen_range(-a..=a);
        }
    }

    if let Some(pose) = options.pose {
        cloud = partscan_core::apply_transform(&cloud, &pose);
    }

    Ok(cloud)
}
