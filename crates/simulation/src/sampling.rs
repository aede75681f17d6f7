//! Deterministic baseline sampling of cylinder and sphere shells.

use partscan_core::Point3;
use std::f64::consts::{PI, TAU};

use crate::Shape;

/// Surface patch a sample was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Region {
    Lateral,
    TopCap,
    BottomCap,
    Shell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sample {
    pub point: Point3,
    pub region: Region,
}

/// Uniform parametric sampling of `shape` at roughly `density` points.
///
/// Cylinders use a regular (θ, z) grid on the lateral wall plus concentric
/// rings on each cap, all at a common spacing derived from the total surface
/// area, so the count is close to but not exactly `density`. Spheres use a
/// Fibonacci lattice with exactly `density` points.
pub(crate) fn sample_baseline(shape: &Shape, density: usize) -> Vec<Sample> {
    match *shape {
        Shape::Cylinder { radius, height } => sample_cylinder(radius, height, density, shape),
        Shape::Sphere { radius } => sample_sphere(radius, density),
    }
}

fn sample_cylinder(radius: f64, height: f64, density: usize, shape: &Shape) -> Vec<Sample> {
    let spacing = (shape.surface_area() / density as f64).sqrt();
    let half = height / 2.0;

    let n_theta = ((TAU * radius / spacing).round() as usize).max(3);
    let n_z = ((height / spacing).round() as usize + 1).max(2);

    let mut out = Vec::with_capacity(density + n_theta);

    for k in 0..n_z {
        let z = -half + height * k as f64 / (n_z - 1) as f64;
        for j in 0..n_theta {
            let theta = TAU * j as f64 / n_theta as f64;
            out.push(Sample {
                point: Point3::new(radius * theta.cos(), radius * theta.sin(), z),
                region: Region::Lateral,
            });
        }
    }

    // The rim circle belongs to the lateral grid, so cap rings stop short of it.
    let n_rings = ((radius / spacing).round() as usize).max(1);
    for (z, region) in [(half, Region::TopCap), (-half, Region::BottomCap)] {
        out.push(Sample {
            point: Point3::new(0.0, 0.0, z),
            region,
        });
        for i in 1..n_rings {
            let rho = radius * i as f64 / n_rings as f64;
            let m = ((TAU * rho / spacing).round() as usize).max(3);
            for j in 0..m {
                let theta = TAU * j as f64 / m as f64;
                out.push(Sample {
                    point: Point3::new(rho * theta.cos(), rho * theta.sin(), z),
                    region,
                });
            }
        }
    }

    out
}

fn sample_sphere(radius: f64, density: usize) -> Vec<Sample> {
    let golden_angle = PI * (3.0 - 5f64.sqrt());
    let n = density as f64;

    (0..density)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n;
            let rho = (1.0 - z * z).max(0.0).sqrt();
            let phi = golden_angle * i as f64;
            Sample {
                point: Point3::new(
                    radius * rho * phi.cos(),
                    radius * rho * phi.sin(),
                    radius * z,
                ),
                region: Region::Shell,
            }
        })
        .collect()
}

/// Outward unit normal of the undeformed surface at a sample.
pub(crate) fn surface_normal(sample: &Sample) -> [f64; 3] {
    let p = sample.point;
    match sample.region {
        Region::TopCap => [0.0, 0.0, 1.0],
        Region::BottomCap => [0.0, 0.0, -1.0],
        Region::Lateral => {
            let rho = p.x.hypot(p.y);
            if rho > 0.0 {
                [p.x / rho, p.y / rho, 0.0]
            } else {
                [0.0, 0.0, 0.0]
            }
        }
        Region::Shell => {
            let len = p.to_vector().norm();
            if len > 0.0 {
                [p.x / len, p.y / len, p.z / len]
            } else {
                [0.0, 0.0, 0.0]
            }
        }
    }
}

/// Point on the undeformed surface at azimuth `azimuth` and height `z`.
///
/// `z` is clamped to the shape's axial extent.
pub(crate) fn surface_point(shape: &Shape, azimuth: f64, z: f64) -> Point3 {
    match *shape {
        Shape::Cylinder { radius, height } => {
            let z = z.clamp(-height / 2.0, height / 2.0);
            Point3::new(radius * azimuth.cos(), radius * azimuth.sin(), z)
        }
        Shape::Sphere { radius } => {
            let z = z.clamp(-radius, radius);
            let rho = (radius * radius - z * z).max(0.0).sqrt();
            Point3::new(rho * azimuth.cos(), rho * azimuth.sin(), z)
        }
    }
}

/// Azimuth of `p` around the z axis in `[0, 2π)`.
pub(crate) fn azimuth(p: &Point3) -> f64 {
    p.y.atan2(p.x).rem_euclid(TAU)
}
