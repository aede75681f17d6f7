use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{GeometryError, GeometryResult};

/// Base solid of a synthetic part.
///
/// Cylinders stand on the z axis and are centered at the origin, spanning
/// `z` in `[-height / 2, height / 2]`. Spheres are centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Cylinder { radius: f64, height: f64 },
    Sphere { radius: f64 },
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Cylinder { .. } => "cylinder",
            Shape::Sphere { .. } => "sphere",
        }
    }

    pub fn radius(&self) -> f64 {
        match *self {
            Shape::Cylinder { radius, .. } | Shape::Sphere { radius } => radius,
        }
    }

    /// Axial extent: the cylinder height, or the sphere diameter.
    pub fn height(&self) -> f64 {
        match *self {
            Shape::Cylinder { height, .. } => height,
            Shape::Sphere { radius } => 2.0 * radius,
        }
    }

    pub fn surface_area(&self) -> f64 {
        match *self {
            Shape::Cylinder { radius, height } => {
                2.0 * PI * radius * height + 2.0 * PI * radius * radius
            }
            Shape::Sphere { radius } => 4.0 * PI * radius * radius,
        }
    }

    pub fn validate(&self) -> GeometryResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            Shape::Cylinder { radius, height } => {
                if !positive(radius) {
                    return Err(GeometryError::shape(format!(
                        "cylinder radius must be > 0, got {radius}"
                    )));
                }
                if !positive(height) {
                    return Err(GeometryError::shape(format!(
                        "cylinder height must be > 0, got {height}"
                    )));
                }
            }
            Shape::Sphere { radius } => {
                if !positive(radius) {
                    return Err(GeometryError::shape(format!(
                        "sphere radius must be > 0, got {radius}"
                    )));
                }
            }
        }
        Ok(())
    }
}
