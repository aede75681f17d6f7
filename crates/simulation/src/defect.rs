//! Defect taxonomy and injection into a baseline sample.

use partscan_core::Point3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use crate::error::{GeometryError, GeometryResult};
use crate::sampling::{azimuth, surface_normal, surface_point, Region, Sample};
use crate::Shape;

/// Sphere "caps" are the polar regions beyond this fraction of the radius.
const SPHERE_CAP_FRACTION: f64 = 0.8;

/// Which end of the part a cap defect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapEnd {
    Top,
    Bottom,
}

/// Field-less view of the defect taxonomy, for parsing and labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    None,
    SideHole,
    TopHole,
    Dent,
    Stretch,
    MissingCap,
    Broken,
}

impl DefectKind {
    pub const ALL: [DefectKind; 7] = [
        DefectKind::None,
        DefectKind::SideHole,
        DefectKind::TopHole,
        DefectKind::Dent,
        DefectKind::Stretch,
        DefectKind::MissingCap,
        DefectKind::Broken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefectKind::None => "none",
            DefectKind::SideHole => "side-hole",
            DefectKind::TopHole => "top-hole",
            DefectKind::Dent => "dent",
            DefectKind::Stretch => "stretch",
            DefectKind::MissingCap => "missing-cap",
            DefectKind::Broken => "broken",
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match key.as_str() {
            "none" => Ok(DefectKind::None),
            "sidehole" => Ok(DefectKind::SideHole),
            "tophole" => Ok(DefectKind::TopHole),
            "dent" => Ok(DefectKind::Dent),
            "stretch" => Ok(DefectKind::Stretch),
            "missingcap" => Ok(DefectKind::MissingCap),
            "broken" => Ok(DefectKind::Broken),
            _ => Err(format!("unknown defect kind '{s}'")),
        }
    }
}

/// Parametric description of one artificial flaw.
///
/// Angles are radians around the z axis, lengths are millimeters in the
/// shape's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefectSpec {
    /// Removes lateral samples within `radius` of the surface point at
    /// (`azimuth`, `z`).
    SideHole { azimuth: f64, z: f64, radius: f64 },
    /// Removes top-cap samples within `radius` (in xy) of the offset.
    TopHole {
        offset_x: f64,
        offset_y: f64,
        radius: f64,
    },
    /// Pushes samples within `radius` of the surface point inward along the
    /// surface normal, by `depth` at the center falling to zero at the edge.
    Dent {
        azimuth: f64,
        z: f64,
        radius: f64,
        depth: f64,
    },
    /// Pushes samples with `z_min <= z <= z_max` radially outward by `amount`.
    Stretch { z_min: f64, z_max: f64, amount: f64 },
    /// Removes one end cap entirely.
    MissingCap { end: CapEnd },
    /// Removes the angular sector `[start_angle, start_angle + sweep)`,
    /// caps included.
    Broken { start_angle: f64, sweep: f64 },
}

impl DefectSpec {
    pub fn kind(&self) -> DefectKind {
        match self {
            DefectSpec::SideHole { .. } => DefectKind::SideHole,
            DefectSpec::TopHole { .. } => DefectKind::TopHole,
            DefectSpec::Dent { .. } => DefectKind::Dent,
            DefectSpec::Stretch { .. } => DefectKind::Stretch,
            DefectSpec::MissingCap { .. } => DefectKind::MissingCap,
            DefectSpec::Broken { .. } => DefectKind::Broken,
        }
    }

    /// A representative defect of `kind`, sized relative to `shape`.
    ///
    /// Returns `None` for [`DefectKind::None`].
    pub fn preset(kind: DefectKind, shape: &Shape) -> Option<DefectSpec> {
        let r = shape.radius();
        let h = shape.height();
        let spec = match kind {
            DefectKind::None => return None,
            DefectKind::SideHole => DefectSpec::SideHole {
                azimuth: 0.0,
                z: 0.0,
                radius: 0.6 * r,
            },
            DefectKind::TopHole => DefectSpec::TopHole {
                offset_x: 0.0,
                offset_y: 0.0,
                radius: 0.6 * r,
            },
            DefectKind::Dent => DefectSpec::Dent {
                azimuth: PI,
                z: 0.0,
                radius: 0.5 * r,
                depth: 0.4 * r,
            },
            DefectKind::Stretch => DefectSpec::Stretch {
                z_min: -h / 6.0,
                z_max: h / 6.0,
                amount: 0.4 * r,
            },
            DefectKind::MissingCap => DefectSpec::MissingCap { end: CapEnd::Top },
            DefectKind::Broken => DefectSpec::Broken {
                start_angle: 0.6 * PI,
                sweep: 0.8 * PI,
            },
        };
        Some(spec)
    }

    pub fn validate(&self) -> GeometryResult<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(GeometryError::defect(format!("{name} must be > 0, got {v}")))
            }
        };
        let finite = |name: &str, v: f64| {
            if v.is_finite() {
                Ok(())
            } else {
                Err(GeometryError::defect(format!("{name} must be finite")))
            }
        };

        match *self {
            DefectSpec::SideHole { azimuth, z, radius } => {
                finite("azimuth", azimuth)?;
                finite("z", z)?;
                positive("radius", radius)
            }
            DefectSpec::TopHole {
                offset_x,
                offset_y,
                radius,
            } => {
                finite("offset_x", offset_x)?;
                finite("offset_y", offset_y)?;
                positive("radius", radius)
            }
            DefectSpec::Dent {
                azimuth,
                z,
                radius,
                depth,
            } => {
                finite("azimuth", azimuth)?;
                finite("z", z)?;
                positive("radius", radius)?;
                positive("depth", depth)
            }
            DefectSpec::Stretch {
                z_min,
                z_max,
                amount,
            } => {
                finite("z_min", z_min)?;
                finite("z_max", z_max)?;
                if z_max <= z_min {
                    return Err(GeometryError::defect(format!(
                        "stretch band is empty: z_min {z_min} >= z_max {z_max}"
                    )));
                }
                positive("amount", amount)
            }
            DefectSpec::MissingCap { .. } => Ok(()),
            DefectSpec::Broken { start_angle, sweep } => {
                finite("start_angle", start_angle)?;
                positive("sweep", sweep)?;
                if sweep > TAU {
                    return Err(GeometryError::defect(format!(
                        "sweep must be <= 2π, got {sweep}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Apply `spec` to a baseline sample set, returning the deformed set.
pub(crate) fn apply_defect(shape: &Shape, samples: Vec<Sample>, spec: &DefectSpec) -> Vec<Sample> {
    match *spec {
        DefectSpec::SideHole { azimuth, z, radius } => {
            let center = surface_point(shape, azimuth, z);
            samples
                .into_iter()
                .filter(|s| {
                    let on_wall = matches!(s.region, Region::Lateral | Region::Shell);
                    !(on_wall && s.point.distance(&center) < radius)
                })
                .collect()
        }
        DefectSpec::TopHole {
            offset_x,
            offset_y,
            radius,
        } => samples
            .into_iter()
            .filter(|s| {
                let on_top = match s.region {
                    Region::TopCap => true,
                    Region::Shell => s.point.z > 0.0,
                    Region::Lateral | Region::BottomCap => false,
                };
                let d = (s.point.x - offset_x).hypot(s.point.y - offset_y);
                !(on_top && d < radius)
            })
            .collect(),
        DefectSpec::Dent {
            azimuth,
            z,
            radius,
            depth,
        } => {
            let center = surface_point(shape, azimuth, z);
            samples
                .into_iter()
                .map(|s| {
                    let d = s.point.distance(&center);
                    if d >= radius {
                        return s;
                    }
                    let falloff = 1.0 - (d / radius).powi(2);
                    let n = surface_normal(&s);
                    let shift = depth * falloff;
                    Sample {
                        point: Point3::new(
                            s.point.x - n[0] * shift,
                            s.point.y - n[1] * shift,
                            s.point.z - n[2] * shift,
                        ),
                        region: s.region,
                    }
                })
                .collect()
        }
        DefectSpec::Stretch {
            z_min,
            z_max,
            amount,
        } => samples
            .into_iter()
            .map(|s| {
                let p = s.point;
                if p.z < z_min || p.z > z_max {
                    return s;
                }
                let dir = match s.region {
                    Region::Shell => {
                        let len = p.to_vector().norm();
                        if len > 0.0 {
                            [p.x / len, p.y / len, p.z / len]
                        } else {
                            [0.0; 3]
                        }
                    }
                    _ => {
                        let rho = p.x.hypot(p.y);
                        if rho > 0.0 {
                            [p.x / rho, p.y / rho, 0.0]
                        } else {
                            [0.0; 3]
                        }
                    }
                };
                Sample {
                    point: Point3::new(
                        p.x + dir[0] * amount,
                        p.y + dir[1] * amount,
                        p.z + dir[2] * amount,
                    ),
                    region: s.region,
                }
            })
            .collect(),
        DefectSpec::MissingCap { end } => {
            let polar = SPHERE_CAP_FRACTION * shape.radius();
            samples
                .into_iter()
                .filter(|s| {
                    let removed = match (s.region, end) {
                        (Region::TopCap, CapEnd::Top) | (Region::BottomCap, CapEnd::Bottom) => true,
                        (Region::Shell, CapEnd::Top) => s.point.z > polar,
                        (Region::Shell, CapEnd::Bottom) => s.point.z < -polar,
                        _ => false,
                    };
                    !removed
                })
                .collect()
        }
        DefectSpec::Broken { start_angle, sweep } => {
            let start = start_angle.rem_euclid(TAU);
            samples
                .into_iter()
                .filter(|s| {
                    let rel = (azimuth(&s.point) - start).rem_euclid(TAU);
                    rel >= sweep
                })
                .collect()
        }
    }
}
