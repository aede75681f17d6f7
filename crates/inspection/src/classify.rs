use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InspectionError, InspectionResult};
use crate::signature::DeviationSignature;

/// Thresholds mapping a [`DeviationSignature`] to a [`DefectClass`].
///
/// Every field has a default, so a partial `[classification]` table in a
/// config file only overrides what it names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPolicy {
    /// Combined out-of-tolerance fraction below which a part passes.
    pub ok_fraction: f64,
    /// Bounding-box diagonal ratio above which the clouds are considered
    /// to be of different scale.
    pub max_scale_ratio: f64,
    /// Flood-fill radius for counting flagged regions, in multiples of the
    /// reference's mean point spacing.
    pub cluster_radius_factor: f64,
    /// Missing points must outnumber excess points by this factor for the
    /// defect to be read as a removal rather than a deformation.
    pub missing_dominance_ratio: f64,
    /// Width of the top and bottom end bands as a fraction of part height.
    pub end_band: f64,
    /// Share of flagged points inside one end band for an end defect.
    pub end_share_min: f64,
    /// Largest z-extent (fraction of height) of an end defect.
    pub cap_max_z_extent: f64,
    /// Angular coverage separating a missing cap from a hole in the cap.
    pub cap_min_angular_coverage: f64,
    /// Smallest z-extent of a broken-off sector.
    pub broken_min_z_extent: f64,
    /// Smallest angular coverage of a broken-off sector.
    pub broken_min_angular_coverage: f64,
    /// Points closer to the axis than this fraction of the reference radius
    /// are ignored for angular coverage.
    pub axis_exclusion: f64,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            ok_fraction: 0.001,
            max_scale_ratio: 3.0,
            cluster_radius_factor: 2.5,
            missing_dominance_ratio: 2.0,
            end_band: 0.1,
            end_share_min: 0.8,
            cap_max_z_extent: 0.25,
            cap_min_angular_coverage: 0.75,
            broken_min_z_extent: 0.7,
            broken_min_angular_coverage: 0.2,
            axis_exclusion: 0.5,
        }
    }
}

impl ClassificationPolicy {
    /// Checks that every threshold is in range; reports the first offending
    /// field.
    pub fn validate(&self) -> InspectionResult<()> {
        let invalid = |field, value, expected| InspectionError::InvalidPolicy {
            field,
            value,
            expected,
        };
        let unit = [
            ("ok_fraction", self.ok_fraction),
            ("end_band", self.end_band),
            ("end_share_min", self.end_share_min),
            ("cap_max_z_extent", self.cap_max_z_extent),
            ("cap_min_angular_coverage", self.cap_min_angular_coverage),
            ("broken_min_z_extent", self.broken_min_z_extent),
            ("broken_min_angular_coverage", self.broken_min_angular_coverage),
            ("axis_exclusion", self.axis_exclusion),
        ];
        for (name, v) in unit {
            if !(0.0..=1.0).contains(&v) {
                return Err(invalid(name, v, "within [0, 1]"));
            }
        }
        if !(self.max_scale_ratio.is_finite() && self.max_scale_ratio >= 1.0) {
            return Err(invalid("max_scale_ratio", self.max_scale_ratio, ">= 1"));
        }
        if !(self.cluster_radius_factor.is_finite() && self.cluster_radius_factor > 0.0) {
            return Err(invalid("cluster_radius_factor", self.cluster_radius_factor, "> 0"));
        }
        if !(self.missing_dominance_ratio.is_finite() && self.missing_dominance_ratio >= 0.0) {
            return Err(invalid(
                "missing_dominance_ratio",
                self.missing_dominance_ratio,
                ">= 0",
            ));
        }
        Ok(())
    }
}

/// End of the part along z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartEnd {
    Top,
    Bottom,
}

/// Defect taxonomy assigned to an inspected part.
///
/// `affected_fraction` is the combined out-of-tolerance fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum DefectClass {
    Ok,
    SideHole {
        affected_fraction: f64,
        regions: usize,
    },
    TopHole {
        affected_fraction: f64,
    },
    Dent {
        affected_fraction: f64,
        /// Deepest inward deviation (mm).
        max_depth: f64,
    },
    Stretch {
        affected_fraction: f64,
        /// Largest outward deviation (mm).
        max_bulge: f64,
    },
    MissingCap {
        affected_fraction: f64,
        end: PartEnd,
    },
    Broken {
        affected_fraction: f64,
        angular_coverage: f64,
    },
}

impl DefectClass {
    pub fn is_ok(&self) -> bool {
        matches!(self, DefectClass::Ok)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DefectClass::Ok => "ok",
            DefectClass::SideHole { .. } => "side-hole",
            DefectClass::TopHole { .. } => "top-hole",
            DefectClass::Dent { .. } => "dent",
            DefectClass::Stretch { .. } => "stretch",
            DefectClass::MissingCap { .. } => "missing-cap",
            DefectClass::Broken { .. } => "broken",
        }
    }
}

impl fmt::Display for DefectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a deviation signature to a defect class.
///
/// Removal defects leave reference points uncovered while the remaining
/// sample still lies on the reference; deformations move sample points off
/// it. Within each family the location and extent of the flagged region
/// pick the label.
pub fn classify(signature: &DeviationSignature, policy: &ClassificationPolicy) -> DefectClass {
    let affected_fraction = signature.fraction_out_of_tolerance;
    if signature.flagged_count() == 0 || affected_fraction < policy.ok_fraction {
        return DefectClass::Ok;
    }

    let missing = &signature.missing;
    let excess = &signature.excess;

    if missing.count as f64 > policy.missing_dominance_ratio * excess.count as f64 {
        let end = if missing.top_share >= policy.end_share_min {
            Some(PartEnd::Top)
        } else if missing.bottom_share >= policy.end_share_min {
            Some(PartEnd::Bottom)
        } else {
            None
        };

        if let Some(end) = end {
            if missing.z_extent_ratio <= policy.cap_max_z_extent {
                if missing.angular_coverage >= policy.cap_min_angular_coverage {
                    return DefectClass::MissingCap {
                        affected_fraction,
                        end,
                    };
                }
                if end == PartEnd::Top {
                    return DefectClass::TopHole { affected_fraction };
                }
            }
        }

        if missing.z_extent_ratio >= policy.broken_min_z_extent
            && missing.angular_coverage >= policy.broken_min_angular_coverage
        {
            return DefectClass::Broken {
                affected_fraction,
                angular_coverage: missing.angular_coverage,
            };
        }

        return DefectClass::SideHole {
            affected_fraction,
            regions: missing.clusters,
        };
    }

    if signature.mean_signed_excess < 0.0 {
        DefectClass::Dent {
            affected_fraction,
            max_depth: signature.max_inward,
        }
    } else {
        DefectClass::Stretch {
            affected_fraction,
            max_bulge: signature.max_outward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::RegionShape;

    fn region(count: usize) -> RegionShape {
        RegionShape {
            count,
            clusters: usize::from(count > 0),
            ..RegionShape::default()
        }
    }

    fn missing_only(shape: RegionShape) -> DeviationSignature {
        DeviationSignature {
            fraction_out_of_tolerance: 0.05,
            missing: shape,
            ..DeviationSignature::default()
        }
    }

    #[test]
    fn nothing_flagged_is_ok() {
        let policy = ClassificationPolicy {
            ok_fraction: 0.0,
            ..ClassificationPolicy::default()
        };
        assert_eq!(classify(&DeviationSignature::default(), &policy), DefectClass::Ok);
    }

    #[test]
    fn below_ok_fraction_is_ok() {
        let sig = DeviationSignature {
            fraction_out_of_tolerance: 0.0005,
            missing: region(2),
            ..DeviationSignature::default()
        };
        assert!(classify(&sig, &ClassificationPolicy::default()).is_ok());
    }

    #[test]
    fn full_ring_at_top_is_missing_cap() {
        let sig = missing_only(RegionShape {
            angular_coverage: 1.0,
            top_share: 1.0,
            ..region(200)
        });
        assert_eq!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::MissingCap {
                affected_fraction: 0.05,
                end: PartEnd::Top
            }
        );
    }

    #[test]
    fn bottom_ring_is_bottom_cap() {
        let sig = missing_only(RegionShape {
            angular_coverage: 0.9,
            bottom_share: 0.95,
            ..region(200)
        });
        assert!(matches!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::MissingCap {
                end: PartEnd::Bottom,
                ..
            }
        ));
    }

    #[test]
    fn localized_top_region_is_top_hole() {
        let sig = missing_only(RegionShape {
            angular_coverage: 0.0,
            top_share: 1.0,
            ..region(30)
        });
        assert!(matches!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::TopHole { .. }
        ));
    }

    #[test]
    fn tall_wide_sector_is_broken() {
        let sig = missing_only(RegionShape {
            angular_coverage: 0.3,
            z_extent_ratio: 1.0,
            top_share: 0.2,
            bottom_share: 0.2,
            ..region(600)
        });
        assert!(matches!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::Broken { .. }
        ));
    }

    #[test]
    fn small_wall_region_is_side_hole() {
        let sig = missing_only(RegionShape {
            angular_coverage: 0.08,
            z_extent_ratio: 0.3,
            ..region(40)
        });
        assert_eq!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::SideHole {
                affected_fraction: 0.05,
                regions: 1
            }
        );
    }

    #[test]
    fn inward_excess_is_dent_and_outward_is_stretch() {
        let mut sig = DeviationSignature {
            fraction_out_of_tolerance: 0.01,
            excess: region(30),
            missing: region(20),
            mean_signed_excess: -3.5,
            max_inward: 4.0,
            max_outward: 0.0,
        };
        assert_eq!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::Dent {
                affected_fraction: 0.01,
                max_depth: 4.0
            }
        );

        sig.mean_signed_excess = 3.5;
        sig.max_outward = 4.0;
        assert!(matches!(
            classify(&sig, &ClassificationPolicy::default()),
            DefectClass::Stretch { max_bulge, .. } if max_bulge == 4.0
        ));
    }

    #[test]
    fn dominance_ratio_is_configurable() {
        let sig = DeviationSignature {
            fraction_out_of_tolerance: 0.02,
            excess: region(30),
            missing: region(50),
            mean_signed_excess: -1.0,
            ..DeviationSignature::default()
        };
        let strict = ClassificationPolicy::default();
        assert!(matches!(classify(&sig, &strict), DefectClass::Dent { .. }));

        let loose = ClassificationPolicy {
            missing_dominance_ratio: 1.0,
            ..ClassificationPolicy::default()
        };
        assert!(matches!(classify(&sig, &loose), DefectClass::SideHole { .. }));
    }

    #[test]
    fn default_policy_is_valid_and_bad_values_are_named() {
        assert!(ClassificationPolicy::default().validate().is_ok());
        let bad = ClassificationPolicy {
            end_share_min: 1.5,
            ..ClassificationPolicy::default()
        };
        assert_eq!(
            bad.validate(),
            Err(InspectionError::InvalidPolicy {
                field: "end_share_min",
                value: 1.5,
                expected: "within [0, 1]",
            })
        );
        let bad = ClassificationPolicy {
            max_scale_ratio: 0.5,
            ..ClassificationPolicy::default()
        };
        let err = bad.validate().unwrap_err();
        assert!(matches!(
            err,
            InspectionError::InvalidPolicy {
                field: "max_scale_ratio",
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "classification policy max_scale_ratio must be >= 1, got 0.5"
        );
    }
}
