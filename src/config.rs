//! TOML configuration for the inspection pipeline.
//!
//! Every section and field has a default, so a config file only needs the
//! values it changes.

use partscan_inspection::ClassificationPolicy;
use partscan_io::DeviceGeometry;
use partscan_registration::IcpParams;
use partscan_simulation::Shape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    pub inspection: InspectionSection,
    pub icp: IcpParams,
    pub simulation: SimulationConfig,
    pub device: DeviceGeometry,
    pub classification: ClassificationPolicy,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionSection {
    /// Largest accepted nearest-neighbour deviation (mm).
    pub tolerance_mm: f64,
    /// Vertices drawn from an STL file used as a reference.
    pub stl_sample_points: usize,
    pub stl_sample_seed: u64,
}

impl Default for InspectionSection {
    fn default() -> Self {
        Self {
            tolerance_mm: 3.0,
            stl_sample_points: 8000,
            stl_sample_seed: 0,
        }
    }
}

/// Defaults for synthetic parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub density: usize,
    pub radius_mm: f64,
    /// Cylinder height; ignored for spheres.
    pub height_mm: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            density: 2500,
            radius_mm: 10.0,
            height_mm: 20.0,
        }
    }
}

impl SimulationConfig {
    pub fn cylinder(&self) -> Shape {
        Shape::Cylinder {
            radius: self.radius_mm,
            height: self.height_mm,
        }
    }

    pub fn sphere(&self) -> Shape {
        Shape::Sphere {
            radius: self.radius_mm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error. `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
    /// Also write plain-text events to a file in this directory, rotated
    /// daily.
    pub log_directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_directory: None,
        }
    }
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl InspectionConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Collects every out-of-range value rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.inspection.tolerance_mm) {
            errors.push(format!(
                "inspection.tolerance_mm must be > 0, got {}",
                self.inspection.tolerance_mm
            ));
        }
        if self.inspection.stl_sample_points == 0 {
            errors.push("inspection.stl_sample_points must be > 0".to_string());
        }
        if self.icp.max_iterations == 0 {
            errors.push("icp.max_iterations must be > 0".to_string());
        }
        if !self.icp.convergence_threshold.is_finite() || self.icp.convergence_threshold < 0.0 {
            errors.push(format!(
                "icp.convergence_threshold must be >= 0, got {}",
                self.icp.convergence_threshold
            ));
        }
        if self.simulation.density == 0 {
            errors.push("simulation.density must be > 0".to_string());
        }
        if !positive(self.simulation.radius_mm) {
            errors.push(format!(
                "simulation.radius_mm must be > 0, got {}",
                self.simulation.radius_mm
            ));
        }
        if !positive(self.simulation.height_mm) {
            errors.push(format!(
                "simulation.height_mm must be > 0, got {}",
                self.simulation.height_mm
            ));
        }
        if !positive(self.device.sensor_to_table_mm) {
            errors.push(format!(
                "device.sensor_to_table_mm must be > 0, got {}",
                self.device.sensor_to_table_mm
            ));
        }
        if let Err(e) = self.classification.validate() {
            errors.push(format!("classification: {e}"));
        }
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            errors.push(format!("logging.level '{}' is not a log level", self.logging.level));
        }
        if self
            .logging
            .log_directory
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            errors.push("logging.log_directory must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scanner_setup() {
        let config = InspectionConfig::default();
        assert_eq!(config.inspection.tolerance_mm, 3.0);
        assert_eq!(config.icp.max_iterations, 50);
        assert_eq!(config.simulation.density, 2500);
        assert_eq!(config.device.sensor_to_table_mm, 103.44);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = InspectionConfig::from_toml_str(
            "[inspection]\ntolerance_mm = 1.5\n\n[classification]\nok_fraction = 0.02\n",
        )
        .unwrap();
        assert_eq!(config.inspection.tolerance_mm, 1.5);
        assert_eq!(config.inspection.stl_sample_points, 8000);
        assert_eq!(config.classification.ok_fraction, 0.02);
        assert_eq!(
            config.classification.max_scale_ratio,
            ClassificationPolicy::default().max_scale_ratio
        );
        assert_eq!(config.icp, IcpParams::default());
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = InspectionConfig::default();
        config.logging.json = true;
        config.icp.max_iterations = 80;
        config.logging.log_directory = Some(PathBuf::from("logs"));
        let text = config.to_toml_string().unwrap();
        assert_eq!(InspectionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn every_bad_value_is_reported() {
        let err = InspectionConfig::from_toml_str(
            "[inspection]\ntolerance_mm = -1.0\n[icp]\nmax_iterations = 0\n[logging]\nlevel = \"loud\"\n",
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid(errors) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn log_directory_is_optional() {
        let config = InspectionConfig::default();
        assert_eq!(config.logging.log_directory, None);
        assert!(!config.to_toml_string().unwrap().contains("log_directory"));

        let config =
            InspectionConfig::from_toml_str("[logging]\nlog_directory = \"/var/log/partscan\"\n").unwrap();
        assert_eq!(
            config.logging.log_directory.as_deref(),
            Some(Path::new("/var/log/partscan"))
        );
        assert!(matches!(
            InspectionConfig::from_toml_str("[logging]\nlog_directory = \"\"\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn syntax_error_is_parse_error() {
        assert!(matches!(
            InspectionConfig::from_toml_str("[inspection\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partscan.toml");
        std::fs::write(&path, "[device]\nsensor_to_table_mm = 90.0\n").unwrap();
        let config = InspectionConfig::load(&path).unwrap();
        assert_eq!(config.device.sensor_to_table_mm, 90.0);

        assert!(matches!(
            InspectionConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
