// src/config.rs - Conversion settings loaded from TOML

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{ContourError, Result};
use crate::grid::Label;
use crate::smoother::{LargeSmoothingParams, SmoothingLevel};
use crate::volume::ReconciliationTolerance;

/// Configuration for mask/contour conversion
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Volume JSON to read
    #[serde(default = "default_input_path")]
    pub input_path: String,
    pub output_base_dir: String,

    #[serde(default)]
    pub background_label: Label,

    #[serde(default)]
    pub smoothing_level: SmoothingLevel,

    // Round-trip verification
    #[serde(default = "default_verify_round_trip")]
    pub verify_round_trip: bool,

    #[serde(default = "default_reconciliation_absolute_px")]
    pub reconciliation_absolute_px: usize,

    #[serde(default = "default_reconciliation_relative")]
    pub reconciliation_relative: f64,

    // Per-slice parallelism
    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Worker count; all cores when unset
    #[serde(default)]
    pub num_threads: Option<usize>,

    // Display-only large smoothing
    #[serde(default = "default_large_interpolation_points")]
    pub large_interpolation_points: usize,

    #[serde(default = "default_large_smoothing_strength")]
    pub large_smoothing_strength: f64,

    #[serde(default = "default_large_smoothing_iterations")]
    pub large_smoothing_iterations: usize,
}

fn default_input_path() -> String {
    "./input/volume.json".to_string()
}

fn default_verify_round_trip() -> bool {
    true
}

fn default_reconciliation_absolute_px() -> usize {
    10
}

fn default_reconciliation_relative() -> f64 {
    0.15
}

fn default_parallel() -> bool {
    true
}

fn default_large_interpolation_points() -> usize {
    2
}

fn default_large_smoothing_strength() -> f64 {
    0.5
}

fn default_large_smoothing_iterations() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: "./output".to_string(),
            background_label: 0,
            smoothing_level: SmoothingLevel::Small,
            verify_round_trip: default_verify_round_trip(),
            reconciliation_absolute_px: default_reconciliation_absolute_px(),
            reconciliation_relative: default_reconciliation_relative(),
            use_parallel: default_parallel(),
            num_threads: None,
            large_interpolation_points: default_large_interpolation_points(),
            large_smoothing_strength: default_large_smoothing_strength(),
            large_smoothing_iterations: default_large_smoothing_iterations(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ContourError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| ContourError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.reconciliation_relative.is_nan() || self.reconciliation_relative < 0.0 {
            return Err(ContourError::Config(
                "reconciliation_relative must be >= 0.0".to_string(),
            ));
        }

        if self.num_threads == Some(0) {
            return Err(ContourError::Config(
                "num_threads must be > 0 when set".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.large_smoothing_strength) {
            return Err(ContourError::Config(
                "large_smoothing_strength must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.smoothing_level == SmoothingLevel::Large && self.verify_round_trip {
            log::warn!("Round-trip verification is skipped for large smoothing");
        }

        Ok(())
    }

    pub fn large_smoothing(&self) -> LargeSmoothingParams {
        LargeSmoothingParams {
            interpolation_points: self.large_interpolation_points,
            strength: self.large_smoothing_strength,
            iterations: self.large_smoothing_iterations,
        }
    }

    pub fn tolerance(&self) -> ReconciliationTolerance {
        ReconciliationTolerance {
            absolute: self.reconciliation_absolute_px,
            relative: self.reconciliation_relative,
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ContourError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("output_base_dir = \"./out\"").unwrap();

        assert_eq!(config.smoothing_level, SmoothingLevel::Small);
        assert_eq!(config.reconciliation_absolute_px, 10);
        assert!((config.reconciliation_relative - 0.15).abs() < 1e-12);
        assert!(config.use_parallel);
        assert_eq!(config.num_threads, None);
        assert_eq!(config.large_smoothing(), LargeSmoothingParams::default());
    }

    #[test]
    fn smoothing_level_reads_lowercase() {
        let config: Config =
            toml::from_str("output_base_dir = \"o\"\nsmoothing_level = \"none\"\nbackground_label = 3").unwrap();
        assert_eq!(config.smoothing_level, SmoothingLevel::None);
        assert_eq!(config.background_label, 3);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.num_threads = Some(0);
        assert!(matches!(config.validate(), Err(ContourError::Config(_))));

        config.num_threads = Some(2);
        config.large_smoothing_strength = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_reload() {
        let dir = std::env::temp_dir().join(format!("contour_config_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.num_threads = Some(3);
        config.smoothing_level = SmoothingLevel::Large;
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = Config::from_file("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, ContourError::Config(_)));
    }
}
