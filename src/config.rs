use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Seed for the train/test shuffle and tree tie-breaking.
pub const DEFAULT_SEED: u64 = 42;

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "RUSTY_TABULA_CONFIG";

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub chart: ChartConfig,
    pub training: TrainingConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Histogram bin count when a request does not override it.
    pub histogram_bins: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { histogram_bins: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,
    pub tree: TreeConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: DEFAULT_SEED,
            tree: TreeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AnalysisConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))
            .map_err(|e| AnalysisError::validation(format!("{e:#}")))?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::validation(format!("parsing config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file named by `RUSTY_TABULA_CONFIG`, or fall back to defaults.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::from_json_file(Path::new(&path)) {
            Ok(config) => {
                log::info!("Using configuration from {}", Path::new(&path).display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {CONFIG_ENV}: {e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chart.histogram_bins == 0 {
            return Err(AnalysisError::validation("histogram_bins must be at least 1"));
        }
        let f = self.training.test_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(AnalysisError::validation(format!(
                "test_fraction must lie strictly between 0 and 1, got {f}"
            )));
        }
        if self.training.tree.min_samples_split < 2 || self.training.tree.min_samples_leaf < 1 {
            return Err(AnalysisError::validation(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1",
            ));
        }
        if self.render.width < 64 || self.render.height < 64 {
            return Err(AnalysisError::validation("render size must be at least 64x64"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"chart": {"histogram_bins": 25}}"#).unwrap();

        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.chart.histogram_bins, 25);
        assert_eq!(config.training, TrainingConfig::default());
        assert_eq!(config.training.seed, DEFAULT_SEED);
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"training": {"test_fraction": 1.5}}"#).unwrap();
        assert!(matches!(
            AnalysisConfig::from_json_file(&path),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn defaults_are_valid() {
        AnalysisConfig::default().validate().unwrap();
    }
}
