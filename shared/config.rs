//! Dashboard configuration: where the artifacts live and a few display knobs.
//!
//! Everything has a default matching the training project's output layout, so
//! the file is optional. When present it is TOML and unknown keys are rejected.

use crate::defaults::{DefaultsError, FeatureDefaults};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "ameshouse.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ArtifactPaths {
    pub cleaned_dataset: PathBuf,
    pub pipeline: PathBuf,
    pub inherited_houses: PathBuf,
    /// Replaces the embedded default table when set.
    pub feature_defaults: Option<PathBuf>,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            cleaned_dataset: PathBuf::from("outputs/datasets/cleaned/house_prices_cleaned.csv"),
            pipeline: PathBuf::from(
                "outputs/ml_pipeline/predict_SalePrice/v1/best_regressor_pipeline.toml",
            ),
            inherited_houses: PathBuf::from("outputs/datasets/collection/inherited_houses.csv"),
            feature_defaults: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DashboardConfig {
    pub app_name: String,
    pub target: String,
    pub paths: ArtifactPaths,
    /// Variables plotted against the target on the correlation page.
    pub study_variables: Vec<String>,
    pub histogram_bins: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            app_name: "House Price Predictor - Ames, Iowa".to_string(),
            target: "SalePrice".to_string(),
            paths: ArtifactPaths::default(),
            study_variables: [
                "OverallQual",
                "GrLivArea",
                "GarageCars",
                "TotalBsmtSF",
                "YearBuilt",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            histogram_bins: 40,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// An explicit path must exist. Without one, `ameshouse.toml` in the
    /// working directory is used if present, and the built-in defaults
    /// otherwise.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(fallback)
        } else {
            log::debug!("No configuration file found; using built-in defaults");
            Ok(Self::default())
        }
    }

    /// The configured default table, or the embedded one.
    pub fn feature_defaults(&self) -> Result<FeatureDefaults, DefaultsError> {
        match &self.paths.feature_defaults {
            Some(path) => FeatureDefaults::load(path),
            None => FeatureDefaults::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_project_layout() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.histogram_bins, 40);
        assert_eq!(config.study_variables.len(), 5);
    }

    #[test]
    fn partial_paths_keep_remaining_defaults() {
        let config = DashboardConfig::from_toml_str(
            "histogram_bins = 20\n[paths]\npipeline = \"models/p.toml\"\n",
        )
        .unwrap();
        assert_eq!(config.paths.pipeline, PathBuf::from("models/p.toml"));
        assert_eq!(
            config.paths.inherited_houses,
            ArtifactPaths::default().inherited_houses
        );
        assert_eq!(config.histogram_bins, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DashboardConfig::from_toml_str("colour = \"blue\"").is_err());
        assert!(DashboardConfig::from_toml_str("[paths]\nmodel = \"x\"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DashboardConfig::discover(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }

    #[test]
    fn configured_defaults_file_replaces_the_embedded_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "version = 1\n[defaults]\nGrLivArea = 999.0").unwrap();
        let mut config = DashboardConfig::default();
        config.paths.feature_defaults = Some(file.path().to_path_buf());
        let defaults = config.feature_defaults().unwrap();
        assert_eq!(defaults.len(), 1);
    }
}
