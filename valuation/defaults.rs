//! The feature-default table: one representative value for every pipeline
//! input, computed offline from the training data.
//!
//! The table is a versioned data asset (`assets/feature_defaults.toml`) rather
//! than code. `version` names the file layout; `revision` counts regenerations
//! of the values and is free to change. The copy compiled into the binary is
//! used unless configuration points at a regenerated file. Values are never validated against the
//! current dataset, so a retrained pipeline needs a regenerated table.

use crate::types::{FeatureValue, FeatureVector};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

const EMBEDDED_DEFAULTS: &str = include_str!("../assets/feature_defaults.toml");

/// The only asset layout this build understands.
pub const SUPPORTED_DEFAULTS_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum DefaultsError {
    #[error("Failed to read feature defaults file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse feature defaults TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error(
        "Feature defaults file has version {found}, but this build supports version {supported}."
    )]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsFile {
    version: u32,
    #[serde(default)]
    revision: u32,
    #[serde(default)]
    source: String,
    defaults: BTreeMap<String, FeatureValue>,
}

/// Immutable mapping from feature name to fallback value.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureDefaults {
    version: u32,
    revision: u32,
    source: String,
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureDefaults {
    /// The table compiled into the binary.
    pub fn embedded() -> Result<Self, DefaultsError> {
        Self::from_toml_str(EMBEDDED_DEFAULTS)
    }

    pub fn load(path: &Path) -> Result<Self, DefaultsError> {
        log::info!("Loading feature defaults from '{}'", path.display());
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DefaultsError> {
        let file: DefaultsFile = toml::from_str(text)?;
        if file.version != SUPPORTED_DEFAULTS_VERSION {
            return Err(DefaultsError::UnsupportedVersion {
                found: file.version,
                supported: SUPPORTED_DEFAULTS_VERSION,
            });
        }
        Ok(Self {
            version: file.version,
            revision: file.revision,
            source: file.source,
            values: file.defaults,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Which regeneration of the values this is. Zero when the file omits it.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Every default as a single record, in name order.
    pub fn to_vector(&self) -> FeatureVector {
        self.values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureDefaults {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self {
            version: SUPPORTED_DEFAULTS_VERSION,
            revision: 0,
            source: String::new(),
            values: iter.into_iter().collect(),
        }
    }
}
