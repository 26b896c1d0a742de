// src/config.rs

//! Run configuration: one TOML file with `[loader]`, `[fit]` and `[catalog]` tables.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! lab's standard setup. Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::data_analysis::model_fit::FitConfig;
use crate::data_input::signal_parser::AngleCorrection;
use crate::data_input::trial_catalog::TrialCatalog;
use crate::error::{PendulumError, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub angle_correction: AngleCorrection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub loader: LoaderConfig,
    pub fit: FitConfig,
    /// The lab catalog when the file has no `[catalog]` table; otherwise only what it lists.
    pub catalog: TrialCatalog,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            fit: FitConfig::default(),
            catalog: TrialCatalog::lab(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PendulumError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.fit.validate()?;
        if let Some(default_mass) = &self.catalog.default_mass {
            if !self.catalog.masses.contains_key(default_mass) {
                return Err(PendulumError::Config(format!(
                    "default_mass '{default_mass}' is not listed under [catalog.masses]"
                )));
            }
        }
        let bad_length = self
            .catalog
            .lengths
            .iter()
            .find(|(_, m)| !(m.value > 0.0));
        if let Some((label, m)) = bad_length {
            return Err(PendulumError::Config(format!(
                "length '{label}' must be positive, got {}",
                m.value
            )));
        }
        Ok(())
    }
}
