// src/error.rs

//! Error type shared by the loader, catalog, solver and regression.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the analysis pipeline.
#[derive(Error, Debug)]
pub enum PendulumError {
    /// Malformed or unreadable recording.
    #[error("Data format error in '{source_name}': {reason}")]
    DataFormat { source_name: String, reason: String },

    /// File could not be opened or read.
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A length or mass label missing from the trial catalog.
    #[error("Unknown {kind} label '{label}' (not present in the trial catalog)")]
    UnknownLabel { kind: &'static str, label: String },

    /// File name does not follow the `exp{set}_[{mass}_]{length}_{amplitude}` convention.
    #[error("Cannot derive trial identity from '{name}': {reason}")]
    InvalidTrialName { name: String, reason: String },

    /// The nonlinear solver gave up. Recovered by the model fitter.
    #[error("Fit did not converge after {evaluations} evaluations: {reason}")]
    FitNonConvergence { evaluations: usize, reason: String },

    /// Not enough distinct lengths (or a non-physical slope) for the g regression.
    #[error("Cannot estimate gravity: {reason}")]
    RegressionDegenerate { reason: String },

    /// Empty input where at least one value is needed.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid configuration file or value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PendulumError {
    pub fn data_format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        PendulumError::DataFormat {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PendulumError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that only affect the trial they were raised for.
    pub fn is_per_trial(&self) -> bool {
        matches!(
            self,
            PendulumError::DataFormat { .. }
                | PendulumError::Io { .. }
                | PendulumError::UnknownLabel { .. }
                | PendulumError::InvalidTrialName { .. }
        )
    }
}

impl From<toml::de::Error> for PendulumError {
    fn from(err: toml::de::Error) -> Self {
        PendulumError::Config(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PendulumError>;
