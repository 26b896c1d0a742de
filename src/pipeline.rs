// src/pipeline.rs

//! Batch analysis over many trial files.
//!
//! Each file is resolved against the catalog, loaded, and analyzed on its own.
//! A broken file ends up in `failures` and never stops the batch. Aggregation
//! tables skip trials whose period is undefined.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::data_analysis::fit_quality::{max_relative_deviation, mean_relative_error};
use crate::data_analysis::model_fit::{fit_series, FitConfig, FitResult};
use crate::data_analysis::parameter_estimation::{theoretical_angular_frequency, InitialGuess};
use crate::data_analysis::peak_detection::{LocalMaxima, PeakDetector};
use crate::data_analysis::period_estimation::{estimate_period, PeriodEstimate};
use crate::data_analysis::regression::{estimate_gravity, GravityEstimate};
use crate::data_input::signal_data::TimeSeries;
use crate::data_input::signal_parser::{load_signal_file, AngleCorrection};
use crate::data_input::trial_catalog::{AmplitudeBucket, Trial, TrialCatalog, TrialInfo};
use crate::error::{PendulumError, Result};

/// Everything computed for one trial.
#[derive(Debug, Clone)]
pub struct TrialAnalysis {
    pub info: TrialInfo,
    pub period: PeriodEstimate,
    pub initial_guess: InitialGuess,
    pub fit: FitResult,
    pub mean_relative_error: Option<f64>,
    pub max_relative_deviation: Option<f64>,
}

/// Runs period estimation, parameter estimation and the model fit on one trial.
pub fn analyze_trial(trial: &Trial, config: &FitConfig, detector: &dyn PeakDetector) -> TrialAnalysis {
    let info = &trial.info;
    let period = estimate_period(&trial.series, detector);
    let omega_theory = theoretical_angular_frequency(info.length_m.value, config.gravity_m_s2);
    let (initial_guess, fit) = fit_series(&trial.series, omega_theory, config, detector);

    let times = trial.series.times().to_vec();
    let angles = trial.series.angles().to_vec();
    let mean_relative_error = mean_relative_error(&times, &angles, &fit);
    let max_relative_deviation = max_relative_deviation(&angles);

    tracing::info!(
        "{}: {} peaks, period {}, fit {:?} (RMSE {:.4}, omega/omega_th {:.4})",
        info.label,
        period.peak_count(),
        period
            .period()
            .map(|p| format!("{p:.4} s"))
            .unwrap_or_else(|| "undefined".to_string()),
        fit.status,
        fit.rmse,
        fit.frequency_ratio()
    );

    TrialAnalysis {
        info: info.clone(),
        period,
        initial_guess,
        fit,
        mean_relative_error,
        max_relative_deviation,
    }
}

/// Resolves a file name against the catalog and loads its recording.
pub fn load_trial(path: &Path, catalog: &TrialCatalog, correction: AngleCorrection) -> Result<Trial> {
    let info = catalog.resolve(path)?;
    let series = load_signal_file(path, correction)?;
    if series.is_empty() {
        return Err(PendulumError::data_format(
            path.display().to_string(),
            "no usable samples after cleaning",
        ));
    }
    Ok(Trial { info, series })
}

/// A trial's cleaned recording kept next to its analysis (used for plotting).
#[derive(Debug, Clone)]
pub struct AnalyzedTrial {
    pub series: TimeSeries,
    pub analysis: TrialAnalysis,
}

#[derive(Debug)]
pub struct TrialFailure {
    pub path: PathBuf,
    pub error: PendulumError,
}

/// Mass and amplitude held fixed while the length varies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConditionKey {
    pub mass_label: String,
    pub amplitude: AmplitudeBucket,
}

impl std::fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.mass_label, self.amplitude)
    }
}

/// One point of a frequency comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyPoint {
    pub label: String,
    /// Length (m) or mass (g), depending on the table.
    pub x: f64,
    pub x_uncertainty: f64,
    pub period_s: f64,
    pub angular_frequency: f64,
}

#[derive(Debug, Default)]
pub struct BatchAnalysis {
    pub trials: Vec<AnalyzedTrial>,
    pub failures: Vec<TrialFailure>,
}

impl BatchAnalysis {
    /// Analyzes every path with the default local-maximum detector.
    pub fn run<P: AsRef<Path>>(paths: &[P], config: &AnalysisConfig) -> Self {
        Self::run_with_detector(paths, config, &LocalMaxima)
    }

    pub fn run_with_detector<P: AsRef<Path>>(
        paths: &[P],
        config: &AnalysisConfig,
        detector: &dyn PeakDetector,
    ) -> Self {
        let mut batch = BatchAnalysis::default();
        for path in paths {
            let path = path.as_ref();
            match load_trial(path, &config.catalog, config.loader.angle_correction) {
                Ok(trial) => batch.push(trial, &config.fit, detector),
                Err(error) => {
                    tracing::warn!("Skipping {}: {}", path.display(), error);
                    batch.failures.push(TrialFailure {
                        path: path.to_path_buf(),
                        error,
                    });
                }
            }
        }
        tracing::info!(
            "Analyzed {} trial(s), {} failure(s)",
            batch.trials.len(),
            batch.failures.len()
        );
        batch
    }

    /// Analyzes already-loaded trials.
    pub fn from_trials(trials: Vec<Trial>, config: &FitConfig, detector: &dyn PeakDetector) -> Self {
        let mut batch = BatchAnalysis::default();
        for trial in trials {
            batch.push(trial, config, detector);
        }
        batch
    }

    fn push(&mut self, trial: Trial, config: &FitConfig, detector: &dyn PeakDetector) {
        let analysis = analyze_trial(&trial, config, detector);
        self.trials.push(AnalyzedTrial {
            series: trial.series,
            analysis,
        });
    }

    /// Analyses with a defined period; the rest are logged and left out.
    fn with_defined_period(&self) -> impl Iterator<Item = (&TrialAnalysis, f64)> {
        self.trials.iter().filter_map(|t| {
            let analysis = &t.analysis;
            match analysis.period.period() {
                Some(period) => Some((analysis, period)),
                None => {
                    tracing::debug!(
                        "{}: period undefined ({} peak(s)), excluded from aggregates",
                        analysis.info.label,
                        analysis.period.peak_count()
                    );
                    None
                }
            }
        })
    }

    /// Angular frequency against length, one series per (mass, amplitude).
    pub fn frequency_vs_length(&self) -> BTreeMap<ConditionKey, Vec<FrequencyPoint>> {
        let mut table: BTreeMap<ConditionKey, Vec<FrequencyPoint>> = BTreeMap::new();
        for (analysis, period_s) in self.with_defined_period() {
            let info = &analysis.info;
            let key = ConditionKey {
                mass_label: info.mass_label.clone(),
                amplitude: info.amplitude,
            };
            table.entry(key).or_default().push(FrequencyPoint {
                label: info.length_label.clone(),
                x: info.length_m.value,
                x_uncertainty: info.length_m.uncertainty,
                period_s,
                angular_frequency: 2.0 * std::f64::consts::PI / period_s,
            });
        }
        sort_points(&mut table);
        table
    }

    /// Angular frequency against mass, one series per (length label, amplitude).
    pub fn frequency_vs_mass(&self) -> BTreeMap<(String, AmplitudeBucket), Vec<FrequencyPoint>> {
        let mut table: BTreeMap<(String, AmplitudeBucket), Vec<FrequencyPoint>> = BTreeMap::new();
        for (analysis, period_s) in self.with_defined_period() {
            let info = &analysis.info;
            table
                .entry((info.length_label.clone(), info.amplitude))
                .or_default()
                .push(FrequencyPoint {
                    label: info.mass_label.clone(),
                    x: info.mass_g.value,
                    x_uncertainty: info.mass_g.uncertainty,
                    period_s,
                    angular_frequency: 2.0 * std::f64::consts::PI / period_s,
                });
        }
        sort_points(&mut table);
        table
    }

    /// g from period² vs length for every (mass, amplitude) condition.
    pub fn gravity_by_condition(&self) -> BTreeMap<ConditionKey, Result<GravityEstimate>> {
        let mut groups: BTreeMap<ConditionKey, Vec<(f64, Option<f64>)>> = BTreeMap::new();
        for (analysis, period_s) in self.with_defined_period() {
            let info = &analysis.info;
            let key = ConditionKey {
                mass_label: info.mass_label.clone(),
                amplitude: info.amplitude,
            };
            groups
                .entry(key)
                .or_default()
                .push((info.length_m.value, Some(period_s)));
        }
        groups
            .into_iter()
            .map(|(key, pairs)| (key, estimate_gravity(pairs)))
            .collect()
    }

    /// g from period² vs length per mass, pooling every amplitude.
    pub fn gravity_pooled(&self) -> BTreeMap<String, Result<GravityEstimate>> {
        let mut groups: BTreeMap<String, Vec<(f64, Option<f64>)>> = BTreeMap::new();
        for (analysis, period_s) in self.with_defined_period() {
            groups
                .entry(analysis.info.mass_label.clone())
                .or_default()
                .push((analysis.info.length_m.value, Some(period_s)));
        }
        groups
            .into_iter()
            .map(|(mass, pairs)| (mass, estimate_gravity(pairs)))
            .collect()
    }

    /// `(fitted amplitude, mean relative error)` per length label.
    pub fn relative_error_by_amplitude(&self) -> BTreeMap<String, Vec<(f64, f64)>> {
        let mut table: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        for t in &self.trials {
            let analysis = &t.analysis;
            if let Some(error) = analysis.mean_relative_error {
                table
                    .entry(analysis.info.length_label.clone())
                    .or_default()
                    .push((analysis.fit.amplitude, error));
            }
        }
        for points in table.values_mut() {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        table
    }
}

fn sort_points<K>(table: &mut BTreeMap<K, Vec<FrequencyPoint>>) {
    for points in table.values_mut() {
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
}
