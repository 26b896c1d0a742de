// src/data_analysis/model_fit.rs

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GRAVITY_M_S2, FREQUENCY_BOUND_FRACTION, MAX_FUNCTION_EVALUATIONS, PHASE_BOUND_RAD,
    SOFT_L1_SCALE,
};
use crate::data_analysis::least_squares::{solve_bounded, Bounds, Loss, ResidualModel, SolverOptions};
use crate::data_analysis::parameter_estimation::{
    estimate_initial_parameters, GuessOptions, InitialGuess, PhaseAnchor,
};
use crate::data_analysis::peak_detection::PeakDetector;
use crate::data_input::signal_data::TimeSeries;
use crate::error::{PendulumError, Result};

/// Whether the fit may move the angular frequency away from `sqrt(g/L)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyMode {
    /// ω stays at the theoretical value; only A and φ are fitted.
    #[default]
    Fixed,
    /// ω is fitted within ±`frequency_bound_fraction` of the theoretical value.
    Free,
}

/// Knobs shared by every trial in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    pub frequency_mode: FrequencyMode,
    pub smoothing: bool,
    pub phase_anchor: PhaseAnchor,
    pub max_evaluations: usize,
    pub frequency_bound_fraction: f64,
    pub gravity_m_s2: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            frequency_mode: FrequencyMode::Fixed,
            smoothing: false,
            phase_anchor: PhaseAnchor::FirstPeak,
            max_evaluations: MAX_FUNCTION_EVALUATIONS,
            frequency_bound_fraction: FREQUENCY_BOUND_FRACTION,
            gravity_m_s2: DEFAULT_GRAVITY_M_S2,
        }
    }
}

impl FitConfig {
    /// Soft-L1 when the frequency is free, plain least squares otherwise.
    pub fn loss(&self) -> Loss {
        match self.frequency_mode {
            FrequencyMode::Fixed => Loss::Linear,
            FrequencyMode::Free => Loss::SoftL1 {
                scale: SOFT_L1_SCALE,
            },
        }
    }

    pub fn guess_options(&self) -> GuessOptions {
        GuessOptions {
            smoothing: self.smoothing,
            phase_anchor: self.phase_anchor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_evaluations == 0 {
            return Err(PendulumError::Config("max_evaluations must be at least 1".to_string()));
        }
        if !(self.frequency_bound_fraction > 0.0 && self.frequency_bound_fraction < 1.0) {
            return Err(PendulumError::Config(format!(
                "frequency_bound_fraction must lie in (0, 1), got {}",
                self.frequency_bound_fraction
            )));
        }
        if !(self.gravity_m_s2.is_finite() && self.gravity_m_s2 > 0.0) {
            return Err(PendulumError::Config(format!(
                "gravity_m_s2 must be positive, got {}",
                self.gravity_m_s2
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    Fitted,
    /// The solver gave up; parameters are the initial guess.
    FallbackToInitialGuess,
}

/// Fitted `θ(t) = A·sin(ω·t + φ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub amplitude: f64,
    pub phase: f64,
    pub angular_frequency: f64,
    pub theoretical_angular_frequency: f64,
    pub rmse: f64,
    pub status: FitStatus,
    pub evaluations: usize,
}

impl FitResult {
    pub fn evaluate(&self, t: f64) -> f64 {
        self.amplitude * (self.angular_frequency * t + self.phase).sin()
    }

    /// Fitted over theoretical angular frequency.
    pub fn frequency_ratio(&self) -> f64 {
        self.angular_frequency / self.theoretical_angular_frequency
    }

    pub fn is_fitted(&self) -> bool {
        self.status == FitStatus::Fitted
    }
}

/// Sinusoid residuals. With `fixed_frequency` set the parameter vector is
/// `[A, φ]`, otherwise `[A, φ, ω]`.
struct SinusoidModel<'a> {
    times: &'a Array1<f64>,
    angles: &'a Array1<f64>,
    fixed_frequency: Option<f64>,
}

impl SinusoidModel<'_> {
    fn unpack(&self, p: &Array1<f64>) -> (f64, f64, f64) {
        let omega = self.fixed_frequency.unwrap_or_else(|| p[2]);
        (p[0], p[1], omega)
    }
}

impl ResidualModel for SinusoidModel<'_> {
    fn residuals(&self, p: &Array1<f64>) -> Array1<f64> {
        let (a, phi, omega) = self.unpack(p);
        let model = self.times.mapv(|t| a * (omega * t + phi).sin());
        model - self.angles
    }

    fn jacobian(&self, p: &Array1<f64>) -> Array2<f64> {
        let (a, phi, omega) = self.unpack(p);
        let mut jac = Array2::zeros((self.times.len(), p.len()));
        for (i, &t) in self.times.iter().enumerate() {
            let arg = omega * t + phi;
            let (sin, cos) = arg.sin_cos();
            jac[[i, 0]] = sin;
            jac[[i, 1]] = a * cos;
            if self.fixed_frequency.is_none() {
                jac[[i, 2]] = a * t * cos;
            }
        }
        jac
    }
}

fn rmse(residuals: &Array1<f64>) -> f64 {
    if residuals.is_empty() {
        return f64::NAN;
    }
    (residuals.dot(residuals) / residuals.len() as f64).sqrt()
}

/// Fits the pendulum model starting from `guess`.
///
/// Solver failure is not an error here: it is logged and the guess comes back
/// with `FitStatus::FallbackToInitialGuess`.
pub fn fit_pendulum_model(
    times: &[f64],
    angles: &[f64],
    theoretical_angular_frequency: f64,
    guess: &InitialGuess,
    config: &FitConfig,
) -> FitResult {
    let n = times.len().min(angles.len());
    let times = Array1::from(times[..n].to_vec());
    let angles = Array1::from(angles[..n].to_vec());
    let omega_theory = theoretical_angular_frequency;

    let (fixed_frequency, initial, bounds) = match config.frequency_mode {
        FrequencyMode::Fixed => (
            Some(omega_theory),
            ndarray::arr1(&[guess.amplitude, guess.phase]),
            Bounds::new(vec![0.0, -PHASE_BOUND_RAD], vec![f64::INFINITY, PHASE_BOUND_RAD]),
        ),
        FrequencyMode::Free => {
            let fraction = config.frequency_bound_fraction;
            (
                None,
                ndarray::arr1(&[guess.amplitude, guess.phase, guess.angular_frequency]),
                Bounds::new(
                    vec![0.0, -PHASE_BOUND_RAD, (1.0 - fraction) * omega_theory],
                    vec![f64::INFINITY, PHASE_BOUND_RAD, (1.0 + fraction) * omega_theory],
                ),
            )
        }
    };

    let model = SinusoidModel {
        times: &times,
        angles: &angles,
        fixed_frequency,
    };

    let fallback = |evaluations: usize| {
        let start = bounds.clamp(&initial);
        let (amplitude, phase, angular_frequency) = model.unpack(&start);
        FitResult {
            amplitude,
            phase,
            angular_frequency,
            theoretical_angular_frequency: omega_theory,
            rmse: rmse(&model.residuals(&start)),
            status: FitStatus::FallbackToInitialGuess,
            evaluations,
        }
    };

    if n == 0 {
        tracing::warn!("No samples to fit; keeping the initial guess");
        return fallback(0);
    }

    let options = SolverOptions {
        loss: config.loss(),
        max_evaluations: config.max_evaluations,
        ..SolverOptions::default()
    };

    match solve_bounded(&model, &initial, &bounds, &options) {
        Ok(report) => {
            let (amplitude, phase, angular_frequency) = model.unpack(&report.params);
            tracing::debug!(
                "Fit converged ({:?}) after {} evaluations: A={:.4} phi={:.4} omega={:.4}",
                report.termination,
                report.evaluations,
                amplitude,
                phase,
                angular_frequency
            );
            FitResult {
                amplitude,
                phase,
                angular_frequency,
                theoretical_angular_frequency: omega_theory,
                rmse: rmse(&report.residuals),
                status: FitStatus::Fitted,
                evaluations: report.evaluations,
            }
        }
        Err(err) => {
            let evaluations = match err {
                PendulumError::FitNonConvergence { evaluations, .. } => evaluations,
                _ => 0,
            };
            tracing::warn!("{err}; falling back to the initial guess");
            fallback(evaluations)
        }
    }
}

/// Initial guess and fit for a whole series.
pub fn fit_series(
    series: &TimeSeries,
    theoretical_angular_frequency: f64,
    config: &FitConfig,
    detector: &dyn PeakDetector,
) -> (InitialGuess, FitResult) {
    let times = series.times().to_vec();
    let angles = series.angles().to_vec();
    let guess = estimate_initial_parameters(
        &times,
        &angles,
        theoretical_angular_frequency,
        config.guess_options(),
        detector,
    );
    let fit = fit_pendulum_model(&times, &angles, theoretical_angular_frequency, &guess, config);
    (guess, fit)
}
