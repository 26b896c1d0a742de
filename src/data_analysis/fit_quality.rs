// src/data_analysis/fit_quality.rs

use crate::constants::RELATIVE_ERROR_ANGLE_FLOOR;
use crate::data_analysis::model_fit::FitResult;

/// `θ − θ_model` at every sample.
pub fn residuals(times: &[f64], angles: &[f64], fit: &FitResult) -> Vec<f64> {
    times
        .iter()
        .zip(angles)
        .map(|(&t, &theta)| theta - fit.evaluate(t))
        .collect()
}

/// Mean of `|θ − θ_model| / |θ_model|` over the samples where it is finite.
///
/// Samples where the model passes through zero give an infinite ratio and are
/// skipped. Returns `None` when nothing is left.
pub fn mean_relative_error(times: &[f64], angles: &[f64], fit: &FitResult) -> Option<f64> {
    let ratios: Vec<f64> = times
        .iter()
        .zip(angles)
        .map(|(&t, &theta)| {
            let model = fit.evaluate(t);
            (theta - model).abs() / model.abs()
        })
        .filter(|r| r.is_finite())
        .collect();
    if ratios.is_empty() {
        None
    } else {
        Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
    }
}

/// Largest `|θ − θ₀| / |θ₀|` with θ₀ the first sample, |θ₀| floored at 1e-2.
pub fn max_relative_deviation(angles: &[f64]) -> Option<f64> {
    let first = *angles.first()?;
    let reference = if first.abs() < RELATIVE_ERROR_ANGLE_FLOOR {
        RELATIVE_ERROR_ANGLE_FLOOR.copysign(first)
    } else {
        first
    };
    angles
        .iter()
        .map(|theta| ((theta - first) / reference).abs())
        .filter(|r| r.is_finite())
        .reduce(f64::max)
}
