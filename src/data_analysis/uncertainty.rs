// src/data_analysis/uncertainty.rs
//
// Statistics for repeated measurements (e.g. weighing each bob ten times).
// The averaged value carries a smaller uncertainty than any single reading.

use crate::error::{PendulumError, Result};

/// Mean and spread of a set of repeated readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSummary {
    pub mean: f64,
    /// Population standard deviation (divides by n).
    pub std_dev: f64,
    pub count: usize,
}

impl MeasurementSummary {
    /// Standard error of the mean, `std_dev / sqrt(n)`.
    pub fn standard_error(&self) -> f64 {
        self.std_dev / (self.count as f64).sqrt()
    }
}

/// Summarizes repeated readings. Non-finite readings are rejected.
pub fn summarize(samples: &[f64]) -> Result<MeasurementSummary> {
    if samples.is_empty() {
        return Err(PendulumError::InsufficientData(
            "no measurements to summarize".to_string(),
        ));
    }
    if let Some(bad) = samples.iter().find(|v| !v.is_finite()) {
        return Err(PendulumError::InsufficientData(format!(
            "non-finite measurement {bad}"
        )));
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Ok(MeasurementSummary {
        mean,
        std_dev: variance.sqrt(),
        count: samples.len(),
    })
}
