// src/data_analysis/regression.rs
//
// Gravitational acceleration from the small-angle relation T² = (4π²/g)·L.

use ndarray::Array1;
use std::f64::consts::PI;

use crate::error::{PendulumError, Result};

/// Ordinary least-squares line `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// `None` with only two points (no residual degrees of freedom).
    pub slope_std_error: Option<f64>,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares line through `(x, y)`. Needs at least two distinct x values.
pub fn linear_regression(x: &Array1<f64>, y: &Array1<f64>) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(PendulumError::InsufficientData(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(PendulumError::RegressionDegenerate {
            reason: format!("{n} point(s), need at least 2"),
        });
    }

    let x_mean = x.sum() / n as f64;
    let y_mean = y.sum() / n as f64;
    let dx = x - x_mean;
    let dy = y - y_mean;
    let sxx = dx.dot(&dx);
    if sxx <= f64::EPSILON * x_mean.abs().max(1.0) {
        return Err(PendulumError::RegressionDegenerate {
            reason: "all points share the same length".to_string(),
        });
    }

    let slope = dx.dot(&dy) / sxx;
    let intercept = y_mean - slope * x_mean;

    let fitted = x.mapv(|xi| slope * xi + intercept);
    let residuals = y - &fitted;
    let sse = residuals.dot(&residuals);
    let sst = dy.dot(&dy);
    let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };
    let slope_std_error = (n > 2).then(|| (sse / (n - 2) as f64 / sxx).sqrt());

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        slope_std_error,
    })
}

/// Fit of period² against length and the g derived from its slope.
#[derive(Debug, Clone, PartialEq)]
pub struct GravityEstimate {
    pub slope: f64,
    pub intercept: f64,
    pub gravity_m_s2: f64,
    pub r_squared: f64,
    pub slope_std_error: Option<f64>,
    pub gravity_uncertainty: Option<f64>,
    /// `(length m, period² s²)` pairs that entered the fit.
    pub points: Vec<(f64, f64)>,
}

/// Estimates g from `(length, period)` pairs. `None` periods are skipped.
///
/// Fails with `RegressionDegenerate` for fewer than two distinct lengths or a
/// non-positive slope.
pub fn estimate_gravity<I>(pairs: I) -> Result<GravityEstimate>
where
    I: IntoIterator<Item = (f64, Option<f64>)>,
{
    let points: Vec<(f64, f64)> = pairs
        .into_iter()
        .filter_map(|(length, period)| period.map(|p| (length, p * p)))
        .filter(|(l, t2)| l.is_finite() && t2.is_finite())
        .collect();

    let lengths: Array1<f64> = points.iter().map(|p| p.0).collect();
    let periods_sq: Array1<f64> = points.iter().map(|p| p.1).collect();
    let fit = linear_regression(&lengths, &periods_sq)?;

    if fit.slope <= 0.0 {
        return Err(PendulumError::RegressionDegenerate {
            reason: format!("non-positive slope {:.6} s²/m", fit.slope),
        });
    }

    let four_pi_sq = 4.0 * PI * PI;
    let gravity_m_s2 = four_pi_sq / fit.slope;
    let gravity_uncertainty = fit
        .slope_std_error
        .map(|se| four_pi_sq * se / (fit.slope * fit.slope));

    tracing::debug!(
        "T² vs L over {} points: slope={:.5} intercept={:.5} g={:.4} R²={:.5}",
        points.len(),
        fit.slope,
        fit.intercept,
        gravity_m_s2,
        fit.r_squared
    );

    Ok(GravityEstimate {
        slope: fit.slope,
        intercept: fit.intercept,
        gravity_m_s2,
        r_squared: fit.r_squared,
        slope_std_error: fit.slope_std_error,
        gravity_uncertainty,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ideal_period(length: f64, g: f64) -> f64 {
        2.0 * PI * (length / g).sqrt()
    }

    #[test]
    fn test_exact_gravity_from_ideal_periods() {
        let g = 9.79;
        let pairs: Vec<(f64, Option<f64>)> = [0.115, 0.205, 0.215, 0.27, 0.305]
            .iter()
            .map(|&l| (l, Some(ideal_period(l, g))))
            .collect();
        let estimate = estimate_gravity(pairs).unwrap();
        assert!((estimate.gravity_m_s2 - g).abs() < 1e-9);
        assert!(estimate.intercept.abs() < 1e-12);
        assert!((estimate.r_squared - 1.0).abs() < 1e-12);
        assert!(estimate.gravity_uncertainty.unwrap() < 1e-6);
        assert_eq!(estimate.points.len(), 5);
    }

    #[test]
    fn test_two_length_lab_scenario() {
        let estimate = estimate_gravity(vec![(0.305, Some(1.107)), (0.115, Some(0.68))]).unwrap();
        assert!((estimate.slope - 4.0158).abs() < 1e-3);
        assert!((estimate.gravity_m_s2 - 9.8).abs() / 9.8 < 0.05);
        assert_eq!(estimate.gravity_uncertainty, None);
    }

    #[test]
    fn test_undefined_periods_are_skipped() {
        let pairs = vec![
            (0.305, Some(1.107)),
            (0.27, None),
            (0.115, Some(0.68)),
        ];
        let estimate = estimate_gravity(pairs).unwrap();
        assert_eq!(estimate.points.len(), 2);
    }

    #[test]
    fn test_single_length_is_degenerate() {
        let pairs = vec![(0.305, Some(1.10)), (0.305, Some(1.11)), (0.305, Some(1.12))];
        assert!(matches!(
            estimate_gravity(pairs),
            Err(PendulumError::RegressionDegenerate { .. })
        ));
        assert!(matches!(
            estimate_gravity(Vec::new()),
            Err(PendulumError::RegressionDegenerate { .. })
        ));
    }

    #[test]
    fn test_negative_slope_is_degenerate() {
        let pairs = vec![(0.1, Some(1.2)), (0.3, Some(0.6))];
        assert!(matches!(
            estimate_gravity(pairs),
            Err(PendulumError::RegressionDegenerate { .. })
        ));
    }

    #[test]
    fn test_linear_regression_with_noise() {
        let x = ndarray::arr1(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let y = ndarray::arr1(&[1.1, 2.9, 5.2, 6.8, 9.1]);
        let fit = linear_regression(&x, &y).unwrap();
        assert!((fit.slope - 1.99).abs() < 1e-9);
        assert!((fit.intercept - 1.04).abs() < 1e-9);
        assert!(fit.r_squared > 0.99 && fit.r_squared < 1.0);
        assert!(fit.slope_std_error.unwrap() > 0.0);
        assert!((fit.predict(2.0) - 5.02).abs() < 1e-9);
    }
}
