// src/data_analysis/least_squares.rs
//
// Bounded Levenberg-Marquardt for small parameter vectors (2-3 unknowns).
// Bounds are enforced by projecting every trial step onto the box; robust
// losses are handled by iteratively reweighting the Gauss-Newton system.

use ndarray::{Array1, Array2, Axis};

use crate::constants::{
    LM_COST_TOLERANCE, LM_GRADIENT_TOLERANCE, LM_INITIAL_DAMPING, LM_MAX_DAMPING, LM_STEP_TOLERANCE,
};
use crate::error::{PendulumError, Result};

/// Residual loss applied to each observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loss {
    /// Ordinary least squares, `0.5 Σ r²`.
    Linear,
    /// `Σ s² (sqrt(1 + (r/s)²) - 1)`: quadratic near zero, linear for large residuals.
    SoftL1 { scale: f64 },
}

impl Loss {
    pub fn cost(&self, residuals: &Array1<f64>) -> f64 {
        match *self {
            Loss::Linear => 0.5 * residuals.dot(residuals),
            Loss::SoftL1 { scale } => {
                let s2 = scale * scale;
                residuals
                    .iter()
                    .map(|r| s2 * ((1.0 + r * r / s2).sqrt() - 1.0))
                    .sum()
            }
        }
    }

    /// IRLS weight `ρ'(z)` for one residual.
    pub fn weight(&self, residual: f64) -> f64 {
        match *self {
            Loss::Linear => 1.0,
            Loss::SoftL1 { scale } => 1.0 / (1.0 + (residual / scale).powi(2)).sqrt(),
        }
    }
}

/// A model whose residuals are minimized.
pub trait ResidualModel {
    /// Residuals `model(p) - observed`, one per observation.
    fn residuals(&self, params: &Array1<f64>) -> Array1<f64>;

    /// Jacobian of the residuals, shape `(observations, parameters)`.
    fn jacobian(&self, params: &Array1<f64>) -> Array2<f64>;
}

/// Box constraints, inclusive. Infinite bounds are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self {
            lower: Array1::from(lower),
            upper: Array1::from(upper),
        }
    }

    pub fn clamp(&self, params: &Array1<f64>) -> Array1<f64> {
        let mut clamped = params.clone();
        for (j, value) in clamped.iter_mut().enumerate() {
            *value = value.max(self.lower[j]).min(self.upper[j]);
        }
        clamped
    }

    /// Zeroes gradient components that point out of the box at an active bound.
    fn project_gradient(&self, params: &Array1<f64>, gradient: &Array1<f64>) -> Array1<f64> {
        let mut projected = gradient.clone();
        for (j, g) in projected.iter_mut().enumerate() {
            let at_lower = params[j] <= self.lower[j] && *g > 0.0;
            let at_upper = params[j] >= self.upper[j] && *g < 0.0;
            if at_lower || at_upper {
                *g = 0.0;
            }
        }
        projected
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub loss: Loss,
    pub max_evaluations: usize,
    pub cost_tolerance: f64,
    pub step_tolerance: f64,
    pub gradient_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            loss: Loss::Linear,
            max_evaluations: crate::constants::MAX_FUNCTION_EVALUATIONS,
            cost_tolerance: LM_COST_TOLERANCE,
            step_tolerance: LM_STEP_TOLERANCE,
            gradient_tolerance: LM_GRADIENT_TOLERANCE,
        }
    }
}

/// Why the solver stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Gradient,
    CostReduction,
    StepSize,
    ExactFit,
}

#[derive(Debug, Clone)]
pub struct SolverReport {
    pub params: Array1<f64>,
    pub residuals: Array1<f64>,
    pub cost: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: Termination,
}

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` for a (numerically) singular matrix.
pub fn solve_linear_system(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    if a.nrows() != n || a.ncols() != n {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| {
            a[[i, col]]
                .abs()
                .partial_cmp(&a[[j, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        let pivot = a[[pivot_row, col]];
        if !pivot.is_finite() || pivot.abs() < 1e-300 {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
            }
            b.swap(col, pivot_row);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

fn non_convergence(evaluations: usize, reason: impl Into<String>) -> PendulumError {
    PendulumError::FitNonConvergence {
        evaluations,
        reason: reason.into(),
    }
}

/// Minimizes the loss of `model`'s residuals inside `bounds`, starting from `initial`
/// (clamped into the box first).
///
/// Fails with `FitNonConvergence` when the evaluation budget runs out, the
/// residuals become non-finite, or the damping grows without producing a descent step.
pub fn solve_bounded(
    model: &dyn ResidualModel,
    initial: &Array1<f64>,
    bounds: &Bounds,
    options: &SolverOptions,
) -> Result<SolverReport> {
    let mut params = bounds.clamp(initial);
    let mut residuals = model.residuals(&params);
    let mut evaluations = 1usize;
    if residuals.iter().any(|r| !r.is_finite()) {
        return Err(non_convergence(evaluations, "non-finite residuals at the initial guess"));
    }
    let mut cost = options.loss.cost(&residuals);
    let mut damping = LM_INITIAL_DAMPING;
    let mut iterations = 0usize;

    let report = |params: Array1<f64>, residuals: Array1<f64>, cost: f64, evaluations: usize, iterations: usize, termination| {
        SolverReport {
            params,
            residuals,
            cost,
            evaluations,
            iterations,
            termination,
        }
    };

    loop {
        if cost == 0.0 {
            return Ok(report(params, residuals, cost, evaluations, iterations, Termination::ExactFit));
        }

        let jacobian = model.jacobian(&params);
        let weights: Array1<f64> = residuals.mapv(|r| options.loss.weight(r));
        let weighted_jacobian = &jacobian * &weights.view().insert_axis(Axis(1));
        let normal_matrix = jacobian.t().dot(&weighted_jacobian);
        let gradient = jacobian.t().dot(&(&weights * &residuals));

        let projected = bounds.project_gradient(&params, &gradient);
        let gradient_norm = projected.iter().fold(0.0f64, |m, g| m.max(g.abs()));
        if gradient_norm <= options.gradient_tolerance {
            return Ok(report(params, residuals, cost, evaluations, iterations, Termination::Gradient));
        }

        iterations += 1;
        loop {
            if evaluations >= options.max_evaluations {
                return Err(non_convergence(evaluations, "evaluation budget exhausted"));
            }

            let mut damped = normal_matrix.clone();
            for j in 0..damped.nrows() {
                damped[[j, j]] += damping * normal_matrix[[j, j]].max(1e-12);
            }
            let Some(step) = solve_linear_system(damped, -&gradient) else {
                damping *= 10.0;
                if damping > LM_MAX_DAMPING {
                    return Err(non_convergence(evaluations, "singular normal equations"));
                }
                continue;
            };

            let candidate = bounds.clamp(&(&params + &step));
            let actual_step = &candidate - &params;
            let step_norm = actual_step.dot(&actual_step).sqrt();
            let params_norm = params.dot(&params).sqrt();
            let step_is_tiny = step_norm <= options.step_tolerance * (params_norm + options.step_tolerance);

            let candidate_residuals = model.residuals(&candidate);
            evaluations += 1;
            let candidate_cost = options.loss.cost(&candidate_residuals);

            if candidate_cost.is_finite() && candidate_cost < cost {
                let reduction = cost - candidate_cost;
                let previous_cost = cost;
                params = candidate;
                residuals = candidate_residuals;
                cost = candidate_cost;
                damping = (damping / 10.0).max(1e-15);

                if reduction <= options.cost_tolerance * previous_cost {
                    return Ok(report(params, residuals, cost, evaluations, iterations, Termination::CostReduction));
                }
                if step_is_tiny {
                    return Ok(report(params, residuals, cost, evaluations, iterations, Termination::StepSize));
                }
                break;
            }

            // No descent: a vanishing step means we are already at the minimum.
            if step_is_tiny {
                return Ok(report(params, residuals, cost, evaluations, iterations, Termination::StepSize));
            }
            damping *= 10.0;
            if damping > LM_MAX_DAMPING {
                return Err(non_convergence(evaluations, "damping overflow without a descent step"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a·exp(b·x)
    struct Exponential {
        x: Array1<f64>,
        y: Array1<f64>,
    }

    impl ResidualModel for Exponential {
        fn residuals(&self, p: &Array1<f64>) -> Array1<f64> {
            self.x.mapv(|x| p[0] * (p[1] * x).exp()) - &self.y
        }

        fn jacobian(&self, p: &Array1<f64>) -> Array2<f64> {
            let mut j = Array2::zeros((self.x.len(), 2));
            for (i, &x) in self.x.iter().enumerate() {
                let e = (p[1] * x).exp();
                j[[i, 0]] = e;
                j[[i, 1]] = p[0] * x * e;
            }
            j
        }
    }

    fn exponential(a: f64, b: f64) -> Exponential {
        let x = Array1::linspace(0.0, 2.0, 40);
        let y = x.mapv(|x| a * (b * x).exp());
        Exponential { x, y }
    }

    #[test]
    fn test_solve_linear_system() {
        let a = ndarray::arr2(&[[2.0, 1.0, -1.0], [-3.0, -1.0, 2.0], [-2.0, 1.0, 2.0]]);
        let b = ndarray::arr1(&[8.0, -11.0, -3.0]);
        let x = solve_linear_system(a, b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
        assert!((x[2] + 1.0).abs() < 1e-12);

        let singular = ndarray::arr2(&[[1.0, 2.0], [2.0, 4.0]]);
        assert!(solve_linear_system(singular, ndarray::arr1(&[1.0, 2.0])).is_none());
    }

    #[test]
    fn test_unbounded_exponential_fit() {
        let model = exponential(2.0, -1.3);
        let bounds = Bounds::new(vec![f64::NEG_INFINITY; 2], vec![f64::INFINITY; 2]);
        let report = solve_bounded(&model, &ndarray::arr1(&[1.0, -0.5]), &bounds, &SolverOptions::default()).unwrap();
        assert!((report.params[0] - 2.0).abs() < 1e-6);
        assert!((report.params[1] + 1.3).abs() < 1e-6);
        assert!(report.cost < 1e-12);
    }

    #[test]
    fn test_active_bound_is_respected() {
        // True b = -1.3 lies outside b >= -1.0; the fit must stop on the bound.
        let model = exponential(2.0, -1.3);
        let bounds = Bounds::new(vec![0.0, -1.0], vec![10.0, 1.0]);
        let report = solve_bounded(&model, &ndarray::arr1(&[1.0, 0.5]), &bounds, &SolverOptions::default()).unwrap();
        assert!(report.params[1] >= -1.0);
        assert!((report.params[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_soft_l1_resists_outlier() {
        let mut model = exponential(2.0, -1.3);
        model.y[10] += 25.0;
        let bounds = Bounds::new(vec![f64::NEG_INFINITY; 2], vec![f64::INFINITY; 2]);
        let start = ndarray::arr1(&[1.5, -1.0]);

        let plain = solve_bounded(&model, &start, &bounds, &SolverOptions::default()).unwrap();
        let robust_options = SolverOptions {
            loss: Loss::SoftL1 { scale: 0.1 },
            ..SolverOptions::default()
        };
        let robust = solve_bounded(&model, &start, &bounds, &robust_options).unwrap();

        let plain_error = (plain.params[0] - 2.0).abs();
        let robust_error = (robust.params[0] - 2.0).abs();
        assert!(robust_error < plain_error, "robust {robust_error} vs plain {plain_error}");
    }

    #[test]
    fn test_budget_exhaustion_is_reported() {
        let model = exponential(2.0, -1.3);
        let bounds = Bounds::new(vec![f64::NEG_INFINITY; 2], vec![f64::INFINITY; 2]);
        let options = SolverOptions {
            max_evaluations: 2,
            ..SolverOptions::default()
        };
        let err = solve_bounded(&model, &ndarray::arr1(&[0.1, 1.0]), &bounds, &options).unwrap_err();
        assert!(matches!(err, PendulumError::FitNonConvergence { .. }));
    }

    #[test]
    fn test_loss_weights() {
        assert_eq!(Loss::Linear.weight(100.0), 1.0);
        let soft = Loss::SoftL1 { scale: 1.0 };
        assert_eq!(soft.weight(0.0), 1.0);
        assert!(soft.weight(10.0) < 0.11);
        // Soft-L1 cost matches the quadratic loss for small residuals.
        let small = ndarray::arr1(&[1e-4, -2e-4]);
        assert!((soft.cost(&small) - Loss::Linear.cost(&small)).abs() < 1e-15);
    }
}
