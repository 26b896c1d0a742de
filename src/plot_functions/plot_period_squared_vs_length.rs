// src/plot_functions/plot_period_squared_vs_length.rs

use std::error::Error;

use crate::constants::{
    COLOR_REGRESSION_LINE, COLOR_REGRESSION_POINTS, LINE_WIDTH_PLOT, POINT_RADIUS,
};
use crate::data_analysis::regression::GravityEstimate;
use crate::error::Result as PendulumResult;
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};

/// T² against L with the fitted line, one panel per group (e.g. per mass).
pub fn plot_period_squared_vs_length(
    estimates: &[(String, PendulumResult<GravityEstimate>)],
    root_name: &str,
) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_PeriodSquaredVsLength_stacked.png");
    let panel_names: Vec<&str> = estimates.iter().map(|(name, _)| name.as_str()).collect();

    draw_stacked_plot(
        &output_file,
        root_name,
        "T²/Length",
        &panel_names,
        |panel_index| {
            let (name, estimate) = estimates.get(panel_index)?;
            let estimate = estimate.as_ref().ok()?;

            let (lo, hi) = estimate
                .points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
            let line = vec![
                (lo, estimate.slope * lo + estimate.intercept),
                (hi, estimate.slope * hi + estimate.intercept),
            ];
            let g_text = match estimate.gravity_uncertainty {
                Some(u) => format!("g = {:.3} ± {:.3} m/s²", estimate.gravity_m_s2, u),
                None => format!("g = {:.3} m/s²", estimate.gravity_m_s2),
            };

            PlotConfig::fitted_to_data(
                format!("{name}: {g_text}, R² = {:.4}", estimate.r_squared),
                vec![
                    PlotSeries::points(
                        estimate.points.clone(),
                        "Measured T²",
                        *COLOR_REGRESSION_POINTS,
                        POINT_RADIUS,
                    ),
                    PlotSeries::line(
                        line,
                        format!("T² = {:.4}·L + {:.4}", estimate.slope, estimate.intercept),
                        *COLOR_REGRESSION_LINE,
                        LINE_WIDTH_PLOT,
                    ),
                ],
                "Length (m)",
                "T² (s²)",
            )
        },
    )
}

// src/plot_functions/plot_period_squared_vs_length.rs
