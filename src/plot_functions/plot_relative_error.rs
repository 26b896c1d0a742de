// src/plot_functions/plot_relative_error.rs

use std::error::Error;

use crate::constants::{COLOR_RELATIVE_ERROR, POINT_RADIUS, POINT_RADIUS_DENSE, SERIES_PALETTE};
use crate::pipeline::BatchAnalysis;
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};

/// Model-vs-data relative error against fitted amplitude, per length.
/// The lower panel shows each trial's largest deviation from its initial angle.
pub fn plot_relative_error(batch: &BatchAnalysis, root_name: &str) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_RelativeError_stacked.png");
    let by_length = batch.relative_error_by_amplitude();

    let error_series: Vec<PlotSeries> = by_length
        .iter()
        .enumerate()
        .map(|(i, (length_label, points))| {
            PlotSeries::points(
                points.clone(),
                length_label.clone(),
                *SERIES_PALETTE[i % SERIES_PALETTE.len()],
                POINT_RADIUS,
            )
        })
        .collect();

    let deviation: Vec<(f64, f64)> = batch
        .trials
        .iter()
        .filter_map(|t| {
            let analysis = &t.analysis;
            analysis
                .max_relative_deviation
                .map(|d| (analysis.fit.amplitude, d))
        })
        .collect();

    draw_stacked_plot(
        &output_file,
        root_name,
        "Relative Error",
        &["Model", "Initial Angle"],
        move |panel_index| match panel_index {
            0 => PlotConfig::fitted_to_data(
                "Mean |θ - θ_model| / |θ_model|",
                error_series.clone(),
                "Fitted amplitude",
                "Relative error",
            ),
            1 => PlotConfig::fitted_to_data(
                "Max |θ - θ₀| / |θ₀|",
                vec![PlotSeries::points(
                    deviation.clone(),
                    "All trials",
                    *COLOR_RELATIVE_ERROR,
                    POINT_RADIUS_DENSE,
                )],
                "Fitted amplitude",
                "Relative deviation",
            ),
            _ => None,
        },
    )
}

// src/plot_functions/plot_relative_error.rs
