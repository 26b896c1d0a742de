// src/plot_functions/plot_frequency_vs_length.rs

use std::error::Error;

use crate::constants::{COLOR_FREQUENCY, LINE_WIDTH_PLOT, POINT_RADIUS, SERIES_PALETTE};
use crate::data_analysis::parameter_estimation::theoretical_angular_frequency;
use crate::pipeline::BatchAnalysis;
use crate::plot_framework::{draw_single_plot, PlotConfig, PlotSeries};

const THEORY_CURVE_SAMPLES: usize = 100;

/// Measured ω against length per (mass, amplitude), with the `sqrt(g/L)` curve.
pub fn plot_frequency_vs_length(
    batch: &BatchAnalysis,
    gravity_m_s2: f64,
    root_name: &str,
) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_FrequencyVsLength.png");
    let table = batch.frequency_vs_length();

    let mut series: Vec<PlotSeries> = table
        .iter()
        .enumerate()
        .map(|(i, (condition, points))| {
            PlotSeries::points(
                points.iter().map(|p| (p.x, p.angular_frequency)).collect(),
                condition.to_string(),
                *SERIES_PALETTE[i % SERIES_PALETTE.len()],
                POINT_RADIUS,
            )
        })
        .collect();

    let lengths = table.values().flatten().map(|p| p.x);
    let (min_len, max_len) = lengths.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), l| {
        (lo.min(l), hi.max(l))
    });
    if min_len.is_finite() && max_len > 0.0 {
        let start = (min_len * 0.9).max(1e-3);
        let end = max_len * 1.1;
        let step = (end - start) / (THEORY_CURVE_SAMPLES - 1) as f64;
        let curve = (0..THEORY_CURVE_SAMPLES)
            .map(|i| {
                let l = start + i as f64 * step;
                (l, theoretical_angular_frequency(l, gravity_m_s2))
            })
            .collect();
        series.push(PlotSeries::line(
            curve,
            format!("sqrt(g/L), g = {gravity_m_s2:.2}"),
            *COLOR_FREQUENCY,
            LINE_WIDTH_PLOT,
        ));
    }

    let config = PlotConfig::fitted_to_data(
        "Angular Frequency vs Length",
        series,
        "Length (m)",
        "ω (rad/s)",
    );
    draw_single_plot(&output_file, root_name, "Frequency/Length", config)
}

// src/plot_functions/plot_frequency_vs_length.rs
