// src/plot_functions/plot_frequency_vs_mass.rs

use std::error::Error;

use crate::constants::{COLOR_MASS, LINE_WIDTH_PLOT, POINT_RADIUS, SERIES_PALETTE};
use crate::pipeline::BatchAnalysis;
use crate::plot_framework::{draw_single_plot, PlotConfig, PlotSeries};

/// Measured ω against bob mass, one series per (length, amplitude).
pub fn plot_frequency_vs_mass(batch: &BatchAnalysis, root_name: &str) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_FrequencyVsMass.png");
    let table = batch.frequency_vs_mass();

    let mut series = Vec::new();
    for (i, ((length_label, amplitude), points)) in table.iter().enumerate() {
        let data: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.angular_frequency)).collect();
        let color = *SERIES_PALETTE[i % SERIES_PALETTE.len()];
        let label = format!("{length_label} / {amplitude}");
        if data.len() > 1 {
            series.push(PlotSeries::line(data.clone(), "", color, 1));
        }
        series.push(PlotSeries::points(data, label, color, POINT_RADIUS));
    }

    // Mean ω across all masses as a reference level.
    let all: Vec<f64> = table.values().flatten().map(|p| p.angular_frequency).collect();
    let masses = table.values().flatten().map(|p| p.x);
    let (lo, hi) = masses.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), m| (lo.min(m), hi.max(m)));
    if !all.is_empty() && lo.is_finite() {
        let mean = all.iter().sum::<f64>() / all.len() as f64;
        series.push(PlotSeries::line(
            vec![(lo, mean), (hi, mean)],
            format!("mean ω = {mean:.3} rad/s"),
            *COLOR_MASS,
            LINE_WIDTH_PLOT,
        ));
    }

    let config = PlotConfig::fitted_to_data("Angular Frequency vs Mass", series, "Mass (g)", "ω (rad/s)");
    draw_single_plot(&output_file, root_name, "Frequency/Mass", config)
}

// src/plot_functions/plot_frequency_vs_mass.rs
