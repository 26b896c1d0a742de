// src/plot_functions/plot_angle_vs_time.rs

use std::error::Error;

use crate::constants::{
    COLOR_ANGULAR_VELOCITY, COLOR_MEASURED, COLOR_MODEL, COLOR_RESIDUAL, COLOR_ZERO_LINE,
    LINE_WIDTH_PLOT,
};
use crate::data_analysis::fit_quality::residuals;
use crate::pipeline::AnalyzedTrial;
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};

/// Measured angle with the fitted model on top, residuals in the middle and the
/// tracker's angular velocity at the bottom.
pub fn plot_angle_vs_time(trial: &AnalyzedTrial, root_name: &str) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_AngleVsTime_stacked.png");
    let plot_type_name = "Angle/Model";
    let analysis = &trial.analysis;
    let fit = &analysis.fit;

    let times = trial.series.times().to_vec();
    let angles = trial.series.angles().to_vec();
    let measured: Vec<(f64, f64)> = times.iter().copied().zip(angles.iter().copied()).collect();
    let model: Vec<(f64, f64)> = times.iter().map(|&t| (t, fit.evaluate(t))).collect();
    let residual_data: Vec<(f64, f64)> = times
        .iter()
        .copied()
        .zip(residuals(&times, &angles, fit))
        .collect();
    let velocity = trial.series.angular_velocities();
    let zero_line = match (times.first(), times.last()) {
        (Some(&start), Some(&end)) => vec![(start, 0.0), (end, 0.0)],
        _ => Vec::new(),
    };

    let model_label = format!(
        "Model A={:.3} ω={:.3} rad/s φ={:.3} ({:?})",
        fit.amplitude, fit.angular_frequency, fit.phase, fit.status
    );
    let residual_title = format!("Residuals (RMSE {:.4})", fit.rmse);

    draw_stacked_plot(
        &output_file,
        &analysis.info.label,
        plot_type_name,
        &["Angle", "Residual", "Angular Velocity"],
        move |panel_index| match panel_index {
            0 => PlotConfig::fitted_to_data(
                "Angle vs Time",
                vec![
                    PlotSeries::line(measured.clone(), "Measured", *COLOR_MEASURED, LINE_WIDTH_PLOT),
                    PlotSeries::line(model.clone(), model_label.clone(), *COLOR_MODEL, LINE_WIDTH_PLOT),
                ],
                "Time (s)",
                "Angle",
            ),
            1 => PlotConfig::fitted_to_data(
                residual_title.clone(),
                vec![
                    PlotSeries::line(zero_line.clone(), "", *COLOR_ZERO_LINE, 1),
                    PlotSeries::line(residual_data.clone(), "Measured - Model", *COLOR_RESIDUAL, LINE_WIDTH_PLOT),
                ],
                "Time (s)",
                "Residual",
            ),
            2 => PlotConfig::fitted_to_data(
                "Tracker Angular Velocity",
                vec![PlotSeries::line(velocity.clone(), "ω (tracker)", *COLOR_ANGULAR_VELOCITY, LINE_WIDTH_PLOT)],
                "Time (s)",
                "ω (rad/s)",
            ),
            _ => None,
        },
    )
}

// src/plot_functions/plot_angle_vs_time.rs
