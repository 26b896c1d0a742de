// src/main.rs

use anyhow::{bail, Context};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pendulum_lab::config::AnalysisConfig;
use pendulum_lab::data_analysis::model_fit::FrequencyMode;
use pendulum_lab::data_analysis::parameter_estimation::PhaseAnchor;
use pendulum_lab::data_input::signal_parser::AngleCorrection;
use pendulum_lab::data_input::trial_catalog::TrialCatalog;
use pendulum_lab::pipeline::BatchAnalysis;
use pendulum_lab::plot_functions::plot_angle_vs_time::plot_angle_vs_time;
use pendulum_lab::plot_functions::plot_frequency_vs_length::plot_frequency_vs_length;
use pendulum_lab::plot_functions::plot_frequency_vs_mass::plot_frequency_vs_mass;
use pendulum_lab::plot_functions::plot_period_squared_vs_length::plot_period_squared_vs_length;
use pendulum_lab::plot_functions::plot_relative_error::plot_relative_error;

/// Analyze pendulum recordings: period, harmonic fit and g from T² vs L.
#[derive(Parser, Debug)]
#[command(name = "pendulum-lab", version = pendulum_lab::crate_version(), about)]
struct Cli {
    /// Trial files named exp{set}_[{mass}_]{length}_{amplitude}.txt
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML file with [loader], [fit] and [catalog] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TOML file holding only a trial catalog (overrides [catalog])
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Fit the angular frequency within ±20% of sqrt(g/L) instead of fixing it
    #[arg(long)]
    free_frequency: bool,

    /// Median-smooth the signal before estimating initial parameters
    #[arg(long)]
    smooth: bool,

    /// first-peak or first-zero-crossing
    #[arg(long)]
    phase_anchor: Option<PhaseAnchor>,

    /// folded-vertical, shifted-radians or raw
    #[arg(long)]
    angle_correction: Option<AngleCorrection>,

    /// Directory for PNG output
    #[arg(short, long, default_value = "plots")]
    output_dir: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    no_plots: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pendulum_lab={default_level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn build_config(cli: &Cli) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(path) = &cli.catalog {
        config.catalog = TrialCatalog::load(path)
            .with_context(|| format!("loading trial catalog {}", path.display()))?;
    }
    if cli.free_frequency {
        config.fit.frequency_mode = FrequencyMode::Free;
    }
    if cli.smooth {
        config.fit.smoothing = true;
    }
    if let Some(anchor) = cli.phase_anchor {
        config.fit.phase_anchor = anchor;
    }
    if let Some(correction) = cli.angle_correction {
        config.loader.angle_correction = correction;
    }
    config.validate()?;
    Ok(config)
}

fn plot_root(output_dir: &Path, name: &str) -> String {
    output_dir.join(name).to_string_lossy().to_string()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    println!(
        "pendulum-lab {}: {} file(s), angle correction {}, frequency {:?}, phase anchor {}, smoothing {}",
        pendulum_lab::crate_version(),
        cli.files.len(),
        config.loader.angle_correction,
        config.fit.frequency_mode,
        config.fit.phase_anchor,
        if config.fit.smoothing { "on" } else { "off" }
    );

    println!("\n--- Analyzing Trials ---");
    let batch = BatchAnalysis::run(&cli.files, &config);

    println!(
        "{:<28} {:>6} {:>10} {:>10} {:>10} {:>10} {:>8} {:>10}",
        "trial", "peaks", "T (s)", "ω (rad/s)", "A", "RMSE", "ω/ω_th", "rel.err"
    );
    for trial in &batch.trials {
        let a = &trial.analysis;
        let fallback = if a.fit.is_fitted() { "" } else { " (initial guess)" };
        println!(
            "{:<28} {:>6} {:>10} {:>10} {:>10.4} {:>10.4} {:>8.4} {:>10}{}",
            a.info.label,
            a.period.peak_count(),
            a.period.period().map(|p| format!("{p:.4}")).unwrap_or_else(|| "-".to_string()),
            a.period
                .angular_frequency()
                .map(|w| format!("{w:.4}"))
                .unwrap_or_else(|| "-".to_string()),
            a.fit.amplitude,
            a.fit.rmse,
            a.fit.frequency_ratio(),
            a.mean_relative_error
                .map(|e| format!("{e:.4}"))
                .unwrap_or_else(|| "-".to_string()),
            fallback
        );
    }

    if !batch.failures.is_empty() {
        println!("\n--- Failed Trials ---");
        for failure in &batch.failures {
            println!("  {}: {}", failure.path.display(), failure.error);
        }
    }

    if batch.trials.is_empty() {
        bail!("no trial could be analyzed ({} failure(s))", batch.failures.len());
    }

    println!("\n--- Gravitational Acceleration (T² vs L) ---");
    for (condition, estimate) in batch.gravity_by_condition() {
        match estimate {
            Ok(g) => println!(
                "  {condition}: g = {:.3} m/s² (R² {:.4}, {} points)",
                g.gravity_m_s2,
                g.r_squared,
                g.points.len()
            ),
            Err(e) => println!("  {condition}: {e}"),
        }
    }
    let pooled: Vec<_> = batch.gravity_pooled().into_iter().collect();
    for (mass, estimate) in &pooled {
        match estimate {
            Ok(g) => println!(
                "  {mass} (all amplitudes): g = {:.3}{} m/s² (R² {:.4})",
                g.gravity_m_s2,
                g.gravity_uncertainty
                    .map(|u| format!(" ± {u:.3}"))
                    .unwrap_or_default(),
                g.r_squared
            ),
            Err(e) => println!("  {mass} (all amplitudes): {e}"),
        }
    }

    if cli.no_plots {
        return Ok(());
    }

    println!("\n--- Generating Plots ---");
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating output directory {}", cli.output_dir.display()))?;
    let render = |what: &str, result: Result<(), Box<dyn std::error::Error>>| {
        if let Err(e) = result {
            eprintln!("  Failed to render {what}: {e}");
        }
    };

    for trial in &batch.trials {
        let root = plot_root(&cli.output_dir, &trial.analysis.info.label);
        render(&trial.analysis.info.label, plot_angle_vs_time(trial, &root));
    }
    let summary_root = plot_root(&cli.output_dir, "summary");
    render(
        "frequency vs length",
        plot_frequency_vs_length(&batch, config.fit.gravity_m_s2, &summary_root),
    );
    render("frequency vs mass", plot_frequency_vs_mass(&batch, &summary_root));
    render(
        "period² vs length",
        plot_period_squared_vs_length(&pooled, &summary_root),
    );
    render("relative error", plot_relative_error(&batch, &summary_root));

    Ok(())
}

// src/main.rs
