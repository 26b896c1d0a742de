// tests/pipeline_integration_test.rs

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use pendulum_lab::config::AnalysisConfig;
use pendulum_lab::data_analysis::model_fit::FrequencyMode;
use pendulum_lab::data_input::trial_catalog::AmplitudeBucket;
use pendulum_lab::pipeline::{BatchAnalysis, ConditionKey};
use pendulum_lab::PendulumError;

const G: f64 = 9.81;

/// Writes a tracker-style recording of a `length_m` pendulum swinging for `duration` s.
fn write_trial(dir: &Path, name: &str, length_m: f64, amplitude_deg: f64, duration: f64) -> PathBuf {
    let omega = (G / length_m).sqrt();
    let dt = 1.0 / 240.0;
    let mut text = String::from("t x y theta omega\n");
    let n = (duration / dt) as usize;
    for i in 0..n {
        let t = i as f64 * dt;
        let theta = amplitude_deg * (omega * t + 0.3).sin();
        let row = format!(
            "{t:.5} {:.4} {:.4} {:.5} {:.5}\n",
            length_m * theta.to_radians().sin(),
            -length_m * theta.to_radians().cos(),
            90.0 + theta,
            amplitude_deg.to_radians() * omega * (omega * t + 0.3).cos()
        );
        text.push_str(&row.replace('.', ","));
    }
    let path = dir.join(format!("{name}.txt"));
    fs::write(&path, text).unwrap();
    path
}

fn lab_files(dir: &Path) -> Vec<PathBuf> {
    vec![
        write_trial(dir, "exp2_L1_chico", 0.305, 8.0, 8.0),
        write_trial(dir, "exp2_L2_chico", 0.215, 8.0, 8.0),
        write_trial(dir, "exp2_L3_chico", 0.27, 8.0, 8.0),
        write_trial(dir, "exp2_L5_chico", 0.115, 8.0, 8.0),
        write_trial(dir, "exp2_L1_grande", 0.305, 25.0, 8.0),
    ]
}

#[test]
fn batch_recovers_gravity_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = lab_files(dir.path());
    let batch = BatchAnalysis::run(&files, &AnalysisConfig::default());

    assert!(batch.failures.is_empty(), "{:?}", batch.failures);
    assert_eq!(batch.trials.len(), 5);
    for trial in &batch.trials {
        assert!(trial.analysis.fit.is_fitted(), "{}", trial.analysis.info.label);
        assert_eq!(trial.analysis.info.mass_label, "bola4");
    }

    let key = ConditionKey {
        mass_label: "bola4".to_string(),
        amplitude: AmplitudeBucket::Small,
    };
    let estimate = batch.gravity_by_condition().remove(&key).unwrap().unwrap();
    assert!((estimate.gravity_m_s2 - G).abs() / G < 0.01, "g = {}", estimate.gravity_m_s2);
    assert!(estimate.r_squared > 0.999);

    let large = ConditionKey {
        mass_label: "bola4".to_string(),
        amplitude: AmplitudeBucket::Large,
    };
    assert!(matches!(
        batch.gravity_by_condition().remove(&large),
        Some(Err(PendulumError::RegressionDegenerate { .. }))
    ));
}

#[test]
fn single_peak_trial_is_skipped_without_failing_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = lab_files(dir.path());
    files.push(write_trial(dir.path(), "exp2_L4_chico", 0.205, 8.0, 0.35));

    let batch = BatchAnalysis::run(&files, &AnalysisConfig::default());
    assert_eq!(batch.trials.len(), 6);
    let short = batch
        .trials
        .iter()
        .find(|t| t.analysis.info.length_label == "L4")
        .unwrap();
    assert!(!short.analysis.period.is_defined());

    let table = batch.frequency_vs_length();
    let key = ConditionKey {
        mass_label: "bola4".to_string(),
        amplitude: AmplitudeBucket::Small,
    };
    assert_eq!(table[&key].len(), 4);
    assert!(table[&key].iter().all(|p| p.label != "L4"));
    let expected = 2.0 * PI / (2.0 * PI * (0.115 / G).sqrt());
    assert!((table[&key][0].angular_frequency - expected).abs() / expected < 0.01);
}

#[test]
fn per_trial_failures_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = lab_files(dir.path());
    files.push(write_trial(dir.path(), "exp2_L9_chico", 0.4, 8.0, 4.0));
    files.push(write_trial(dir.path(), "exp1_oro_L1_chico", 0.305, 8.0, 4.0));
    let broken = dir.path().join("exp2_L3_mediano.txt");
    fs::write(&broken, "t x y theta omega\n0,0 1,0 2,0\n").unwrap();
    files.push(broken);
    files.push(dir.path().join("exp2_L1_mini.txt"));

    let batch = BatchAnalysis::run(&files, &AnalysisConfig::default());
    assert_eq!(batch.trials.len(), 5);
    assert_eq!(batch.failures.len(), 4);
    assert!(batch.failures.iter().all(|f| f.error.is_per_trial()));
    assert!(matches!(
        batch.failures[0].error,
        PendulumError::UnknownLabel { kind: "length", .. }
    ));
    assert!(matches!(
        batch.failures[1].error,
        PendulumError::UnknownLabel { kind: "mass", .. }
    ));
    assert!(matches!(batch.failures[2].error, PendulumError::DataFormat { .. }));
}

#[test]
fn config_file_drives_the_fit() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pendulum.toml");
    fs::write(
        &config_path,
        r#"
            [fit]
            frequency_mode = "free"
            smoothing = true
            phase_anchor = "first-zero-crossing"

            [catalog]
            default_mass = "bola4"

            [catalog.lengths.L1]
            value = 0.305
            uncertainty = 0.001

            [catalog.masses.bola4]
            measurements = [22.06, 22.03, 22.08, 22.05]
        "#,
    )
    .unwrap();
    let config = AnalysisConfig::load(&config_path).unwrap();
    assert_eq!(config.fit.frequency_mode, FrequencyMode::Free);

    let files = vec![
        write_trial(dir.path(), "exp3_L1_chico", 0.305, 10.0, 6.0),
        write_trial(dir.path(), "exp3_L2_chico", 0.215, 10.0, 6.0),
    ];
    let batch = BatchAnalysis::run(&files, &config);
    assert_eq!(batch.trials.len(), 1);
    assert_eq!(batch.failures.len(), 1);

    let fit = &batch.trials[0].analysis.fit;
    assert!(fit.is_fitted());
    assert!((fit.frequency_ratio() - 1.0).abs() < 1e-3);
    assert!((fit.amplitude - 10.0).abs() < 0.05);
}
