// tests/signal_format_test.rs

use std::fs;

use pendulum_lab::data_input::signal_parser::{load_signal_file, parse_signal_text, AngleCorrection};
use pendulum_lab::PendulumError;

fn recording(decimal: char) -> String {
    let mut text = String::from("t\tx\ty\ttheta\tomega\n");
    for i in 0..200 {
        let t = i as f64 * 0.01;
        let theta = 90.0 + 12.5 * (5.67 * t).sin();
        let row = format!("{t:.3}\t0.125\t-0.300\t{theta:.4}\t{:.4}\n", 1.5 * (5.67 * t).cos());
        text.push_str(&if decimal == ',' { row.replace('.', ",") } else { row });
    }
    text
}

#[test]
fn comma_and_dot_decimals_parse_identically() {
    for correction in [AngleCorrection::FoldedVertical, AngleCorrection::ShiftedRadians, AngleCorrection::Raw] {
        let dot = parse_signal_text(&recording('.'), "dot.txt", correction).unwrap();
        let comma = parse_signal_text(&recording(','), "comma.txt", correction).unwrap();
        assert_eq!(dot.len(), comma.len());
        assert_eq!(dot.times(), comma.times());
        assert_eq!(dot.angles(), comma.angles());
    }
}

#[test]
fn folded_angles_are_centered_on_rest() {
    let series = parse_signal_text(&recording('.'), "dot.txt", AngleCorrection::FoldedVertical).unwrap();
    assert_eq!(series.len(), 200);
    let max = series.angles().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = series.angles().iter().cloned().fold(f64::INFINITY, f64::min);
    assert!((max - 12.5).abs() < 0.05, "max {max}");
    assert!((min + 12.5).abs() < 0.05, "min {min}");
}

#[test]
fn shifted_radians_drop_edge_samples() {
    let series = parse_signal_text(&recording('.'), "dot.txt", AngleCorrection::ShiftedRadians).unwrap();
    assert_eq!(series.len(), 196);
    assert!((series.samples()[0].time_sec - 0.02).abs() < 1e-12);
}

#[test]
fn files_with_wrong_column_count_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exp1_plat_L1_chico.txt");
    fs::write(&path, "t x y theta\n0,0 0,1 0,2 95,0\n").unwrap();
    let err = load_signal_file(&path, AngleCorrection::FoldedVertical).unwrap_err();
    assert!(matches!(err, PendulumError::DataFormat { .. }));
    assert!(err.to_string().contains("line 2"));

    let missing = dir.path().join("missing.txt");
    assert!(matches!(
        load_signal_file(&missing, AngleCorrection::Raw),
        Err(PendulumError::DataFormat { .. })
    ));
}
