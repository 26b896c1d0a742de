// src/data_input/signal_parser.rs

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::constants::{
    COLUMN_ANGLE, COLUMN_ANGULAR_VELOCITY, COLUMN_TIME, COLUMN_X, COLUMN_Y, EXPECTED_COLUMN_COUNT,
    REST_ANGLE_OFFSET_DEG, ROLLING_MEDIAN_WINDOW,
};
use crate::data_analysis::smoothing::{centered_offset, rolling_median};
use crate::data_input::signal_data::{SignalSample, TimeSeries};
use crate::error::{PendulumError, Result};

/// Angle convention applied to the raw tracker column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AngleCorrection {
    /// `|angle| - 90`: the tracker reports the rest position as 90 degrees.
    #[default]
    FoldedVertical,
    /// `angle + 90` in radians, then a centered rolling median (window 5).
    /// Samples at the edges without a full window are dropped.
    ShiftedRadians,
    /// Angle column used as recorded.
    Raw,
}

impl fmt::Display for AngleCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AngleCorrection::FoldedVertical => "folded-vertical",
            AngleCorrection::ShiftedRadians => "shifted-radians",
            AngleCorrection::Raw => "raw",
        };
        f.write_str(name)
    }
}

impl FromStr for AngleCorrection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "folded-vertical" | "folded" => Ok(AngleCorrection::FoldedVertical),
            "shifted-radians" | "shifted" => Ok(AngleCorrection::ShiftedRadians),
            "raw" | "none" => Ok(AngleCorrection::Raw),
            other => Err(format!(
                "unknown angle correction '{other}' (expected folded-vertical, shifted-radians or raw)"
            )),
        }
    }
}

/// One parsed row before cleaning. Every column may be missing.
#[derive(Debug, Default, Clone, Copy)]
struct RawRow {
    time_sec: Option<f64>,
    x: Option<f64>,
    y: Option<f64>,
    angle_deg: Option<f64>,
    angular_velocity: Option<f64>,
}

fn parse_number(field: Option<&str>) -> Option<f64> {
    field
        .and_then(|val_str| val_str.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Reads and cleans one recording from disk.
///
/// A missing or unreadable file is reported as a data format error so the
/// batch can treat it like any other malformed trial.
pub fn load_signal_file(input_file_path: &Path, correction: AngleCorrection) -> Result<TimeSeries> {
    let source_name = input_file_path.display().to_string();
    let text = fs::read_to_string(input_file_path)
        .map_err(|e| PendulumError::data_format(&source_name, format!("cannot read file: {e}")))?;
    parse_signal_text(&text, &source_name, correction)
}

/// Parses the `t x y theta omega` text format.
///
/// The first line is a header and is ignored. Comma decimal separators are
/// normalized to dots, whitespace runs become single delimiters, and each field
/// that fails to parse is treated as missing. Rows without a usable time or
/// angle are dropped.
pub fn parse_signal_text(text: &str, source_name: &str, correction: AngleCorrection) -> Result<TimeSeries> {
    let normalized = text.replace(',', ".");
    let mut lines = normalized.lines();

    if lines.next().is_none() {
        return Err(PendulumError::data_format(source_name, "empty file (missing header line)"));
    }

    // Line numbers are kept so warnings point at the file, not the filtered buffer.
    let mut line_numbers: Vec<usize> = Vec::new();
    let mut csv_lines: Vec<String> = Vec::new();
    for (index, line) in lines.enumerate() {
        let trimmed_line = line.trim();
        if trimmed_line.is_empty() {
            continue;
        }
        csv_lines.push(trimmed_line.split_whitespace().collect::<Vec<_>>().join("\t"));
        line_numbers.push(index + 2);
    }
    let csv_content = csv_lines.join("\n");

    let mut raw_rows: Vec<RawRow> = Vec::with_capacity(csv_lines.len());
    {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(csv_content.as_bytes());

        for (row_index, result) in reader.records().enumerate() {
            let line_number = line_numbers.get(row_index).copied().unwrap_or(row_index + 2);
            let record = result.map_err(|e| {
                PendulumError::data_format(source_name, format!("line {line_number}: {e}"))
            })?;
            if record.len() != EXPECTED_COLUMN_COUNT {
                return Err(PendulumError::data_format(
                    source_name,
                    format!(
                        "line {line_number}: expected {EXPECTED_COLUMN_COUNT} columns (t x y theta omega), found {}",
                        record.len()
                    ),
                ));
            }
            raw_rows.push(RawRow {
                time_sec: parse_number(record.get(COLUMN_TIME)),
                x: parse_number(record.get(COLUMN_X)),
                y: parse_number(record.get(COLUMN_Y)),
                angle_deg: parse_number(record.get(COLUMN_ANGLE)),
                angular_velocity: parse_number(record.get(COLUMN_ANGULAR_VELOCITY)),
            });
        }
    }

    let total_rows = raw_rows.len();
    let mut samples: Vec<SignalSample> = Vec::with_capacity(total_rows);
    let mut missing_angle = 0usize;
    for (row_index, row) in raw_rows.iter().enumerate() {
        let corrected = row.angle_deg.map(|angle| match correction {
            AngleCorrection::FoldedVertical => angle.abs() - REST_ANGLE_OFFSET_DEG,
            AngleCorrection::ShiftedRadians => (angle + REST_ANGLE_OFFSET_DEG).to_radians(),
            AngleCorrection::Raw => angle,
        });
        let Some(angle) = corrected else {
            missing_angle += 1;
            continue;
        };
        let Some(time_sec) = row.time_sec else {
            tracing::warn!(
                "{}: skipping row {} due to missing or invalid time",
                source_name,
                row_index + 1
            );
            continue;
        };
        if let Some(previous) = samples.last() {
            if time_sec <= previous.time_sec {
                tracing::warn!(
                    "{}: skipping row {} (time {} does not advance past {})",
                    source_name,
                    row_index + 1,
                    time_sec,
                    previous.time_sec
                );
                continue;
            }
        }
        samples.push(SignalSample {
            time_sec,
            angle,
            angular_velocity: row.angular_velocity,
            x: row.x,
            y: row.y,
        });
    }

    if missing_angle > 0 {
        tracing::debug!("{}: dropped {} rows without an angle", source_name, missing_angle);
    }

    if correction == AngleCorrection::ShiftedRadians {
        let angles: Vec<f64> = samples.iter().map(|s| s.angle).collect();
        let smoothed = rolling_median(&angles, ROLLING_MEDIAN_WINDOW);
        let offset = centered_offset(ROLLING_MEDIAN_WINDOW);
        samples = samples
            .iter()
            .skip(offset)
            .zip(smoothed)
            .map(|(sample, angle)| SignalSample { angle, ..*sample })
            .collect();
    }

    tracing::debug!(
        "{}: kept {} of {} data rows ({})",
        source_name,
        samples.len(),
        total_rows,
        correction
    );

    Ok(TimeSeries::from_samples(samples))
}


// src/data_input/signal_parser.rs
