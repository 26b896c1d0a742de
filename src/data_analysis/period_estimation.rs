// src/data_analysis/period_estimation.rs

use std::f64::consts::PI;

use crate::data_analysis::peak_detection::PeakDetector;
use crate::data_input::signal_data::TimeSeries;

/// Oscillation period derived from successive angle maxima.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodEstimate {
    Defined { period_s: f64, peak_count: usize },
    /// Fewer than two peaks: the trial is skipped, not treated as a failure.
    Undefined { peak_count: usize },
}

impl PeriodEstimate {
    pub fn period(&self) -> Option<f64> {
        match *self {
            PeriodEstimate::Defined { period_s, .. } => Some(period_s),
            PeriodEstimate::Undefined { .. } => None,
        }
    }

    /// Angular frequency `2π / T` in rad/s.
    pub fn angular_frequency(&self) -> Option<f64> {
        self.period().map(|period| 2.0 * PI / period)
    }

    pub fn peak_count(&self) -> usize {
        match *self {
            PeriodEstimate::Defined { peak_count, .. } | PeriodEstimate::Undefined { peak_count } => {
                peak_count
            }
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, PeriodEstimate::Defined { .. })
    }
}

/// Mean interval between consecutive peaks of `angles`.
pub fn estimate_period_from(times: &[f64], angles: &[f64], detector: &dyn PeakDetector) -> PeriodEstimate {
    let n = times.len().min(angles.len());
    let peaks = detector.find_peaks(&angles[..n]);
    let peak_count = peaks.len();
    if peak_count < 2 {
        return PeriodEstimate::Undefined { peak_count };
    }

    let intervals: Vec<f64> = peaks
        .windows(2)
        .map(|pair| times[pair[1]] - times[pair[0]])
        .collect();
    let period_s = intervals.iter().sum::<f64>() / intervals.len() as f64;

    PeriodEstimate::Defined {
        period_s,
        peak_count,
    }
}

pub fn estimate_period(series: &TimeSeries, detector: &dyn PeakDetector) -> PeriodEstimate {
    let times = series.times().to_vec();
    let angles = series.angles().to_vec();
    estimate_period_from(&times, &angles, detector)
}
