// src/data_input/signal_data.rs

use ndarray::Array1;

/// One cleaned row of a pendulum recording.
/// Position and angular velocity are optional: the tracker leaves them blank on some frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSample {
    pub time_sec: f64,                 // Timestamp (in seconds).
    pub angle: f64,                    // Corrected angle (unit depends on the AngleCorrection applied).
    pub angular_velocity: Option<f64>, // rad/s as exported by the tracker.
    pub x: Option<f64>,                // Bob position.
    pub y: Option<f64>,
}

impl SignalSample {
    pub fn new(time_sec: f64, angle: f64) -> Self {
        Self {
            time_sec,
            angle,
            angular_velocity: None,
            x: None,
            y: None,
        }
    }
}

/// Cleaned angle/time trace of a single trial.
///
/// Time is strictly increasing and every angle is finite; constructors drop
/// samples that would break either property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    samples: Vec<SignalSample>,
}

impl TimeSeries {
    /// Builds a series, discarding non-finite samples and samples whose time
    /// does not advance past the previous kept sample.
    pub fn from_samples(samples: impl IntoIterator<Item = SignalSample>) -> Self {
        let mut kept: Vec<SignalSample> = Vec::new();
        for sample in samples {
            if !sample.time_sec.is_finite() || !sample.angle.is_finite() {
                continue;
            }
            if let Some(last) = kept.last() {
                if sample.time_sec <= last.time_sec {
                    continue;
                }
            }
            kept.push(sample);
        }
        Self { samples: kept }
    }

    /// Convenience constructor for synthetic traces.
    pub fn from_time_angle(times: &[f64], angles: &[f64]) -> Self {
        Self::from_samples(
            times
                .iter()
                .zip(angles.iter())
                .map(|(&t, &a)| SignalSample::new(t, a)),
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SignalSample] {
        &self.samples
    }

    pub fn times(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.time_sec).collect()
    }

    pub fn angles(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.angle).collect()
    }

    /// `(time, ω)` for the samples where the tracker exported an angular velocity.
    pub fn angular_velocities(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .filter_map(|s| s.angular_velocity.map(|w| (s.time_sec, w)))
            .collect()
    }

    /// Time span covered by the trace, zero for fewer than two samples.
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time_sec - first.time_sec,
            _ => 0.0,
        }
    }

    /// Copy of the series with every timestamp shifted by `offset_sec`.
    pub fn shifted(&self, offset_sec: f64) -> Self {
        Self::from_samples(self.samples.iter().map(|s| SignalSample {
            time_sec: s.time_sec + offset_sec,
            ..*s
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_drops_non_increasing_and_non_finite() {
        let series = TimeSeries::from_time_angle(
            &[0.0, 0.1, 0.1, 0.05, 0.2, f64::NAN, 0.3],
            &[1.0, 2.0, 3.0, 4.0, f64::NAN, 5.0, 6.0],
        );
        assert_eq!(series.times().to_vec(), vec![0.0, 0.1, 0.3]);
        assert_eq!(series.angles().to_vec(), vec![1.0, 2.0, 6.0]);
    }

    #[test]
    fn test_duration_and_shift() {
        let series = TimeSeries::from_time_angle(&[1.0, 1.5, 3.0], &[0.0, 1.0, 0.0]);
        assert_eq!(series.duration(), 2.0);
        let shifted = series.shifted(10.0);
        assert_eq!(shifted.times().to_vec(), vec![11.0, 11.5, 13.0]);
        assert_eq!(shifted.angles(), series.angles());
        assert_eq!(TimeSeries::default().duration(), 0.0);
    }

    #[test]
    fn test_angular_velocities_skip_blank_frames() {
        let mut with_velocity = SignalSample::new(0.0, 1.0);
        with_velocity.angular_velocity = Some(-0.5);
        let series = TimeSeries::from_samples([
            with_velocity,
            SignalSample::new(0.1, 0.8),
            SignalSample {
                angular_velocity: Some(0.25),
                ..SignalSample::new(0.2, 0.4)
            },
        ]);
        assert_eq!(series.angular_velocities(), vec![(0.0, -0.5), (0.2, 0.25)]);
    }
}

// src/data_input/signal_data.rs
