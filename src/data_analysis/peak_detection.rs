// src/data_analysis/peak_detection.rs

/// Finds local maxima in a sampled signal.
///
/// Estimators only see this trait, so a different detection rule can be
/// swapped in without touching them.
pub trait PeakDetector {
    /// Indices of detected peaks, in ascending order.
    fn find_peaks(&self, signal: &[f64]) -> Vec<usize>;

    /// Indices of local minima, found as peaks of the negated signal.
    fn find_valleys(&self, signal: &[f64]) -> Vec<usize> {
        let negated: Vec<f64> = signal.iter().map(|v| -v).collect();
        self.find_peaks(&negated)
    }
}

/// Plain local-maximum detection with no height or prominence threshold.
///
/// A sample is a peak when it is strictly greater than its left neighbour and
/// the signal drops after it. A flat top (plateau) reports its middle sample
/// (leftmost of the two middle samples for even-width plateaus).
/// The first and last samples are never peaks. NaN never compares greater, so
/// NaN samples are never reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMaxima;

impl PeakDetector for LocalMaxima {
    fn find_peaks(&self, signal: &[f64]) -> Vec<usize> {
        let n = signal.len();
        let mut peaks = Vec::new();
        if n < 3 {
            return peaks;
        }

        let last = n - 1;
        let mut i = 1;
        while i < last {
            if signal[i - 1] < signal[i] {
                // Walk across a possible plateau.
                let mut ahead = i + 1;
                while ahead < last && signal[ahead] == signal[i] {
                    ahead += 1;
                }
                if signal[ahead] < signal[i] {
                    let left_edge = i;
                    let right_edge = ahead - 1;
                    peaks.push((left_edge + right_edge) / 2);
                    i = ahead;
                }
            }
            i += 1;
        }
        peaks
    }
}

/// Local maxima filtered by topographic prominence.
///
/// Prominence is the height of the peak above the higher of the two lowest
/// points reached before the signal climbs above the peak on either side.
#[derive(Debug, Clone, Copy)]
pub struct ProminencePeaks {
    pub min_prominence: f64,
}

impl ProminencePeaks {
    pub fn new(min_prominence: f64) -> Self {
        Self { min_prominence }
    }
}

/// Prominence of the sample at `peak`.
pub fn peak_prominence(signal: &[f64], peak: usize) -> f64 {
    let height = signal[peak];

    let mut left_min = height;
    for &value in signal[..peak].iter().rev() {
        if value > height {
            break;
        }
        left_min = left_min.min(value);
    }

    let mut right_min = height;
    for &value in &signal[peak + 1..] {
        if value > height {
            break;
        }
        right_min = right_min.min(value);
    }

    height - left_min.max(right_min)
}

impl PeakDetector for ProminencePeaks {
    fn find_peaks(&self, signal: &[f64]) -> Vec<usize> {
        LocalMaxima
            .find_peaks(signal)
            .into_iter()
            .filter(|&peak| peak_prominence(signal, peak) >= self.min_prominence)
            .collect()
    }
}
