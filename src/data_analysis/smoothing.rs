// src/data_analysis/smoothing.rs

/// Index offset between an input sample and the first full centered window.
pub fn centered_offset(window_size: usize) -> usize {
    window_size / 2
}

/// Centered rolling median over full windows only.
///
/// Output element `k` is the median of `values[k..k + window_size]` and lines up
/// with input index `k + centered_offset(window_size)`. Edge samples whose
/// window would be incomplete produce no output, so the result holds
/// `len - window_size + 1` values (empty when the input is shorter than the window).
/// A window of 0 or 1 returns the input unchanged.
pub fn rolling_median(values: &[f64], window_size: usize) -> Vec<f64> {
    if window_size <= 1 {
        return values.to_vec();
    }
    if values.len() < window_size {
        return Vec::new();
    }

    let mut scratch: Vec<f64> = Vec::with_capacity(window_size);
    values
        .windows(window_size)
        .map(|window| {
            scratch.clear();
            scratch.extend_from_slice(window);
            scratch.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = window_size / 2;
            if window_size % 2 == 1 {
                scratch[mid]
            } else {
                0.5 * (scratch[mid - 1] + scratch[mid])
            }
        })
        .collect()
}

/// Applies `rolling_median` and trims `times` to the samples that kept a value.
pub fn rolling_median_aligned(times: &[f64], values: &[f64], window_size: usize) -> (Vec<f64>, Vec<f64>) {
    let smoothed = rolling_median(values, window_size);
    let offset = if window_size <= 1 { 0 } else { centered_offset(window_size) };
    let aligned_times = times
        .iter()
        .skip(offset)
        .take(smoothed.len())
        .copied()
        .collect();
    (aligned_times, smoothed)
}
