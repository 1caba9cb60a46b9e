//! Descriptive statistics over simulated samples

use serde::{Deserialize, Serialize};

/// Summary statistics of a simulated sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleStats {
    /// Arithmetic mean
    pub mean: f64,

    /// Population standard deviation
    pub std_dev: f64,

    /// Smallest value seen
    pub min: f64,

    /// Largest value seen
    pub max: f64,

    /// 50th percentile
    pub median: f64,

    /// 5th percentile
    pub p5: f64,

    /// 95th percentile
    pub p95: f64,
}

impl SampleStats {
    /// Compute statistics; an empty sample yields all zeros
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let sorted = sorted_copy(values);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Self {
            mean,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: percentile_sorted(&sorted, 50.0),
            p5: percentile_sorted(&sorted, 5.0),
            p95: percentile_sorted(&sorted, 95.0),
        }
    }
}

/// Ascending copy of the values (total order, NaN last)
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile (0-100) of an ascending slice with linear interpolation
///
/// Position is `p / 100 * (n - 1)`; an empty slice yields 0.0.
pub fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let weight = rank - lower as f64;
                sorted[lower] * (1.0 - weight) + sorted[upper] * weight
            }
        }
    }
}

/// Percentile of unsorted values
pub fn percentile(values: &[f64], percentile: f64) -> f64 {
    percentile_sorted(&sorted_copy(values), percentile)
}

/// Round to a fixed number of decimal places for display
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}
