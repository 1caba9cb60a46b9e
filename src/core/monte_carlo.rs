//! Monte Carlo engine - propagates process and formula uncertainty around a baseline
//!
//! Each outcome is `baseline × (1 + process_noise + formula_noise)` where
//! process noise is Gaussian (continuous drift) and formula noise is
//! triangular around zero (bounded recipe deviation, most likely nominal).
//! The correlated variant draws jointly-normal deviations for several
//! parameters from a correlation matrix.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::core::error::{PredictError, Result};
use crate::core::rng::SimRng;
use crate::core::stats::SampleStats;
use crate::core::variability::VariabilityProfile;

/// Scale turning a correlation matrix into the covariance of relative deviations
pub const CORRELATED_VARIABILITY: f64 = 0.05;

/// Tolerance for the symmetry and positive-semi-definite checks
const MATRIX_TOLERANCE: f64 = 1e-9;

/// Accepted range of iteration counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for IterationBounds {
    fn default() -> Self {
        Self {
            min: 1_000,
            max: 50_000,
        }
    }
}

impl IterationBounds {
    /// Reject iteration counts outside the bounds (never clamps)
    pub fn check(&self, iterations: u32) -> Result<()> {
        if iterations < self.min || iterations > self.max {
            return Err(PredictError::invalid(format!(
                "iteration count {} outside allowed range {}..={}",
                iterations, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Simulated outcomes for one test, fixed once generated
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSample(Vec<f64>);

impl SimulatedSample {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

impl AsRef<[f64]> for SimulatedSample {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Jointly simulated parameters: one row per iteration, one column per parameter
#[derive(Debug, Clone)]
pub struct CorrelatedSample {
    names: Vec<String>,
    values: DMatrix<f64>,
}

impl CorrelatedSample {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Raw sample matrix (iterations × parameters)
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn iterations(&self) -> usize {
        self.values.nrows()
    }

    /// Simulated values of one parameter
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.values.column(idx).iter().copied().collect())
    }

    /// Summary statistics per parameter, in input order
    pub fn stats(&self) -> Vec<(String, SampleStats)> {
        self.names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let col: Vec<f64> = self.values.column(j).iter().copied().collect();
                (name.clone(), SampleStats::from_values(&col))
            })
            .collect()
    }

    /// Pearson correlation of the simulated columns
    ///
    /// A column with zero spread correlates 0 with the others and 1 with itself.
    pub fn empirical_correlation(&self) -> DMatrix<f64> {
        let n = self.values.ncols();
        let rows = self.values.nrows().max(1) as f64;
        let means: Vec<f64> = (0..n).map(|j| self.values.column(j).sum() / rows).collect();

        let mut cov = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let c = self
                    .values
                    .column(i)
                    .iter()
                    .zip(self.values.column(j).iter())
                    .map(|(a, b)| (a - means[i]) * (b - means[j]))
                    .sum::<f64>()
                    / rows;
                cov[(i, j)] = c;
                cov[(j, i)] = c;
            }
        }

        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                return 1.0;
            }
            let denom = (cov[(i, i)] * cov[(j, j)]).sqrt();
            if denom > 0.0 {
                cov[(i, j)] / denom
            } else {
                0.0
            }
        })
    }
}

/// Stochastic simulation of test outcomes
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEngine {
    bounds: IterationBounds,
}

impl MonteCarloEngine {
    pub fn new(bounds: IterationBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> IterationBounds {
        self.bounds
    }

    /// Simulate outcomes around a baseline and summarize them
    ///
    /// Identical arguments reproduce bit-identical samples: process noise is
    /// drawn from stream 0 of `seed` and formula noise from stream 1.
    pub fn simulate(
        &self,
        baseline: f64,
        process: &VariabilityProfile,
        formula: &VariabilityProfile,
        iterations: u32,
        seed: u64,
    ) -> Result<(SimulatedSample, SampleStats)> {
        self.bounds.check(iterations)?;
        if !baseline.is_finite() {
            return Err(PredictError::invalid(format!(
                "baseline must be finite, got {}",
                baseline
            )));
        }
        let process_scale = checked_magnitude("process", process.overall())?;
        let formula_half_width = checked_magnitude("formula", formula.overall())?;

        let root = SimRng::new(seed);
        let n = iterations as usize;

        let mut process_rng = root.stream(0);
        let process_noise: Vec<f64> = (0..n)
            .map(|_| process_rng.normal(0.0, process_scale))
            .collect();

        let mut formula_rng = root.stream(1);
        let formula_noise: Vec<f64> = (0..n)
            .map(|_| formula_rng.triangular(-formula_half_width, 0.0, formula_half_width))
            .collect();

        let values: Vec<f64> = process_noise
            .iter()
            .zip(&formula_noise)
            .map(|(p, f)| baseline * (1.0 + p + f))
            .collect();

        let stats = SampleStats::from_values(&values);
        Ok((SimulatedSample(values), stats))
    }

    /// Jointly simulate correlated parameters around their baselines
    ///
    /// Deviations are multivariate normal with covariance
    /// `correlation × CORRELATED_VARIABILITY`; each value is
    /// `baseline × (1 + deviation)`. The matrix must be square, match the
    /// parameter count, and be symmetric positive semi-definite.
    pub fn simulate_correlated_parameters(
        &self,
        parameters: &[(String, f64)],
        correlation: &DMatrix<f64>,
        iterations: u32,
        seed: u64,
    ) -> Result<CorrelatedSample> {
        self.bounds.check(iterations)?;
        let n = parameters.len();
        if n == 0 {
            return Err(PredictError::invalid("no parameters to simulate"));
        }
        if let Some((name, value)) = parameters.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PredictError::invalid(format!(
                "baseline of '{}' must be finite, got {}",
                name, value
            )));
        }
        let factor = covariance_factor(correlation, n)?;

        let mut rng = SimRng::new(seed);
        let baselines = DVector::from_iterator(n, parameters.iter().map(|(_, v)| *v));
        let mut values = DMatrix::<f64>::zeros(iterations as usize, n);

        for i in 0..iterations as usize {
            let z = DVector::from_fn(n, |_, _| rng.standard_normal());
            let deviation = &factor * z;
            for j in 0..n {
                values[(i, j)] = baselines[j] * (1.0 + deviation[j]);
            }
        }

        Ok(CorrelatedSample {
            names: parameters.iter().map(|(name, _)| name.clone()).collect(),
            values,
        })
    }
}

fn checked_magnitude(label: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(PredictError::invalid(format!(
            "{} variability must be a non-negative number, got {}",
            label, value
        )));
    }
    Ok(value)
}

/// Validate the correlation matrix and return `L` with `L·Lᵀ = covariance`
///
/// Uses a symmetric eigendecomposition so semi-definite (singular) matrices
/// factor as well as definite ones.
fn covariance_factor(correlation: &DMatrix<f64>, n: usize) -> Result<DMatrix<f64>> {
    if correlation.nrows() != n || correlation.ncols() != n {
        return Err(PredictError::invalid(format!(
            "correlation matrix is {}x{}, expected {}x{} for {} parameters",
            correlation.nrows(),
            correlation.ncols(),
            n,
            n,
            n
        )));
    }
    if correlation.iter().any(|v| !v.is_finite()) {
        return Err(PredictError::invalid(
            "correlation matrix contains non-finite entries",
        ));
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (correlation[(i, j)] - correlation[(j, i)]).abs() > MATRIX_TOLERANCE {
                return Err(PredictError::invalid(format!(
                    "correlation matrix is not symmetric at ({}, {}): {} vs {}",
                    i,
                    j,
                    correlation[(i, j)],
                    correlation[(j, i)]
                )));
            }
        }
    }

    let covariance = correlation * CORRELATED_VARIABILITY;
    let eigen = covariance.symmetric_eigen();
    let smallest = eigen
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    if smallest < -MATRIX_TOLERANCE {
        return Err(PredictError::invalid(format!(
            "correlation matrix is not positive semi-definite (eigenvalue {:.3e})",
            smallest / CORRELATED_VARIABILITY
        )));
    }

    let roots = eigen.eigenvalues.map(|l| l.max(0.0).sqrt());
    Ok(&eigen.eigenvectors * DMatrix::from_diagonal(&roots))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles(process: f64, formula: f64) -> (VariabilityProfile, VariabilityProfile) {
        (
            VariabilityProfile::overall_only(process),
            VariabilityProfile::overall_only(formula),
        )
    }

    #[test]
    fn test_iteration_bounds() {
        let bounds = IterationBounds::default();
        assert!(bounds.check(1_000).is_ok());
        assert!(bounds.check(50_000).is_ok());
        assert!(matches!(bounds.check(999), Err(PredictError::InvalidInput(_))));
        assert!(matches!(bounds.check(50_001), Err(PredictError::InvalidInput(_))));
    }

    #[test]
    fn test_sample_size_matches_iterations() {
        let (p, f) = profiles(0.04, 0.03);
        let (sample, _) = MonteCarloEngine::default()
            .simulate(26.4, &p, &f, 1_234, 42)
            .unwrap();
        assert_eq!(sample.len(), 1_234);
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let (p, f) = profiles(0.04, 0.03);
        let engine = MonteCarloEngine::default();
        let (a, stats_a) = engine.simulate(26.4, &p, &f, 5_000, 42).unwrap();
        let (b, stats_b) = engine.simulate(26.4, &p, &f, 5_000, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(stats_a, stats_b);

        let (c, _) = engine.simulate(26.4, &p, &f, 5_000, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_simulation_statistics_reasonable() {
        let (p, f) = profiles(0.04, 0.03);
        let (_, stats) = MonteCarloEngine::default()
            .simulate(26.4, &p, &f, 20_000, 7)
            .unwrap();
        // sd of combined relative noise: sqrt(0.04² + 0.03²/6) ≈ 0.0418
        assert!((stats.mean - 26.4).abs() < 0.05, "mean {}", stats.mean);
        assert!((stats.std_dev - 26.4 * 0.0418).abs() < 0.05, "std {}", stats.std_dev);
        assert!(stats.min <= stats.p5 && stats.p5 <= stats.median);
        assert!(stats.median <= stats.p95 && stats.p95 <= stats.max);
    }

    #[test]
    fn test_zero_variability_reproduces_baseline() {
        let (p, f) = profiles(0.0, 0.0);
        let (sample, stats) = MonteCarloEngine::default()
            .simulate(12.5, &p, &f, 1_000, 1)
            .unwrap();
        assert!(sample.values().iter().all(|v| *v == 12.5));
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_formula_noise_is_bounded() {
        let (p, f) = profiles(0.0, 0.05);
        let (sample, _) = MonteCarloEngine::default()
            .simulate(100.0, &p, &f, 10_000, 3)
            .unwrap();
        assert!(sample
            .values()
            .iter()
            .all(|v| *v >= 95.0 - 1e-9 && *v <= 105.0 + 1e-9));
    }

    #[test]
    fn test_invalid_simulation_inputs() {
        let engine = MonteCarloEngine::default();
        let (p, f) = profiles(0.04, 0.03);
        assert!(engine.simulate(f64::NAN, &p, &f, 1_000, 1).is_err());
        assert!(engine.simulate(10.0, &p, &f, 10, 1).is_err());

        let (bad_p, f) = profiles(-0.01, 0.03);
        assert!(engine.simulate(10.0, &bad_p, &f, 1_000, 1).is_err());
    }

    fn params(values: &[f64]) -> Vec<(String, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("p{}", i), *v))
            .collect()
    }

    #[test]
    fn test_correlated_sample_shape_and_correlation() {
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.8, 0.8, 1.0]);
        let sample = MonteCarloEngine::default()
            .simulate_correlated_parameters(&params(&[75.0, 45.0]), &corr, 10_000, 42)
            .unwrap();
        assert_eq!(sample.matrix().nrows(), 10_000);
        assert_eq!(sample.matrix().ncols(), 2);

        let empirical = sample.empirical_correlation();
        assert!((empirical[(0, 1)] - 0.8).abs() < 0.05, "{}", empirical[(0, 1)]);

        let stats = sample.stats();
        assert!((stats[0].1.mean - 75.0).abs() < 0.5);
        // relative sd = sqrt(0.05) for unit diagonal
        assert!((stats[0].1.std_dev / 75.0 - 0.05_f64.sqrt()).abs() < 0.01);
    }

    #[test]
    fn test_correlated_is_deterministic() {
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let engine = MonteCarloEngine::default();
        let a = engine
            .simulate_correlated_parameters(&params(&[1.0, 2.0]), &corr, 1_000, 9)
            .unwrap();
        let b = engine
            .simulate_correlated_parameters(&params(&[1.0, 2.0]), &corr, 1_000, 9)
            .unwrap();
        assert_eq!(a.matrix(), b.matrix());
    }

    #[test]
    fn test_correlated_accepts_singular_psd() {
        // perfectly correlated: PSD but not PD
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let sample = MonteCarloEngine::default()
            .simulate_correlated_parameters(&params(&[10.0, 10.0]), &corr, 1_000, 5)
            .unwrap();
        let a = sample.column("p0").unwrap();
        let b = sample.column("p1").unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_correlated_rejects_asymmetric() {
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.2, 1.0]);
        let result = MonteCarloEngine::default().simulate_correlated_parameters(
            &params(&[1.0, 1.0]),
            &corr,
            1_000,
            1,
        );
        assert!(matches!(result, Err(PredictError::InvalidInput(_))));
    }

    #[test]
    fn test_correlated_rejects_indefinite() {
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let result = MonteCarloEngine::default().simulate_correlated_parameters(
            &params(&[1.0, 1.0]),
            &corr,
            1_000,
            1,
        );
        assert!(matches!(result, Err(PredictError::InvalidInput(msg)) if msg.contains("semi-definite")));
    }

    #[test]
    fn test_correlated_rejects_wrong_shape() {
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let result = MonteCarloEngine::default().simulate_correlated_parameters(
            &params(&[1.0, 1.0, 1.0]),
            &corr,
            1_000,
            1,
        );
        assert!(result.is_err());
    }
}
