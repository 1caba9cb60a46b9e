//! Risk evaluation - probability of fail, confidence interval and verdict class

use crate::core::error::{PredictError, Result};
use crate::core::stats::{percentile_sorted, sorted_copy};
use crate::entities::{LimitType, TestStatus};

/// Probability of fail above which a test is classified FAIL
pub const FAIL_THRESHOLD: f64 = 0.20;

/// Probability of fail above which a test is classified WARNING
pub const WARNING_THRESHOLD: f64 = 0.10;

/// Default two-sided confidence level
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Fraction of outcomes strictly past the limit; an empty sample yields 0.0
pub fn probability_of_fail(sample: &[f64], spec_limit: f64, limit_type: LimitType) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let failures = sample
        .iter()
        .filter(|v| limit_type.is_violated(**v, spec_limit))
        .count();
    failures as f64 / sample.len() as f64
}

/// Probability of fail for an optional limit; tests without a limit cannot fail
pub fn probability_of_fail_opt(
    sample: &[f64],
    spec_limit: Option<f64>,
    limit_type: LimitType,
) -> f64 {
    spec_limit
        .map(|limit| probability_of_fail(sample, limit, limit_type))
        .unwrap_or(0.0)
}

/// Reject confidence levels outside (0, 1)
pub fn check_confidence_level(confidence_level: f64) -> Result<()> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(PredictError::invalid(format!(
            "confidence level must be in (0, 1), got {}",
            confidence_level
        )));
    }
    Ok(())
}

/// Interval spanning the (α/2, 1 − α/2) percentiles, α = 1 − level
///
/// An empty sample yields `[0.0, 0.0]`.
pub fn confidence_interval(sample: &[f64], confidence_level: f64) -> Result<[f64; 2]> {
    check_confidence_level(confidence_level)?;
    if sample.is_empty() {
        return Ok([0.0, 0.0]);
    }

    let alpha = 1.0 - confidence_level;
    let sorted = sorted_copy(sample);
    let low = percentile_sorted(&sorted, alpha / 2.0 * 100.0);
    let high = percentile_sorted(&sorted, (1.0 - alpha / 2.0) * 100.0);
    Ok([low, high.max(low)])
}

/// Classify a probability of fail
pub fn classify(probability_of_fail: f64) -> TestStatus {
    if probability_of_fail > FAIL_THRESHOLD {
        TestStatus::Fail
    } else if probability_of_fail > WARNING_THRESHOLD {
        TestStatus::Warning
    } else {
        TestStatus::Pass
    }
}

/// Outcome of evaluating one simulated test against its limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub probability_of_fail: f64,
    pub status: TestStatus,
    pub confidence_interval: [f64; 2],
}

/// Evaluate a sample: probability and class when a limit exists, interval always
pub fn assess(
    sample: &[f64],
    spec_limit: Option<f64>,
    limit_type: LimitType,
    confidence_level: f64,
) -> Result<RiskAssessment> {
    let confidence_interval = confidence_interval(sample, confidence_level)?;
    let probability_of_fail = probability_of_fail_opt(sample, spec_limit, limit_type);
    let status = match spec_limit {
        Some(_) => classify(probability_of_fail),
        None => TestStatus::Pass,
    };
    Ok(RiskAssessment {
        probability_of_fail,
        status,
        confidence_interval,
    })
}
