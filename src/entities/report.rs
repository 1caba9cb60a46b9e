//! Prediction report - per-test verdicts and project-level risk

use serde::{Deserialize, Serialize};

/// Predicted outcome class of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// Probability of fail at or below the warning threshold
    Pass,
    /// Probability of fail above the warning threshold
    Warning,
    /// Probability of fail above the fail threshold
    Fail,
}

impl TestStatus {
    /// True for WARNING and FAIL
    pub fn is_at_risk(self) -> bool {
        !matches!(self, TestStatus::Pass)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Warning => write!(f, "WARNING"),
            TestStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// How the overall risk score averages per-test probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskScorePolicy {
    /// Average over every test; tests without a limit contribute 0
    #[default]
    AllTests,
    /// Average only over tests that have a specification limit
    LimitedOnly,
}

impl std::fmt::Display for RiskScorePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskScorePolicy::AllTests => write!(f, "all_tests"),
            RiskScorePolicy::LimitedOnly => write!(f, "limited_only"),
        }
    }
}

/// Verdict for one test of a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestVerdict {
    /// Test key as used in the specification table
    pub test_key: String,

    /// Display name
    pub test_name: String,

    /// Central predicted value (sample mean, 2 decimals)
    pub predicted_value: f64,

    /// Unit of the predicted value
    pub unit: String,

    /// Specification limit, if the test has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_limit: Option<f64>,

    /// PASS / WARNING / FAIL
    pub status: TestStatus,

    /// Confidence interval [low, high] (2 decimals)
    pub confidence_interval: [f64; 2],

    /// Probability of failing the limit (0-1, 3 decimals)
    pub probability_of_fail: f64,

    /// Sum of the estimator's feature importances for this test
    pub importance_score: f64,
}

/// One feature's normalized share of the total importance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

/// Ranked global explanation of what drives the prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Normalized importance of the top features, heaviest first
    pub feature_importance: Vec<FeatureWeight>,

    /// Highest-weighted features, labeled as increasing risk
    pub top_positive_factors: Vec<String>,

    /// Lowest-weighted features, labeled as reducing risk
    pub top_negative_factors: Vec<String>,

    /// Base risk value the explanation is relative to
    pub base_value: f64,
}

/// Project-level prediction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Product the prediction was made for
    pub product_name: String,

    /// Production facility
    pub factory: String,

    /// Monte Carlo iterations per test
    pub iterations: u32,

    /// Seed the request was simulated with
    pub seed: u64,

    /// Overall risk score (0-100, 1 decimal)
    pub overall_risk_score: f64,

    /// Averaging policy used for the overall risk score
    pub risk_policy: RiskScorePolicy,

    /// Per-test verdicts
    pub test_predictions: Vec<TestVerdict>,

    /// Advisory messages in priority order (at most 5)
    pub recommendations: Vec<String>,

    /// Feature-importance explanation
    pub explanation: Explanation,
}

impl PredictionReport {
    /// Number of tests with the given status
    pub fn count_status(&self, status: TestStatus) -> usize {
        self.test_predictions
            .iter()
            .filter(|v| v.status == status)
            .count()
    }

    /// Verdict for a test key
    pub fn verdict(&self, test_key: &str) -> Option<&TestVerdict> {
        self.test_predictions.iter().find(|v| v.test_key == test_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TestStatus::Warning).unwrap(), "\"WARNING\"");
        let status: TestStatus = serde_json::from_str("\"FAIL\"").unwrap();
        assert_eq!(status, TestStatus::Fail);
    }

    #[test]
    fn test_status_at_risk() {
        assert!(!TestStatus::Pass.is_at_risk());
        assert!(TestStatus::Warning.is_at_risk());
        assert!(TestStatus::Fail.is_at_risk());
    }

    #[test]
    fn test_policy_serialization() {
        assert_eq!(
            serde_yml::to_string(&RiskScorePolicy::LimitedOnly).unwrap().trim(),
            "limited_only"
        );
        assert_eq!(RiskScorePolicy::default(), RiskScorePolicy::AllTests);
    }
}
