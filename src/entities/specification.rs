//! Test specifications - quality-control limits a product must meet

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::PredictError;

/// Direction in which a specification limit is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitType {
    /// Outcomes above the limit fail
    #[default]
    Upper,
    /// Outcomes below the limit fail
    Lower,
}

impl LimitType {
    /// True if `value` is strictly past `limit` in this direction
    pub fn is_violated(self, value: f64, limit: f64) -> bool {
        match self {
            LimitType::Upper => value > limit,
            LimitType::Lower => value < limit,
        }
    }
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitType::Upper => write!(f, "upper"),
            LimitType::Lower => write!(f, "lower"),
        }
    }
}

impl FromStr for LimitType {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upper" => Ok(LimitType::Upper),
            "lower" => Ok(LimitType::Lower),
            other => Err(PredictError::invalid(format!(
                "unknown limit type '{}' (expected 'upper' or 'lower')",
                other
            ))),
        }
    }
}

/// Specification of one quality-control test for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpecification {
    /// Test key (snake_case, e.g. "shelf_life")
    pub test: String,

    /// Unit of the measured value
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Specification limit; tests without one cannot fail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_limit: Option<f64>,

    /// Direction of the limit
    #[serde(default)]
    pub limit_type: LimitType,

    /// Nominal target value
    pub target: f64,
}

fn default_unit() -> String {
    "unit".to_string()
}

impl TestSpecification {
    /// Human-readable test name: `shelf_life` -> "Shelf Life"
    pub fn display_name(&self) -> String {
        display_name(&self.test)
    }
}

/// Convert a snake_case key to Title Case words
pub fn display_name(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_type_parsing() {
        assert_eq!("upper".parse::<LimitType>().unwrap(), LimitType::Upper);
        assert_eq!(" Lower ".parse::<LimitType>().unwrap(), LimitType::Lower);
        assert_eq!(LimitType::default(), LimitType::Upper);
        assert!(matches!(
            "sideways".parse::<LimitType>(),
            Err(PredictError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_limit_violation_is_strict() {
        assert!(LimitType::Upper.is_violated(30.01, 30.0));
        assert!(!LimitType::Upper.is_violated(30.0, 30.0));
        assert!(LimitType::Lower.is_violated(299.9, 300.0));
        assert!(!LimitType::Lower.is_violated(300.0, 300.0));
    }

    #[test]
    fn test_unknown_limit_type_rejected_in_yaml() {
        let yaml = "test: viscosity\nunit: cP\nspec_limit: 60.0\nlimit_type: both\ntarget: 45.0";
        let result: Result<TestSpecification, _> = serde_yml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("shelf_life"), "Shelf Life");
        assert_eq!(display_name("iron_loss"), "Iron Loss");
        assert_eq!(display_name("generic_test"), "Generic Test");
        assert_eq!(display_name("ph"), "Ph");
    }

    #[test]
    fn test_spec_without_limit() {
        let yaml = "test: color\ntarget: 5.0";
        let spec: TestSpecification = serde_yml::from_str(yaml).unwrap();
        assert!(spec.spec_limit.is_none());
        assert_eq!(spec.limit_type, LimitType::Upper);
        assert_eq!(spec.unit, "unit");
    }
}
