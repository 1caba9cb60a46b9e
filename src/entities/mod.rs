//! Entity type definitions

pub mod formula;
pub mod report;
pub mod specification;

pub use formula::{FormulaIngredient, ProcessParameters};
pub use report::{
    Explanation, FeatureWeight, PredictionReport, RiskScorePolicy, TestStatus, TestVerdict,
};
pub use specification::{display_name, LimitType, TestSpecification};
