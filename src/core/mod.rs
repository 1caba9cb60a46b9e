//! Core module - simulation engine, risk evaluation and orchestration

pub mod config;
pub mod error;
pub mod estimator;
pub mod explain;
pub mod monte_carlo;
pub mod orchestrator;
pub mod recommend;
pub mod risk;
pub mod rng;
pub mod stats;
pub mod variability;

pub use config::{Config, ConfigError};
pub use error::{PredictError, Result};
pub use estimator::{
    EstimatorError, EstimatorRegistry, ModelCatalog, PointEstimator, ReferenceEstimator,
    TestEstimate,
};
pub use explain::explain;
pub use monte_carlo::{CorrelatedSample, IterationBounds, MonteCarloEngine, SimulatedSample};
pub use orchestrator::{PredictionOrchestrator, PredictionRequest, TestSample};
pub use recommend::{recommend, RecommendationThresholds};
pub use risk::{assess, classify, confidence_interval, probability_of_fail, RiskAssessment};
pub use rng::{derive_seed, SimRng};
pub use stats::SampleStats;
pub use variability::{
    FacilityTable, FormulaVariability, FormulaVariabilityConfig, VariabilityEstimator,
    VariabilityProfile,
};
