//! Point estimators - the baseline-value collaborator of the simulation core
//!
//! A [`PointEstimator`] turns a formula and process setup into one baseline
//! value plus feature importances per test. The simulation core only
//! depends on this trait; [`ReferenceEstimator`] is a lookup-table
//! implementation driven by [`ModelCatalog`] reference data, and
//! [`EstimatorRegistry`] memoizes one estimator per product name.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::entities::{FormulaIngredient, ProcessParameters};
use crate::reference::matches_product;

/// Version string reported by the reference estimator
pub const REFERENCE_MODEL_VERSION: &str = "1.0.0-reference";

/// Weight of the normalized feature adjustment in the reference model
const ADJUSTMENT_SCALE: f64 = 0.1;

/// Midpoint and half-range used to normalize raw feature values
const FEATURE_CENTER: f64 = 50.0;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("no model available for product '{0}'")]
    NoModel(String),

    #[error("no estimate produced for test '{0}'")]
    MissingTest(String),

    #[error("malformed estimate for test '{test}': {reason}")]
    Malformed { test: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Baseline prediction for one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEstimate {
    /// Test key
    pub test: String,

    /// Point prediction of the measured value
    pub baseline: f64,

    /// Feature name -> relative weight (ideally summing to 1.0)
    pub importances: BTreeMap<String, f64>,
}

impl TestEstimate {
    /// Check the estimate is usable by the simulation core
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if !self.baseline.is_finite() {
            return Err(EstimatorError::Malformed {
                test: self.test.clone(),
                reason: format!("baseline {} is not finite", self.baseline),
            });
        }
        if let Some((feature, weight)) = self
            .importances
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(EstimatorError::Malformed {
                test: self.test.clone(),
                reason: format!("importance of '{}' is {}", feature, weight),
            });
        }
        Ok(())
    }

    /// Sum of all importance weights
    pub fn importance_score(&self) -> f64 {
        self.importances.values().sum()
    }
}

/// Produces baseline predictions for a product's tests
pub trait PointEstimator: Send + Sync {
    /// Model version reported alongside predictions
    fn version(&self) -> &str;

    /// Estimate every test this model covers
    fn estimate(
        &self,
        formula: &[FormulaIngredient],
        process: &ProcessParameters,
    ) -> Result<Vec<TestEstimate>, EstimatorError>;
}

/// Reference parameters of one test model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestModel {
    /// Test key
    pub test: String,

    /// Historical mean of the measured value
    pub mean: f64,

    /// Feature name -> importance
    #[serde(default)]
    pub importance: BTreeMap<String, f64>,
}

/// Reference models of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductModels {
    pub name: String,

    /// Case-insensitive substrings of product names this entry serves
    #[serde(default, rename = "match")]
    pub patterns: Vec<String>,

    pub tests: Vec<TestModel>,
}

/// Reference models for all products, with a generic fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub products: Vec<ProductModels>,
    pub generic: ProductModels,
}

impl ModelCatalog {
    /// Models for a product name, falling back to the generic entry
    pub fn models_for(&self, product_name: &str) -> &ProductModels {
        self.products
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(product_name.trim()))
            .or_else(|| {
                self.products
                    .iter()
                    .find(|p| matches_product(&p.patterns, product_name))
            })
            .unwrap_or(&self.generic)
    }
}

/// Lookup-table estimator: historical mean adjusted by weighted features
///
/// Features are `<ingredient>_percentage` shares and the supplied process
/// readings; an absent optional reading does not shift the baseline.
/// Each feature listed in a test's importance map shifts the baseline by
/// `((value - 50) / 50) × importance × 0.1` relative to the mean.
#[derive(Debug, Clone)]
pub struct ReferenceEstimator {
    models: ProductModels,
}

impl ReferenceEstimator {
    pub fn new(models: ProductModels) -> Self {
        Self { models }
    }

    pub fn for_product(catalog: &ModelCatalog, product_name: &str) -> Self {
        Self::new(catalog.models_for(product_name).clone())
    }

    pub fn product(&self) -> &str {
        &self.models.name
    }

    fn features(
        formula: &[FormulaIngredient],
        process: &ProcessParameters,
    ) -> BTreeMap<String, f64> {
        let mut features: BTreeMap<String, f64> = formula
            .iter()
            .map(|ing| (ing.feature_name(), ing.percentage))
            .collect();
        for (name, value) in process.provided_readings() {
            features.insert(name.to_string(), value);
        }
        features
    }
}

impl PointEstimator for ReferenceEstimator {
    fn version(&self) -> &str {
        REFERENCE_MODEL_VERSION
    }

    fn estimate(
        &self,
        formula: &[FormulaIngredient],
        process: &ProcessParameters,
    ) -> Result<Vec<TestEstimate>, EstimatorError> {
        let features = Self::features(formula, process);

        Ok(self
            .models
            .tests
            .iter()
            .map(|model| {
                let adjustment: f64 = model
                    .importance
                    .iter()
                    .filter_map(|(feature, weight)| {
                        features.get(feature).map(|value| {
                            (value - FEATURE_CENTER) / FEATURE_CENTER * weight * ADJUSTMENT_SCALE
                        })
                    })
                    .sum();

                TestEstimate {
                    test: model.test.clone(),
                    baseline: model.mean * (1.0 + adjustment),
                    importances: model.importance.clone(),
                }
            })
            .collect())
    }
}

type EstimatorFactory =
    dyn Fn(&str) -> Result<Arc<dyn PointEstimator>, EstimatorError> + Send + Sync;

/// Keyed cache of point estimators with construct-once semantics
///
/// The first caller for a product runs the factory while holding that
/// key's entry lock; concurrent callers wait and receive the same `Arc`.
/// A failed construction leaves no entry behind.
pub struct EstimatorRegistry {
    estimators: DashMap<String, Arc<dyn PointEstimator>>,
    factory: Box<EstimatorFactory>,
}

impl EstimatorRegistry {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn PointEstimator>, EstimatorError> + Send + Sync + 'static,
    {
        Self {
            estimators: DashMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Registry building [`ReferenceEstimator`]s from a model catalog
    pub fn reference(catalog: Arc<ModelCatalog>) -> Self {
        Self::new(move |product| {
            let estimator = ReferenceEstimator::for_product(&catalog, product);
            Ok(Arc::new(estimator) as Arc<dyn PointEstimator>)
        })
    }

    /// Cached estimator for a product, constructing it on first use
    pub fn get_or_create(&self, product: &str) -> Result<Arc<dyn PointEstimator>, EstimatorError> {
        if let Some(existing) = self.estimators.get(product) {
            return Ok(Arc::clone(existing.value()));
        }

        let entry = self
            .estimators
            .entry(product.to_string())
            .or_try_insert_with(|| {
                tracing::info!(product, "loading estimator");
                (self.factory)(product)
            })?;
        Ok(Arc::clone(entry.value()))
    }

    pub fn contains(&self, product: &str) -> bool {
        self.estimators.contains_key(product)
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

impl std::fmt::Debug for EstimatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimatorRegistry")
            .field("cached", &self.estimators.len())
            .finish()
    }
}
