//! Prediction orchestrator - runs every test of a product through the
//! simulation pipeline and aggregates a project-level report
//!
//! Validation happens before any sampling. The point estimator is called
//! once per request; a failure or malformed estimate aborts the whole
//! request with no partial report.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::{PredictError, Result};
use crate::core::estimator::{EstimatorError, EstimatorRegistry, PointEstimator, TestEstimate};
use crate::core::explain::explain;
use crate::core::monte_carlo::{MonteCarloEngine, SimulatedSample};
use crate::core::recommend::{recommend, RecommendationThresholds};
use crate::core::risk::{assess, check_confidence_level, DEFAULT_CONFIDENCE_LEVEL};
use crate::core::rng::derive_seed;
use crate::core::stats::{round_to, SampleStats};
use crate::core::variability::VariabilityEstimator;
use crate::entities::{
    FormulaIngredient, LimitType, PredictionReport, ProcessParameters,
    RiskScorePolicy, TestSpecification, TestVerdict,
};
use crate::reference::{ProductCatalog, ReferenceData};

/// One prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub product_name: String,
    pub factory: String,
    #[serde(default)]
    pub formula: Vec<FormulaIngredient>,
    pub process_parameters: ProcessParameters,
    pub iterations: u32,
    pub seed: u64,
}

/// Raw simulated outcomes of one test, kept for charts and export
#[derive(Debug, Clone)]
pub struct TestSample {
    pub test_key: String,
    pub spec_limit: Option<f64>,
    pub limit_type: LimitType,
    pub stats: SampleStats,
    pub sample: SimulatedSample,
}

/// Runs prediction requests against injected reference data
#[derive(Debug)]
pub struct PredictionOrchestrator {
    variability: VariabilityEstimator,
    products: ProductCatalog,
    registry: Arc<EstimatorRegistry>,
    engine: MonteCarloEngine,
    confidence_level: f64,
    risk_policy: RiskScorePolicy,
    thresholds: RecommendationThresholds,
}

impl PredictionOrchestrator {
    /// Orchestrator using the reference estimator over the data's model catalog
    pub fn new(reference: ReferenceData) -> Self {
        let registry = Arc::new(EstimatorRegistry::reference(Arc::clone(&reference.models)));
        Self {
            variability: VariabilityEstimator::new(reference.facilities, reference.formula),
            products: reference.products,
            registry,
            engine: MonteCarloEngine::default(),
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            risk_policy: RiskScorePolicy::default(),
            thresholds: RecommendationThresholds::default(),
        }
    }

    /// Orchestrator with engine bounds, confidence, policy and thresholds from config
    pub fn from_config(reference: ReferenceData, config: &Config) -> Self {
        Self::new(reference)
            .with_engine(MonteCarloEngine::new(config.iteration_bounds()))
            .with_confidence_level(config.confidence_level)
            .with_risk_policy(config.risk_policy)
            .with_thresholds(config.recommendations.clone())
    }

    pub fn with_registry(mut self, registry: Arc<EstimatorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_engine(mut self, engine: MonteCarloEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    pub fn with_risk_policy(mut self, risk_policy: RiskScorePolicy) -> Self {
        self.risk_policy = risk_policy;
        self
    }

    pub fn with_thresholds(mut self, thresholds: RecommendationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    pub fn products(&self) -> &ProductCatalog {
        &self.products
    }

    pub fn variability(&self) -> &VariabilityEstimator {
        &self.variability
    }

    pub fn engine(&self) -> &MonteCarloEngine {
        &self.engine
    }

    /// Version string of the estimator serving a product
    pub fn model_version(&self, product_name: &str) -> Result<String> {
        Ok(self.estimator(product_name)?.version().to_string())
    }

    /// Predict every test of the request's product
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionReport> {
        self.run(request, false).map(|(report, _)| report)
    }

    /// Predict and also return each test's raw sample
    pub fn predict_with_samples(
        &self,
        request: &PredictionRequest,
    ) -> Result<(PredictionReport, Vec<TestSample>)> {
        self.run(request, true)
    }

    fn estimator(&self, product_name: &str) -> Result<Arc<dyn PointEstimator>> {
        self.registry
            .get_or_create(product_name)
            .map_err(|e| PredictError::estimator(product_name, e))
    }

    fn validate(&self, request: &PredictionRequest) -> Result<()> {
        self.engine.bounds().check(request.iterations)?;
        check_confidence_level(self.confidence_level)?;

        for ingredient in &request.formula {
            let p = ingredient.percentage;
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(PredictError::invalid(format!(
                    "percentage of '{}' must be within 0-100, got {}",
                    ingredient.name, p
                )));
            }
        }

        if let Some(name) = request.process_parameters.first_non_finite() {
            return Err(PredictError::invalid(format!(
                "process parameter '{}' must be a finite number",
                name
            )));
        }
        Ok(())
    }

    /// Call the estimator once and check every estimate it returns
    fn estimates(&self, request: &PredictionRequest) -> Result<Vec<TestEstimate>> {
        let product = &request.product_name;
        let estimates = self
            .estimator(product)?
            .estimate(&request.formula, &request.process_parameters)
            .map_err(|e| PredictError::estimator(product.as_str(), e))?;

        let mut seen = HashSet::new();
        for estimate in &estimates {
            estimate
                .validate()
                .map_err(|e| PredictError::estimator(product.as_str(), e))?;
            if !seen.insert(estimate.test.as_str()) {
                return Err(PredictError::estimator(
                    product.as_str(),
                    EstimatorError::Malformed {
                        test: estimate.test.clone(),
                        reason: "test estimated more than once".to_string(),
                    },
                ));
            }
        }
        Ok(estimates)
    }

    /// Spec-table tests in table order, then estimator-only tests without a limit
    fn plan<'e>(
        &self,
        request: &PredictionRequest,
        estimates: &'e [TestEstimate],
    ) -> Result<Vec<(TestSpecification, &'e TestEstimate)>> {
        let specs = self.products.specs_for(&request.product_name);
        let mut plan = Vec::with_capacity(estimates.len().max(specs.tests.len()));

        for spec in &specs.tests {
            let estimate = estimates
                .iter()
                .find(|e| e.test == spec.test)
                .ok_or_else(|| {
                    PredictError::estimator(
                        request.product_name.as_str(),
                        EstimatorError::MissingTest(spec.test.clone()),
                    )
                })?;
            plan.push((spec.clone(), estimate));
        }

        for estimate in estimates {
            if specs.tests.iter().any(|s| s.test == estimate.test) {
                continue;
            }
            tracing::warn!(
                product = %request.product_name,
                test = %estimate.test,
                "no specification for estimated test, reporting without limit"
            );
            plan.push((unlimited_spec(estimate), estimate));
        }
        Ok(plan)
    }

    fn run(
        &self,
        request: &PredictionRequest,
        keep_samples: bool,
    ) -> Result<(PredictionReport, Vec<TestSample>)> {
        self.validate(request)?;
        tracing::info!(
            product = %request.product_name,
            factory = %request.factory,
            iterations = request.iterations,
            seed = request.seed,
            "running prediction"
        );

        let estimates = self.estimates(request)?;
        let plan = self.plan(request, &estimates)?;

        let process = self
            .variability
            .estimate_process_variability(&request.factory);
        let formula = self
            .variability
            .estimate_formula_variability(&request.formula);

        let mut verdicts = Vec::with_capacity(plan.len());
        let mut risks = Vec::with_capacity(plan.len());
        let mut samples = Vec::new();

        for (index, (spec, estimate)) in plan.iter().enumerate() {
            let seed = derive_seed(request.seed, index as u64);
            let (sample, stats) = self.engine.simulate(
                estimate.baseline,
                &process,
                &formula.profile,
                request.iterations,
                seed,
            )?;
            let assessment = assess(
                sample.values(),
                spec.spec_limit,
                spec.limit_type,
                self.confidence_level,
            )?;
            tracing::debug!(
                test = %spec.test,
                baseline = estimate.baseline,
                mean = stats.mean,
                probability_of_fail = assessment.probability_of_fail,
                status = %assessment.status,
                "simulated test"
            );

            risks.push((spec.spec_limit.is_some(), assessment.probability_of_fail));
            let [low, high] = assessment.confidence_interval;
            verdicts.push(TestVerdict {
                test_key: spec.test.clone(),
                test_name: spec.display_name(),
                predicted_value: round_to(stats.mean, 2),
                unit: spec.unit.clone(),
                spec_limit: spec.spec_limit,
                status: assessment.status,
                confidence_interval: [round_to(low, 2), round_to(high, 2)],
                probability_of_fail: round_to(assessment.probability_of_fail, 3),
                importance_score: round_to(estimate.importance_score(), 3),
            });

            if keep_samples {
                samples.push(TestSample {
                    test_key: spec.test.clone(),
                    spec_limit: spec.spec_limit,
                    limit_type: spec.limit_type,
                    stats,
                    sample,
                });
            }
        }

        let risk_score = overall_risk(&risks, self.risk_policy);
        let recommendations = recommend(
            risk_score,
            &verdicts,
            &request.process_parameters,
            &request.formula,
            &self.thresholds,
        );
        let explanation = explain(plan.iter().map(|(_, e)| &e.importances));

        let report = PredictionReport {
            product_name: request.product_name.clone(),
            factory: request.factory.clone(),
            iterations: request.iterations,
            seed: request.seed,
            overall_risk_score: round_to(risk_score, 1),
            risk_policy: self.risk_policy,
            test_predictions: verdicts,
            recommendations,
            explanation,
        };
        tracing::info!(
            product = %report.product_name,
            risk = report.overall_risk_score,
            tests = report.test_predictions.len(),
            "prediction complete"
        );
        Ok((report, samples))
    }
}

fn unlimited_spec(estimate: &TestEstimate) -> TestSpecification {
    TestSpecification {
        test: estimate.test.clone(),
        unit: "unit".to_string(),
        spec_limit: None,
        limit_type: LimitType::default(),
        target: estimate.baseline,
    }
}

/// Mean probability of fail × 100 under the given policy (unrounded)
pub fn overall_risk(risks: &[(bool, f64)], policy: RiskScorePolicy) -> f64 {
    let counted: Vec<f64> = risks
        .iter()
        .filter(|(has_limit, _)| match policy {
            RiskScorePolicy::AllTests => true,
            RiskScorePolicy::LimitedOnly => *has_limit,
        })
        .map(|(_, p)| *p)
        .collect();

    if counted.is_empty() {
        return 0.0;
    }
    counted.iter().sum::<f64>() / counted.len() as f64 * 100.0
}
