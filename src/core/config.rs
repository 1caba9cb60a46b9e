//! Configuration management - layered defaults, user, project and environment

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::monte_carlo::IterationBounds;
use crate::core::recommend::RecommendationThresholds;
use crate::core::risk::DEFAULT_CONFIDENCE_LEVEL;
use crate::entities::RiskScorePolicy;
use crate::yaml::{parse_yaml_file, YamlError};

/// Project-local configuration file, relative to the working directory
pub const PROJECT_CONFIG: &str = ".qcast/config.yaml";

pub const ENV_ITERATIONS: &str = "QCAST_ITERATIONS";
pub const ENV_SEED: &str = "QCAST_SEED";
pub const ENV_REFERENCE_DIR: &str = "QCAST_REFERENCE_DIR";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("environment variable {var} has invalid value '{value}'")]
    #[diagnostic(code(qcast::config::env))]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(qcast::config::invalid))]
    Invalid(String),
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default Monte Carlo iteration count
    pub iterations: u32,

    pub min_iterations: u32,
    pub max_iterations: u32,

    /// Default seed for requests that do not carry one
    pub seed: u64,

    /// Two-sided confidence level of reported intervals
    pub confidence_level: f64,

    pub risk_policy: RiskScorePolicy,

    /// Directory with reference table overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_dir: Option<PathBuf>,

    pub recommendations: RecommendationThresholds,
}

impl Default for Config {
    fn default() -> Self {
        let bounds = IterationBounds::default();
        Self {
            iterations: 10_000,
            min_iterations: bounds.min,
            max_iterations: bounds.max,
            seed: 42,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            risk_policy: RiskScorePolicy::default(),
            reference_dir: None,
            recommendations: RecommendationThresholds::default(),
        }
    }
}

/// One configuration file; absent keys leave lower layers untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    iterations: Option<u32>,
    min_iterations: Option<u32>,
    max_iterations: Option<u32>,
    seed: Option<u64>,
    confidence_level: Option<f64>,
    risk_policy: Option<RiskScorePolicy>,
    reference_dir: Option<PathBuf>,
    recommendations: Option<RecommendationThresholds>,
}

impl Config {
    /// Load defaults, then user config, project config and environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut files = Vec::new();
        if let Some(user) = user_config_path() {
            files.push(user);
        }
        files.push(PathBuf::from(PROJECT_CONFIG));
        Self::load_layers(&files, |var| std::env::var(var).ok())
    }

    /// Apply existing files in order, then environment overrides
    pub fn load_layers<F>(files: &[PathBuf], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        for path in files.iter().filter(|p| p.is_file()) {
            tracing::debug!(path = %path.display(), "loading config layer");
            let layer: ConfigLayer = parse_yaml_file(path)?;
            config.apply(layer);
        }

        if let Some(value) = env(ENV_ITERATIONS) {
            config.iterations = value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_ITERATIONS,
                value: value.clone(),
            })?;
        }
        if let Some(value) = env(ENV_SEED) {
            config.seed = value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_SEED,
                value: value.clone(),
            })?;
        }
        if let Some(value) = env(ENV_REFERENCE_DIR).filter(|v| !v.trim().is_empty()) {
            config.reference_dir = Some(PathBuf::from(value));
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(v) = layer.iterations {
            self.iterations = v;
        }
        if let Some(v) = layer.min_iterations {
            self.min_iterations = v;
        }
        if let Some(v) = layer.max_iterations {
            self.max_iterations = v;
        }
        if let Some(v) = layer.seed {
            self.seed = v;
        }
        if let Some(v) = layer.confidence_level {
            self.confidence_level = v;
        }
        if let Some(v) = layer.risk_policy {
            self.risk_policy = v;
        }
        if let Some(v) = layer.reference_dir {
            self.reference_dir = Some(v);
        }
        if let Some(v) = layer.recommendations {
            self.recommendations = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_iterations == 0 || self.min_iterations > self.max_iterations {
            return Err(ConfigError::Invalid(format!(
                "iteration bounds {}..={} are empty",
                self.min_iterations, self.max_iterations
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }

    pub fn iteration_bounds(&self) -> IterationBounds {
        IterationBounds {
            min: self.min_iterations,
            max: self.max_iterations,
        }
    }

    /// Reference override directory, if configured and present
    pub fn reference_dir(&self) -> Option<&Path> {
        self.reference_dir.as_deref()
    }
}

/// `config.yaml` in the platform config directory for qcast
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "qcast").map(|dirs| dirs.config_dir().join("config.yaml"))
}
