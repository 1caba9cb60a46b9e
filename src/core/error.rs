//! Error taxonomy for the prediction pipeline

use miette::Diagnostic;
use thiserror::Error;

use crate::core::estimator::EstimatorError;
use crate::reference::ReferenceError;

/// Errors reported to callers of the simulation core
#[derive(Debug, Error, Diagnostic)]
pub enum PredictError {
    /// Caller-supplied input outside its valid domain; raised before any sampling
    #[error("Invalid input: {0}")]
    #[diagnostic(code(qcast::invalid_input))]
    InvalidInput(String),

    /// The point estimator failed or returned malformed data; the whole request is aborted
    #[error("Estimator failed for product '{product}': {source}")]
    #[diagnostic(
        code(qcast::estimator_failure),
        help("no partial report is produced when any test's baseline is unavailable")
    )]
    EstimatorFailure {
        product: String,
        #[source]
        source: EstimatorError,
    },

    /// Injected reference data is unusable
    #[error(transparent)]
    #[diagnostic(code(qcast::reference))]
    Reference(#[from] ReferenceError),
}

impl PredictError {
    /// Shorthand for [`PredictError::InvalidInput`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        PredictError::InvalidInput(msg.into())
    }

    /// Wrap an estimator error for a product
    pub fn estimator(product: impl Into<String>, source: EstimatorError) -> Self {
        PredictError::EstimatorFailure {
            product: product.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PredictError>;
