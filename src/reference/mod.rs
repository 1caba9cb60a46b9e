//! Reference data - facility variability, formula model, test specifications
//! and estimator models
//!
//! A default set of tables is embedded in the binary. A directory holding
//! any of `facilities.yaml`, `formula.yaml`, `products.yaml` or
//! `models.yaml` overrides the matching embedded table.

use miette::Diagnostic;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::core::estimator::ModelCatalog;
use crate::core::variability::{FacilityTable, FormulaVariabilityConfig};
use crate::entities::TestSpecification;
use crate::yaml::{parse_yaml, YamlError};

pub const FACILITIES_FILE: &str = "facilities.yaml";
pub const FORMULA_FILE: &str = "formula.yaml";
pub const PRODUCTS_FILE: &str = "products.yaml";
pub const MODELS_FILE: &str = "models.yaml";

#[derive(Embed)]
#[folder = "reference/"]
struct EmbeddedReference;

#[derive(Debug, Error, Diagnostic)]
pub enum ReferenceError {
    #[error("invalid reference data: {0}")]
    #[diagnostic(code(qcast::reference::invalid))]
    Invalid(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("embedded reference file '{0}' is missing")]
    #[diagnostic(code(qcast::reference::missing))]
    MissingEmbedded(String),
}

/// True if the lowercased product name contains any of the patterns
pub fn matches_product(patterns: &[String], product_name: &str) -> bool {
    let name = product_name.to_lowercase();
    patterns
        .iter()
        .any(|p| !p.trim().is_empty() && name.contains(&p.trim().to_lowercase()))
}

/// Test specifications of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpecs {
    pub name: String,

    /// Case-insensitive substrings of product names this entry serves
    #[serde(default, rename = "match")]
    pub patterns: Vec<String>,

    pub tests: Vec<TestSpecification>,
}

/// Specification tables for all products, with a generic fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<ProductSpecs>,
    pub generic: ProductSpecs,
}

impl ProductCatalog {
    /// Specifications for a product name, falling back to the generic entry
    ///
    /// An exact (case-insensitive) name wins over a pattern match.
    pub fn specs_for(&self, product_name: &str) -> &ProductSpecs {
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

    fn validate(&self) -> Result<(), ReferenceError> {
        for product in self.products.iter().chain(std::iter::once(&self.generic)) {
            let mut seen = std::collections::HashSet::new();
            for spec in &product.tests {
                if !seen.insert(spec.test.as_str()) {
                    return Err(ReferenceError::Invalid(format!(
                        "product '{}' lists test '{}' twice",
                        product.name, spec.test
                    )));
                }
                if let Some(limit) = spec.spec_limit.filter(|l| !l.is_finite()) {
                    return Err(ReferenceError::Invalid(format!(
                        "test '{}' of '{}' has non-finite limit {}",
                        spec.test, product.name, limit
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Every table the prediction pipeline is configured with
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub facilities: FacilityTable,
    pub formula: FormulaVariabilityConfig,
    pub products: ProductCatalog,
    pub models: Arc<ModelCatalog>,
}

impl ReferenceData {
    /// Tables compiled into the binary
    pub fn embedded() -> Result<Self, ReferenceError> {
        Self::build(|file| embedded_source(file).map(Some))
    }

    /// Tables from a directory, with embedded fallbacks for missing files
    pub fn load_dir(dir: &Path) -> Result<Self, ReferenceError> {
        Self::build(|file| {
            let path = dir.join(file);
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading reference override");
                let content = std::fs::read_to_string(&path).map_err(YamlError::from)?;
                Ok(Some((content, path.display().to_string())))
            } else {
                embedded_source(file).map(Some)
            }
        })
    }

    fn build<F>(mut source: F) -> Result<Self, ReferenceError>
    where
        F: FnMut(&str) -> Result<Option<(String, String)>, ReferenceError>,
    {
        let mut load = |file: &str| -> Result<(String, String), ReferenceError> {
            source(file)?.ok_or_else(|| ReferenceError::MissingEmbedded(file.to_string()))
        };

        let (content, name) = load(FACILITIES_FILE)?;
        let facilities: FacilityTable = parse_yaml(&content, &name)?;

        let (content, name) = load(FORMULA_FILE)?;
        let formula: FormulaVariabilityConfig = parse_yaml(&content, &name)?;
        formula.validate()?;

        let (content, name) = load(PRODUCTS_FILE)?;
        let products: ProductCatalog = parse_yaml(&content, &name)?;
        products.validate()?;

        let (content, name) = load(MODELS_FILE)?;
        let models: ModelCatalog = parse_yaml(&content, &name)?;

        Ok(Self {
            facilities,
            formula,
            products,
            models: Arc::new(models),
        })
    }
}

fn embedded_source(file: &str) -> Result<(String, String), ReferenceError> {
    let data = EmbeddedReference::get(file)
        .ok_or_else(|| ReferenceError::MissingEmbedded(file.to_string()))?;
    let content = std::str::from_utf8(&data.data)
        .map_err(|e| ReferenceError::Invalid(format!("{} is not UTF-8: {}", file, e)))?;
    Ok((content.to_string(), format!("<embedded>/{}", file)))
}
