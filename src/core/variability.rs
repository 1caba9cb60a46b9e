//! Variability estimation - noise magnitudes from facility and formula
//!
//! Process variability comes from a reference table of known facilities;
//! unknown facilities get a conservative default that is strictly larger
//! than every known entry. Formula variability grows with the number of
//! critical ingredients and is capped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::FormulaIngredient;
use crate::reference::ReferenceError;

/// Key of the aggregate magnitude every profile carries
pub const OVERALL: &str = "overall";

/// Named fractional variability magnitudes (standard-deviation-like scale)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariabilityProfile(BTreeMap<String, f64>);

impl VariabilityProfile {
    /// Profile with only an overall magnitude
    pub fn overall_only(overall: f64) -> Self {
        let mut map = BTreeMap::new();
        map.insert(OVERALL.to_string(), overall);
        Self(map)
    }

    /// Add or replace a magnitude
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Overall magnitude (0.0 if absent)
    pub fn overall(&self) -> f64 {
        self.get(OVERALL).unwrap_or(0.0)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that the profile has an overall entry and only finite, non-negative values
    fn validate(&self, label: &str) -> Result<(), ReferenceError> {
        if self.get(OVERALL).is_none() {
            return Err(ReferenceError::Invalid(format!(
                "variability profile for '{}' has no '{}' entry",
                label, OVERALL
            )));
        }
        if let Some((key, value)) = self.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(ReferenceError::Invalid(format!(
                "variability '{}' for '{}' must be a non-negative number, got {}",
                key, label, value
            )));
        }
        Ok(())
    }
}

/// A known production facility and its measured variability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityEntry {
    pub name: String,
    pub variability: VariabilityProfile,
}

#[derive(Debug, Clone, Deserialize)]
struct FacilityTableFile {
    facilities: Vec<FacilityEntry>,
    default: VariabilityProfile,
}

/// Reference table of facility variability profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FacilityTableFile")]
pub struct FacilityTable {
    facilities: Vec<FacilityEntry>,
    default: VariabilityProfile,
}

impl TryFrom<FacilityTableFile> for FacilityTable {
    type Error = ReferenceError;

    fn try_from(file: FacilityTableFile) -> Result<Self, Self::Error> {
        FacilityTable::new(file.facilities, file.default)
    }
}

impl FacilityTable {
    /// Build a table, rejecting a default that is not strictly more
    /// conservative than every known facility
    pub fn new(
        facilities: Vec<FacilityEntry>,
        default: VariabilityProfile,
    ) -> Result<Self, ReferenceError> {
        default.validate("default")?;

        for entry in &facilities {
            entry.variability.validate(&entry.name)?;

            for (key, value) in entry.variability.iter() {
                match default.get(key) {
                    Some(d) if d > value => {}
                    Some(d) => {
                        return Err(ReferenceError::Invalid(format!(
                            "default '{}' variability {} must exceed {} of facility '{}'",
                            key, d, value, entry.name
                        )))
                    }
                    None => {
                        return Err(ReferenceError::Invalid(format!(
                            "default profile lacks '{}' used by facility '{}'",
                            key, entry.name
                        )))
                    }
                }
            }
        }

        Ok(Self {
            facilities,
            default,
        })
    }

    /// Profile of a known facility (case-insensitive, trimmed name match)
    pub fn lookup(&self, facility: &str) -> Option<&VariabilityProfile> {
        let wanted = facility.trim().to_lowercase();
        self.facilities
            .iter()
            .find(|f| f.name.trim().to_lowercase() == wanted)
            .map(|f| &f.variability)
    }

    /// Profile applied to unknown facilities
    pub fn default_profile(&self) -> &VariabilityProfile {
        &self.default
    }

    pub fn facilities(&self) -> &[FacilityEntry] {
        &self.facilities
    }
}

/// Constants of the formula variability model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaVariabilityConfig {
    /// Overall magnitude of a formula with no critical ingredients
    pub base: f64,

    /// Increment per critical ingredient
    pub per_critical: f64,

    /// Hard cap on the overall magnitude
    pub cap: f64,

    /// Lowercase name substrings marking an ingredient as critical
    pub critical_ingredients: Vec<String>,
}

impl FormulaVariabilityConfig {
    pub fn validate(&self) -> Result<(), ReferenceError> {
        let fields = [
            ("base", self.base),
            ("per_critical", self.per_critical),
            ("cap", self.cap),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(ReferenceError::Invalid(format!(
                "formula variability '{}' must be a non-negative number, got {}",
                name, value
            )));
        }
        if self.cap < self.base {
            return Err(ReferenceError::Invalid(format!(
                "formula variability cap {} is below the base {}",
                self.cap, self.base
            )));
        }
        Ok(())
    }

    /// True if the ingredient name contains any critical substring
    pub fn is_critical(&self, ingredient_name: &str) -> bool {
        let name = ingredient_name.to_lowercase();
        self.critical_ingredients
            .iter()
            .any(|crit| !crit.is_empty() && name.contains(&crit.to_lowercase()))
    }
}

/// Formula-driven variability and the count that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaVariability {
    pub profile: VariabilityProfile,
    pub critical_ingredients: usize,
}

/// Derives process and formula variability from reference data
#[derive(Debug, Clone)]
pub struct VariabilityEstimator {
    facilities: FacilityTable,
    formula: FormulaVariabilityConfig,
}

impl VariabilityEstimator {
    pub fn new(facilities: FacilityTable, formula: FormulaVariabilityConfig) -> Self {
        Self {
            facilities,
            formula,
        }
    }

    /// Process variability for a facility; unknown facilities get the default profile
    pub fn estimate_process_variability(&self, facility: &str) -> VariabilityProfile {
        match self.facilities.lookup(facility) {
            Some(profile) => profile.clone(),
            None => {
                tracing::debug!(facility, "unknown facility, using conservative default");
                self.facilities.default_profile().clone()
            }
        }
    }

    /// Formula variability: base + critical count x increment, capped
    pub fn estimate_formula_variability(
        &self,
        ingredients: &[FormulaIngredient],
    ) -> FormulaVariability {
        let critical = ingredients
            .iter()
            .filter(|ing| self.formula.is_critical(&ing.name))
            .count();

        let overall = (self.formula.base + critical as f64 * self.formula.per_critical)
            .min(self.formula.cap);

        FormulaVariability {
            profile: VariabilityProfile::overall_only(overall),
            critical_ingredients: critical,
        }
    }

    pub fn facilities(&self) -> &FacilityTable {
        &self.facilities
    }

    pub fn formula_config(&self) -> &FormulaVariabilityConfig {
        &self.formula
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FacilityTable {
        FacilityTable::new(
            vec![
                FacilityEntry {
                    name: "Plant A".to_string(),
                    variability: VariabilityProfile::overall_only(0.04).with("temperature", 0.02),
                },
                FacilityEntry {
                    name: "Plant B".to_string(),
                    variability: VariabilityProfile::overall_only(0.05).with("temperature", 0.03),
                },
            ],
            VariabilityProfile::overall_only(0.06).with("temperature", 0.04),
        )
        .unwrap()
    }

    fn formula_config() -> FormulaVariabilityConfig {
        FormulaVariabilityConfig {
            base: 0.03,
            per_critical: 0.01,
            cap: 0.08,
            critical_ingredients: vec!["cocoa".into(), "lecithin".into(), "fat".into()],
        }
    }

    fn estimator() -> VariabilityEstimator {
        VariabilityEstimator::new(table(), formula_config())
    }

    #[test]
    fn test_known_facility_profile() {
        let profile = estimator().estimate_process_variability("Plant A");
        assert_eq!(profile.overall(), 0.04);
        assert_eq!(profile.get("temperature"), Some(0.02));
    }

    #[test]
    fn test_facility_lookup_ignores_case_and_whitespace() {
        let profile = estimator().estimate_process_variability("  plant b ");
        assert_eq!(profile.overall(), 0.05);
    }

    #[test]
    fn test_unknown_facility_gets_default() {
        let est = estimator();
        let profile = est.estimate_process_variability("Somewhere Else");
        assert_eq!(profile.overall(), 0.06);
        for entry in est.facilities().facilities() {
            assert!(profile.overall() > entry.variability.overall());
        }
    }

    #[test]
    fn test_non_conservative_default_rejected() {
        let result = FacilityTable::new(
            vec![FacilityEntry {
                name: "Plant A".to_string(),
                variability: VariabilityProfile::overall_only(0.07),
            }],
            VariabilityProfile::overall_only(0.06),
        );
        assert!(matches!(result, Err(ReferenceError::Invalid(_))));
    }

    #[test]
    fn test_default_missing_key_rejected() {
        let result = FacilityTable::new(
            vec![FacilityEntry {
                name: "Plant A".to_string(),
                variability: VariabilityProfile::overall_only(0.01).with("ph", 0.01),
            }],
            VariabilityProfile::overall_only(0.06),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_magnitude_rejected() {
        let result = FacilityTable::new(vec![], VariabilityProfile::overall_only(-0.1));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_formula_has_base_variability() {
        let fv = estimator().estimate_formula_variability(&[]);
        assert_eq!(fv.critical_ingredients, 0);
        assert_eq!(fv.profile.overall(), 0.03);
    }

    #[test]
    fn test_critical_ingredients_counted_once_each() {
        let formula = vec![
            FormulaIngredient::new("Cocoa Powder", 20.0),
            FormulaIngredient::new("Soy Lecithin", 0.4),
            FormulaIngredient::new("Sugar", 50.0),
            // matches two substrings but counts once
            FormulaIngredient::new("Cocoa fat", 5.0),
        ];
        let fv = estimator().estimate_formula_variability(&formula);
        assert_eq!(fv.critical_ingredients, 3);
        assert!((fv.profile.overall() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_formula_variability_capped() {
        let formula: Vec<_> = (0..10)
            .map(|i| FormulaIngredient::new(format!("cocoa blend {}", i), 1.0))
            .collect();
        let fv = estimator().estimate_formula_variability(&formula);
        assert_eq!(fv.critical_ingredients, 10);
        assert_eq!(fv.profile.overall(), 0.08);
    }

    #[test]
    fn test_formula_variability_monotone() {
        let est = estimator();
        let mut formula = Vec::new();
        let mut last = est.estimate_formula_variability(&formula).profile.overall();
        for i in 0..8 {
            formula.push(FormulaIngredient::new(format!("lecithin {}", i), 0.5));
            let next = est.estimate_formula_variability(&formula).profile.overall();
            assert!(next >= last);
            assert!(next <= 0.08);
            last = next;
        }
    }

    #[test]
    fn test_formula_config_validation() {
        let mut cfg = formula_config();
        assert!(cfg.validate().is_ok());
        cfg.cap = 0.01;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_facility_table_yaml() {
        let yaml = r#"
facilities:
  - name: Plant A
    variability:
      overall: 0.04
default:
  overall: 0.06
"#;
        let table: FacilityTable = serde_yml::from_str(yaml).unwrap();
        assert_eq!(table.facilities().len(), 1);
        assert_eq!(table.default_profile().overall(), 0.06);

        let bad = yaml.replace("0.06", "0.03");
        assert!(serde_yml::from_str::<FacilityTable>(&bad).is_err());
    }
}
