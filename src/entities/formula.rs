//! Formula and process inputs - the planned recipe and line setup for one prediction

use serde::{Deserialize, Serialize};

/// One ingredient of a planned formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaIngredient {
    /// Ingredient name (e.g. "Cocoa powder")
    pub name: String,

    /// Share of the formula in percent (0-100)
    pub percentage: f64,

    /// Supplier of the ingredient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl FormulaIngredient {
    /// Create an ingredient without supplier information
    pub fn new(name: impl Into<String>, percentage: f64) -> Self {
        Self {
            name: name.into(),
            percentage,
            supplier: None,
        }
    }

    /// Set the supplier
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Feature name used by estimators for this ingredient's share
    pub fn feature_name(&self) -> String {
        format!("{}_percentage", self.name.trim().to_lowercase())
    }
}

/// Process readings for one production setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameters {
    /// Process temperature (°C)
    pub temperature: f64,

    /// Mixing time (minutes)
    pub mixing_time: f64,

    /// Line speed (m/min)
    pub line_speed: f64,

    /// Pressure (bar)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,

    /// Relative humidity (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Product pH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
}

impl ProcessParameters {
    /// Create process parameters with the required readings only
    pub fn new(temperature: f64, mixing_time: f64, line_speed: f64) -> Self {
        Self {
            temperature,
            mixing_time,
            line_speed,
            pressure: None,
            humidity: None,
            ph: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn with_humidity(mut self, humidity: f64) -> Self {
        self.humidity = Some(humidity);
        self
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = Some(ph);
        self
    }

    /// Readings that were actually supplied, required ones first
    pub fn provided_readings(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("temperature", Some(self.temperature)),
            ("mixing_time", Some(self.mixing_time)),
            ("line_speed", Some(self.line_speed)),
            ("pressure", self.pressure),
            ("humidity", self.humidity),
            ("ph", self.ph),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }

    /// Name of the first reading that is NaN or infinite, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.provided_readings()
            .find(|(_, v)| !v.is_finite())
            .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_name_is_lowercased() {
        let ing = FormulaIngredient::new("  Lecithin ", 0.4);
        assert_eq!(ing.feature_name(), "lecithin_percentage");
    }

    #[test]
    fn test_provided_readings_skip_absent_optionals() {
        let params = ProcessParameters::new(75.0, 12.0, 90.0).with_ph(6.8);
        let names: Vec<_> = params.provided_readings().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["temperature", "mixing_time", "line_speed", "ph"]);
    }

    #[test]
    fn test_first_non_finite() {
        let params = ProcessParameters::new(75.0, 12.0, 90.0);
        assert_eq!(params.first_non_finite(), None);

        let params = ProcessParameters::new(75.0, f64::NAN, 90.0);
        assert_eq!(params.first_non_finite(), Some("mixing_time"));

        let params = ProcessParameters::new(75.0, 12.0, 90.0).with_humidity(f64::INFINITY);
        assert_eq!(params.first_non_finite(), Some("humidity"));
    }

    #[test]
    fn test_ingredient_yaml_without_supplier() {
        let ing: FormulaIngredient =
            serde_yml::from_str("name: Sugar\npercentage: 40.5").unwrap();
        assert_eq!(ing.name, "Sugar");
        assert!(ing.supplier.is_none());
    }
}
