//! Recommendation rules - ordered, deterministic advice from a finished prediction

use serde::{Deserialize, Serialize};

use crate::entities::{FormulaIngredient, ProcessParameters, TestVerdict};

/// Maximum number of recommendations returned
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Message returned when no rule fires
pub const WITHIN_SPEC_MESSAGE: &str = "Parameters within specification - proceed with pilot batch";

/// Trigger levels of the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Risk score above which a full review is advised
    pub critical_risk: f64,

    /// Risk score above which process adjustments are advised
    pub elevated_risk: f64,

    /// Process temperature ceiling (°C)
    pub max_temperature: f64,

    /// Line speed ceiling (m/min)
    pub max_line_speed: f64,

    /// Mixing time floor (min)
    pub min_mixing_time: f64,

    /// Relative humidity ceiling (%)
    pub max_humidity: f64,

    /// Accepted pH range
    pub ph_range: [f64; 2],

    /// Ingredient name substrings that count as a stabilizer
    pub stabilizers: Vec<String>,

    /// Test key substrings identifying solubility tests
    pub solubility_tests: Vec<String>,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            critical_risk: 50.0,
            elevated_risk: 30.0,
            max_temperature: 80.0,
            max_line_speed: 100.0,
            min_mixing_time: 10.0,
            max_humidity: 60.0,
            ph_range: [6.0, 7.5],
            stabilizers: vec!["lecithin".to_string(), "lecitina".to_string()],
            solubility_tests: vec!["solubility".to_string(), "solubilidade".to_string()],
        }
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack.contains(&n.to_lowercase()))
}

/// Evaluate the rules in order and keep the first five that fire
pub fn recommend(
    risk_score: f64,
    verdicts: &[TestVerdict],
    process: &ProcessParameters,
    formula: &[FormulaIngredient],
    thresholds: &RecommendationThresholds,
) -> Vec<String> {
    let mut out = Vec::new();

    if risk_score > thresholds.critical_risk {
        out.push("Critical risk detected - review the complete formula before the pilot".to_string());
    } else if risk_score > thresholds.elevated_risk {
        out.push("Elevated risk - process parameter adjustments recommended".to_string());
    }

    if process.temperature > thresholds.max_temperature {
        out.push("Reduce process temperature to 75-78 °C to improve stability".to_string());
    }

    if process.line_speed > thresholds.max_line_speed {
        out.push("Reduce line speed to 90-95 m/min to improve quality".to_string());
    }

    if process.mixing_time < thresholds.min_mixing_time {
        out.push("Increase mixing time to 12-15 minutes for better homogenization".to_string());
    }

    let has_stabilizer = formula
        .iter()
        .any(|ing| contains_any(&ing.name, &thresholds.stabilizers));
    let solubility_at_risk = verdicts.iter().any(|v| {
        v.status.is_at_risk() && contains_any(&v.test_key, &thresholds.solubility_tests)
    });
    if !has_stabilizer && solubility_at_risk {
        out.push("Add lecithin (0.3-0.5%) to improve solubility".to_string());
    }

    if process.humidity.is_some_and(|h| h > thresholds.max_humidity) {
        out.push("Control ambient humidity to protect shelf life".to_string());
    }

    let [ph_low, ph_high] = thresholds.ph_range;
    if let Some(ph) = process.ph.filter(|ph| *ph < ph_low || *ph > ph_high) {
        out.push(format!(
            "Adjust pH ({:.1}) into the {:.1}-{:.1} range",
            ph, ph_low, ph_high
        ));
    }

    if out.is_empty() {
        out.push(WITHIN_SPEC_MESSAGE.to_string());
    }
    out.truncate(MAX_RECOMMENDATIONS);
    out
}
