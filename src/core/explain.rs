//! Explanation aggregation - ranks features by their importance across all tests

use std::collections::BTreeMap;

use crate::entities::{display_name, Explanation, FeatureWeight};

/// Number of factors listed on each side of the explanation
pub const TOP_FACTORS: usize = 3;

/// Number of features kept in the importance map
pub const TOP_FEATURES: usize = 10;

/// Base risk value explanations are expressed against
pub const BASE_VALUE: f64 = 50.0;

/// Sum feature weights across tests and renormalize to 1.0
///
/// When every weight is zero the zero mapping is returned as-is.
pub fn aggregate_importances<'a, I>(per_test: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a BTreeMap<String, f64>>,
{
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for importances in per_test {
        for (feature, weight) in importances {
            *totals.entry(feature.clone()).or_insert(0.0) += weight;
        }
    }

    let total: f64 = totals.values().sum();
    if total > 0.0 {
        for weight in totals.values_mut() {
            *weight /= total;
        }
    }
    totals
}

/// Features ordered by weight descending, ties by name ascending
pub fn rank_features(importances: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = importances
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    // BTreeMap order is by name, stable sort keeps it for ties
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Build the global explanation from per-test importance maps
///
/// The top factors are labeled risk-increasing and the bottom factors
/// risk-reducing; with fewer than six features the two lists overlap.
pub fn explain<'a, I>(per_test: I) -> Explanation
where
    I: IntoIterator<Item = &'a BTreeMap<String, f64>>,
{
    let ranked = rank_features(&aggregate_importances(per_test));

    let top_positive_factors = ranked
        .iter()
        .take(TOP_FACTORS)
        .map(|(feature, weight)| format_factor(feature, '+', *weight))
        .collect();

    let bottom_start = ranked.len().saturating_sub(TOP_FACTORS);
    let top_negative_factors = ranked[bottom_start..]
        .iter()
        .map(|(feature, weight)| format_factor(feature, '-', *weight))
        .collect();

    Explanation {
        feature_importance: ranked
            .into_iter()
            .take(TOP_FEATURES)
            .map(|(feature, weight)| FeatureWeight { feature, weight })
            .collect(),
        top_positive_factors,
        top_negative_factors,
        base_value: BASE_VALUE,
    }
}

fn format_factor(feature: &str, sign: char, weight: f64) -> String {
    format!("{} ({}{:.1}%)", display_name(feature), sign, weight * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_aggregate_normalizes() {
        let a = weights(&[("temperature", 0.5), ("mixing_time", 0.5)]);
        let b = weights(&[("temperature", 0.2), ("line_speed", 0.8)]);
        let agg = aggregate_importances([&a, &b]);
        let sum: f64 = agg.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((agg["temperature"] - 0.35).abs() < 1e-12);
        assert!((agg["line_speed"] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_weights_return_zero_mapping() {
        let a = weights(&[("temperature", 0.0), ("mixing_time", 0.0)]);
        let agg = aggregate_importances([&a]);
        assert_eq!(agg.len(), 2);
        assert!(agg.values().all(|v| *v == 0.0));

        let explanation = explain([&a]);
        assert_eq!(explanation.top_positive_factors.len(), 2);
        assert!(explanation.feature_importance.iter().all(|f| f.weight == 0.0));
    }

    #[test]
    fn test_no_tests_is_empty() {
        let explanation = explain(std::iter::empty::<&BTreeMap<String, f64>>());
        assert!(explanation.feature_importance.is_empty());
        assert!(explanation.top_positive_factors.is_empty());
        assert!(explanation.top_negative_factors.is_empty());
    }

    #[test]
    fn test_top_and_bottom_factors() {
        let a = weights(&[
            ("a", 0.30),
            ("b", 0.25),
            ("c", 0.20),
            ("d", 0.12),
            ("e", 0.08),
            ("f", 0.05),
        ]);
        let explanation = explain([&a]);
        assert_eq!(
            explanation.top_positive_factors,
            vec!["A (+30.0%)", "B (+25.0%)", "C (+20.0%)"]
        );
        assert_eq!(
            explanation.top_negative_factors,
            vec!["D (-12.0%)", "E (-8.0%)", "F (-5.0%)"]
        );
    }

    #[test]
    fn test_few_features_overlap() {
        let a = weights(&[("temperature", 0.6), ("mixing_time", 0.4)]);
        let explanation = explain([&a]);
        assert_eq!(explanation.top_positive_factors.len(), 2);
        assert_eq!(explanation.top_negative_factors.len(), 2);
        assert!(explanation.top_positive_factors[0].starts_with("Temperature"));
        assert!(explanation.top_negative_factors[1].starts_with("Mixing Time"));
    }

    #[test]
    fn test_ties_rank_by_name() {
        let a = weights(&[("zeta", 0.25), ("alpha", 0.25), ("mid", 0.25), ("beta", 0.25)]);
        let ranked = rank_features(&aggregate_importances([&a]));
        let names: Vec<_> = ranked.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "mid", "zeta"]);
    }

    #[test]
    fn test_feature_map_keeps_top_ten() {
        let pairs: Vec<(String, f64)> = (0..15).map(|i| (format!("f{:02}", i), 1.0 + i as f64)).collect();
        let map: BTreeMap<String, f64> = pairs.into_iter().collect();
        let explanation = explain([&map]);
        assert_eq!(explanation.feature_importance.len(), TOP_FEATURES);
        assert_eq!(explanation.feature_importance[0].feature, "f14");
        assert_eq!(explanation.feature_importance[9].feature, "f05");
        assert!(explanation
            .feature_importance
            .iter()
            .all(|f| f.feature.as_str() != "f00"));
    }

    #[test]
    fn test_feature_importance_is_heaviest_first() {
        let a = weights(&[("alpha", 0.1), ("mid", 0.6), ("zeta", 0.3)]);
        let explanation = explain([&a]);
        let names: Vec<_> = explanation
            .feature_importance
            .iter()
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(names, vec!["mid", "zeta", "alpha"]);

        let json = serde_json::to_string(&explanation.feature_importance).unwrap();
        let mid = json.find("\"mid\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        assert!(mid < alpha);
    }
}
