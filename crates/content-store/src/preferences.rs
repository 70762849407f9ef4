//! Canonical user preferences and the one step that produces them.
//!
//! Raw preference documents are loosely typed: fields go missing, weights
//! arrive as strings, some clients send camelCase. [`PreferenceVector::from_value`]
//! resolves all of that at the boundary so the scoring code never branches on
//! missing fields.

use crate::types::{Factor, FactorWeights};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Weight used for categories the user never configured
pub const DEFAULT_CATEGORY_WEIGHT: f64 = 50.0;

/// Effective rating weight of a user who configured neither the scalar nor
/// the factor entry.
///
/// It equals the factor default, so an unset scalar is always stored as
/// `None`: `default()`, `from_value(&json!(null))` and `from_value(&json!({}))`
/// produce the same vector.
pub const DEFAULT_RATING_WEIGHT: f64 = 50.0;

/// Category that stands in for every unconfigured category
pub const GENERAL_CATEGORY: &str = "general";

/// Category weights given to a freshly registered user
const REGISTRATION_CATEGORY_WEIGHTS: [(&str, f64); 6] = [
    ("general", 50.0),
    ("tech", 60.0),
    ("business", 50.0),
    ("sports", 40.0),
    ("entertainment", 50.0),
    ("health", 50.0),
];

/// Fully-resolved user preferences.
///
/// Every weight is on the 0-100 scale and already clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceVector {
    /// Lowercased category -> interest weight
    pub category_weights: HashMap<String, f64>,
    /// Per-factor algorithm weights
    pub algorithm_weights: FactorWeights,
    /// Standalone rating weight. When set it takes precedence over
    /// `algorithm_weights.rating_weight`.
    pub rating_weight: Option<f64>,
    /// Whether interaction history may be used at all
    pub tracking_consent: bool,
    /// Explicit interest keywords, lowercased
    pub keywords: Vec<String>,
}

impl Default for PreferenceVector {
    fn default() -> Self {
        Self {
            category_weights: REGISTRATION_CATEGORY_WEIGHTS
                .iter()
                .map(|&(category, weight)| (category.to_string(), weight))
                .collect(),
            algorithm_weights: FactorWeights::default(),
            rating_weight: None,
            tracking_consent: true,
            keywords: Vec::new(),
        }
    }
}

impl PreferenceVector {
    /// The rating weight that actually applies: the scalar when set,
    /// otherwise the factor entry
    pub fn effective_rating_weight(&self) -> f64 {
        self.rating_weight
            .unwrap_or(self.algorithm_weights.rating_weight)
    }

    /// Normalize a raw preference document.
    ///
    /// Never fails: anything that isn't usable falls back to the documented
    /// default for that field.
    pub fn from_value(raw: &Value) -> Self {
        let mut prefs = PreferenceVector::default();
        let Some(doc) = raw.as_object() else {
            return prefs;
        };

        if let Some(weights) = field(doc, &["weights", "category_weights", "categoryWeights"])
            .and_then(Value::as_object)
        {
            prefs.category_weights = weights
                .iter()
                .filter_map(|(category, weight)| {
                    let key = category.trim().to_lowercase();
                    if key.is_empty() {
                        return None;
                    }
                    as_weight(weight).map(|w| (key, w))
                })
                .collect();
        }

        if let Some(factors) = field(doc, &["algorithm_weights", "algorithmWeights"])
            .and_then(Value::as_object)
        {
            for factor in Factor::ALL {
                let camel = camel_case(factor.key());
                let value = factors.get(factor.key()).or_else(|| factors.get(&camel));
                if let Some(weight) = value.and_then(as_weight) {
                    prefs.algorithm_weights.set(factor, weight);
                }
            }
        }

        // The scalar only overrides the factor entry when the document carries
        // a usable one
        prefs.rating_weight =
            field(doc, &["rating_weight", "ratingWeight"]).and_then(as_weight);

        if let Some(consent) =
            field(doc, &["tracking_consent", "trackingConsent"]).and_then(Value::as_bool)
        {
            prefs.tracking_consent = consent;
        }

        if let Some(keywords) = field(doc, &["keywords"]).and_then(Value::as_array) {
            prefs.keywords = keywords
                .iter()
                .filter_map(Value::as_str)
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }

        prefs
    }

    /// Interest weight for a category, case-insensitive.
    ///
    /// Unconfigured categories take the `general` weight if the user set one,
    /// otherwise [`DEFAULT_CATEGORY_WEIGHT`].
    pub fn category_weight(&self, category: &str) -> f64 {
        let key = category.trim().to_lowercase();
        self.category_weights
            .get(&key)
            .or_else(|| self.category_weights.get(GENERAL_CATEGORY))
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_WEIGHT)
    }

    /// Categories weighted above the neutral default, highest first
    pub fn preferred_categories(&self) -> Vec<&str> {
        let mut preferred: Vec<(&str, f64)> = self
            .category_weights
            .iter()
            .filter(|&(_, &w)| w > DEFAULT_CATEGORY_WEIGHT)
            .map(|(c, &w)| (c.as_str(), w))
            .collect();
        preferred.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        preferred.into_iter().map(|(c, _)| c).collect()
    }
}

fn field<'a>(doc: &'a serde_json::Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| doc.get(*name))
}

/// Read a 0-100 weight from a number or numeric string.
fn as_weight(value: &Value) -> Option<f64> {
    let weight = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    weight.is_finite().then(|| weight.clamp(0.0, 100.0))
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_uses_defaults() {
        assert_eq!(PreferenceVector::from_value(&json!(null)), PreferenceVector::default());
        assert_eq!(PreferenceVector::from_value(&json!("oops")), PreferenceVector::default());
        assert_eq!(PreferenceVector::from_value(&json!([1, 2])), PreferenceVector::default());
    }

    #[test]
    fn test_category_weights_are_case_insensitive() {
        let prefs = PreferenceVector::from_value(&json!({"weights": {"Tech": 100, "Sports": 0}}));
        assert_eq!(prefs.category_weight("tech"), 100.0);
        assert_eq!(prefs.category_weight("TECH"), 100.0);
        assert_eq!(prefs.category_weight("Sports"), 0.0);
        // No general entry configured -> neutral default
        assert_eq!(prefs.category_weight("Health"), DEFAULT_CATEGORY_WEIGHT);
    }

    #[test]
    fn test_general_weight_covers_unknown_categories() {
        let prefs = PreferenceVector::from_value(&json!({"weights": {"General": 20}}));
        assert_eq!(prefs.category_weight("Science"), 20.0);
    }

    #[test]
    fn test_malformed_weights_are_dropped_or_clamped() {
        let prefs = PreferenceVector::from_value(&json!({
            "weights": {"Tech": "80", "Sports": "lots", "Health": 250, "Business": -4, "": 10},
            "algorithm_weights": {"category_match": "x", "content_recency": 90}
        }));
        assert_eq!(prefs.category_weight("tech"), 80.0);
        assert_eq!(prefs.category_weight("health"), 100.0);
        assert_eq!(prefs.category_weight("business"), 0.0);
        assert!(!prefs.category_weights.contains_key("sports"));
        assert!(!prefs.category_weights.contains_key(""));
        assert_eq!(prefs.algorithm_weights.category_match, 50.0);
        assert_eq!(prefs.algorithm_weights.content_recency, 90.0);
    }

    #[test]
    fn test_partial_algorithm_weights_keep_defaults() {
        let prefs = PreferenceVector::from_value(&json!({"algorithmWeights": {"userInteraction": 10}}));
        assert_eq!(prefs.algorithm_weights.user_interaction, 10.0);
        assert_eq!(prefs.algorithm_weights.source_reputation, 30.0);
        assert_eq!(prefs.algorithm_weights.rating_weight, 50.0);
    }

    #[test]
    fn test_rating_weight_scalar() {
        let prefs = PreferenceVector::from_value(&json!({"rating_weight": 100}));
        assert_eq!(prefs.rating_weight, Some(100.0));

        let cleared = PreferenceVector::from_value(&json!({"rating_weight": null}));
        assert_eq!(cleared.rating_weight, None);

        let garbage = PreferenceVector::from_value(&json!({"rating_weight": {"a": 1}}));
        assert_eq!(garbage.rating_weight, None);

        let absent = PreferenceVector::from_value(&json!({"algorithm_weights": {"rating_weight": 10}}));
        assert_eq!(absent.rating_weight, None);
        assert_eq!(absent.algorithm_weights.rating_weight, 10.0);

        assert_eq!(prefs.effective_rating_weight(), 100.0);
        assert_eq!(absent.effective_rating_weight(), 10.0);
    }

    #[test]
    fn test_all_default_documents_agree() {
        let defaults = PreferenceVector::default();
        assert_eq!(defaults.rating_weight, None);
        assert_eq!(defaults.effective_rating_weight(), DEFAULT_RATING_WEIGHT);

        assert_eq!(PreferenceVector::from_value(&json!(null)), defaults);
        assert_eq!(PreferenceVector::from_value(&json!({})), defaults);
        assert_eq!(PreferenceVector::from_value(&json!("not a document")), defaults);
    }

    #[test]
    fn test_consent_and_keywords() {
        let prefs = PreferenceVector::from_value(&json!({
            "tracking_consent": false,
            "keywords": [" Rust ", 7, "", "AI"]
        }));
        assert!(!prefs.tracking_consent);
        assert_eq!(prefs.keywords, vec!["rust".to_string(), "ai".to_string()]);

        let bad_consent = PreferenceVector::from_value(&json!({"tracking_consent": "no"}));
        assert!(bad_consent.tracking_consent);
    }

    #[test]
    fn test_preferred_categories() {
        let prefs = PreferenceVector::from_value(&json!({"weights": {"Tech": 90, "Sports": 70, "News": 50}}));
        assert_eq!(prefs.preferred_categories(), vec!["tech", "sports"]);
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("category_match"), "categoryMatch");
        assert_eq!(camel_case("user_interaction"), "userInteraction");
    }
}
