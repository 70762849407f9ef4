//! Weighting policy: from user-configurable factor weights to a normalized
//! weight per factor.
//!
//! ## Precedence
//! 1. Documented defaults for every factor
//! 2. Factor entries the user supplied (clamped to 0-100, non-finite ignored)
//! 3. The standalone `rating_weight` scalar, which replaces the factor
//!    map's `rating_weight` entry when present
//!
//! The result is divided by its total. A zero total falls back to the
//! normalized defaults.

use content_store::{Factor, FactorWeights, PreferenceVector};
use serde::Serialize;
use tracing::debug;

/// Per-factor weights summing to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedWeights {
    weights: [f64; 5],
}

impl NormalizedWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        self.weights[factor.index()]
    }

    /// Factors and their weights in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl Default for NormalizedWeights {
    fn default() -> Self {
        WeightingPolicy::new().normalize(&FactorWeights::default())
    }
}

/// Resolves and normalizes factor weights
#[derive(Debug, Clone, Default)]
pub struct WeightingPolicy {
    defaults: FactorWeights,
}

impl WeightingPolicy {
    pub fn new() -> Self {
        Self {
            defaults: FactorWeights::default(),
        }
    }

    /// Defaults overlaid with the supplied entries.
    ///
    /// Entries outside 0-100 are clamped; NaN and infinities are skipped.
    pub fn overlay<I>(&self, entries: I) -> FactorWeights
    where
        I: IntoIterator<Item = (Factor, f64)>,
    {
        let mut weights = self.defaults;
        for (factor, value) in entries {
            if value.is_finite() {
                weights.set(factor, value.clamp(0.0, 100.0));
            }
        }
        weights
    }

    /// Pre-normalization weights for a user, with the rating scalar applied
    pub fn effective_raw(&self, prefs: &PreferenceVector) -> FactorWeights {
        let factor_entries = Factor::ALL
            .into_iter()
            .map(|f| (f, prefs.algorithm_weights.get(f)));
        let scalar = prefs
            .rating_weight
            .map(|w| (Factor::RatingWeight, w));

        self.overlay(factor_entries.chain(scalar))
    }

    /// Divide by the total; a zero total yields the normalized defaults
    pub fn normalize(&self, raw: &FactorWeights) -> NormalizedWeights {
        let total = raw.total();
        let source = if total.is_finite() && total > 0.0 {
            raw
        } else {
            debug!("Factor weights sum to {}, using defaults", total);
            &self.defaults
        };
        let total = source.total();

        let mut weights = [0.0; 5];
        for factor in Factor::ALL {
            weights[factor.index()] = source.get(factor) / total;
        }
        NormalizedWeights { weights }
    }

    /// Normalized weights for a user
    pub fn resolve(&self, prefs: &PreferenceVector) -> NormalizedWeights {
        self.normalize(&self.effective_raw(prefs))
    }
}
