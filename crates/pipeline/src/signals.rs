//! Signal extractors.
//!
//! Each extractor turns one content item plus request context into a
//! sub-score in `[0, 1]`. Extractors never fail: malformed input (NaN
//! weights, empty text, bad configuration) yields the neutral value for that
//! signal instead.

use content_store::{ContentItem, PreferenceVector, ReputationModel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sub-score given to items nobody has rated
pub const NEUTRAL_RATING: f64 = 0.5;

/// Keeps the rating ratio finite when both counters are zero
pub const RATING_EPSILON: f64 = 1e-9;

const NEUTRAL_CATEGORY: f64 = 0.5;

// ============================================================================
// Configuration
// ============================================================================

/// Shape of the recency decay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecencyConfig {
    /// Decay constant: `exp(-age_hours / half_life_hours)`
    pub half_life_hours: f64,
    /// Items older than this always score `floor`
    pub cutoff_hours: f64,
    /// Minimum recency sub-score
    pub floor: f64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 24.0,
            cutoff_hours: 14.0 * 24.0,
            floor: 0.05,
        }
    }
}

impl RecencyConfig {
    /// Replace unusable fields with their defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            half_life_hours: positive_or(self.half_life_hours, defaults.half_life_hours),
            cutoff_hours: positive_or(self.cutoff_hours, defaults.cutoff_hours),
            floor: if self.floor.is_finite() {
                self.floor.clamp(0.0, 1.0)
            } else {
                defaults.floor
            },
        }
    }
}

/// Mapping from the raw upvote ratio to the rating sub-score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfluenceCurve {
    /// The ratio itself
    #[default]
    Linear,
    /// Shrinks toward 0.5 by `prior_weight` phantom votes split evenly
    Smoothed { prior_weight: f64 },
    /// Logistic curve centred on 0.5, rescaled so 0 -> 0 and 1 -> 1
    Sigmoid { steepness: f64 },
}

impl InfluenceCurve {
    /// Sub-score for the given vote counts, assuming at least one vote
    fn apply(self, upvotes: f64, downvotes: f64) -> f64 {
        let ratio = upvotes / (upvotes + downvotes + RATING_EPSILON);
        match self {
            InfluenceCurve::Linear => ratio,
            InfluenceCurve::Smoothed { prior_weight } => {
                if !(prior_weight.is_finite() && prior_weight > 0.0) {
                    return ratio;
                }
                (upvotes + 0.5 * prior_weight) / (upvotes + downvotes + prior_weight)
            }
            InfluenceCurve::Sigmoid { steepness } => {
                if !(steepness.is_finite() && steepness > 0.0) {
                    return ratio;
                }
                let logistic = |x: f64| 1.0 / (1.0 + (-steepness * (x - 0.5)).exp());
                let low = logistic(0.0);
                let high = logistic(1.0);
                (logistic(ratio) - low) / (high - low)
            }
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// User interest in the item's category, from the preference weights.
pub fn category_match(item: &ContentItem, prefs: &PreferenceVector) -> f64 {
    unit_or(prefs.category_weight(&item.category) / 100.0, NEUTRAL_CATEGORY)
}

/// Exponential freshness with a floor.
///
/// Future timestamps count as age 0. Past the cutoff the value is exactly
/// the floor.
pub fn recency_decay(item: &ContentItem, now: i64, config: &RecencyConfig) -> f64 {
    let config = config.sanitized();
    let age_secs = now.saturating_sub(item.timestamp).max(0);
    let age_hours = age_secs as f64 / 3600.0;

    if age_hours > config.cutoff_hours {
        return config.floor;
    }
    let decayed = (-age_hours / config.half_life_hours).exp();
    unit_or(decayed.max(config.floor), config.floor)
}

/// Community rating through the configured curve; 0.5 when unrated.
pub fn rating_influence(item: &ContentItem, curve: InfluenceCurve) -> f64 {
    if item.total_votes() == 0 {
        return NEUTRAL_RATING;
    }
    unit_or(
        curve.apply(item.upvotes as f64, item.downvotes as f64),
        NEUTRAL_RATING,
    )
}

/// Reputation of the item's source from the trained model.
pub fn source_reputation(item: &ContentItem, model: &ReputationModel) -> f64 {
    unit_or(
        model.reputation(&item.source),
        content_store::reputation::NEUTRAL_REPUTATION,
    )
}

/// Overlap coefficient between item tokens and the user's keyword profile.
///
/// `|T ∩ P| / min(|T|, |P|)`; 0 without consent, without a profile, or for
/// items with no usable tokens.
pub fn keyword_affinity(
    item_tokens: &HashSet<String>,
    profile: &HashSet<String>,
    consent: bool,
) -> f64 {
    if !consent || profile.is_empty() || item_tokens.is_empty() {
        return 0.0;
    }
    let (smaller, larger) = if item_tokens.len() <= profile.len() {
        (item_tokens, profile)
    } else {
        (profile, item_tokens)
    };
    let shared = smaller.iter().filter(|t| larger.contains(*t)).count();
    unit_or(shared as f64 / smaller.len() as f64, 0.0)
}

fn unit_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
