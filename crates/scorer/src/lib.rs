//! Weighting and scoring for content recommendations.
//!
//! This crate turns the per-candidate sub-scores produced by the pipeline
//! into ranked, explained results. It handles:
//! - Resolving user factor weights against defaults and normalizing them
//! - Combining sub-scores into a 0-100 integer score
//! - Deterministic ranking (score, then recency, then id)
//! - Reason strings naming the dominant factors
//!
//! ## Example Usage
//! ```ignore
//! use scorer::{rank_and_select, Scorer, WeightingPolicy};
//!
//! let weights = WeightingPolicy::new().resolve(&context.preferences);
//! let scored = Scorer::new(weights).score_all(candidates, &sub_scores);
//! let top = rank_and_select(scored, 10);
//! ```

pub mod weights;
pub mod scoring;

pub use scoring::{
    compare_ranked, rank_and_select, to_display_score, FactorContribution, ScoreBreakdown,
    ScoredItem, Scorer, GENERAL_REASON,
};
pub use weights::{NormalizedWeights, WeightingPolicy};

#[cfg(test)]
mod tests {
    use super::*;
    use content_store::{ContentItem, PreferenceVector};
    use pipeline::SignalExtractor;
    use serde_json::json;
    use sources::{Candidate, CandidateSource, UserContext};

    const NOW: i64 = 1_700_000_000;

    fn item(id: &str, category: &str, timestamp: i64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: String::new(),
            source: "Wire".to_string(),
            url: String::new(),
            summary: String::new(),
            category: category.to_string(),
            timestamp,
            upvotes: 4,
            downvotes: 1,
        }
    }

    fn run(prefs: PreferenceVector, items: Vec<ContentItem>) -> Vec<ScoredItem> {
        let context = UserContext::new("u1", prefs);
        let candidates: Vec<Candidate> = items
            .into_iter()
            .map(|i| Candidate::new(i, CandidateSource::Snapshot))
            .collect();
        let subs = SignalExtractor::default().extract(&candidates, &context, NOW);
        let weights = WeightingPolicy::new().resolve(&context.preferences);
        rank_and_select(Scorer::new(weights).score_all(candidates, &subs), 10)
    }

    #[test]
    fn test_preferred_category_ranks_first() {
        let prefs = PreferenceVector::from_value(&json!({"weights": {"Tech": 100, "Sports": 0}}));
        let ranked = run(prefs, vec![item("s", "Sports", NOW), item("t", "Tech", NOW)]);

        assert_eq!(ranked[0].item.id, "t");
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked[0].reason.starts_with("Recommended because of category match"));
    }

    #[test]
    fn test_newer_item_wins_tie() {
        let ranked = run(
            PreferenceVector::default(),
            vec![item("old", "Tech", NOW - 10), item("new", "Tech", NOW)],
        );
        assert_eq!(ranked[0].item.id, "new");
    }
}
