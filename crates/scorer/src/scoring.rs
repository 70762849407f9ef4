//! Combining sub-scores into a final score, ranking, and explaining.

use crate::weights::NormalizedWeights;
use content_store::{ContentItem, Factor};
use pipeline::SubScores;
use rayon::prelude::*;
use serde::Serialize;
use sources::Candidate;
use std::cmp::Ordering;

/// Highest display score
pub const MAX_SCORE: u8 = 100;

/// Reason used when no factor contributes anything
pub const GENERAL_REASON: &str = "Recommended as general content";

/// One factor's part in a score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorContribution {
    pub factor: Factor,
    /// Extractor output in [0, 1]
    pub sub_score: f64,
    /// Normalized weight
    pub weight: f64,
    /// `weight * sub_score`
    pub contribution: f64,
}

/// Per-factor detail behind a score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// One entry per factor, canonical order
    pub factors: Vec<FactorContribution>,
    /// Sum of contributions, in [0, 1]
    pub raw: f64,
}

impl ScoreBreakdown {
    /// Combine sub-scores with weights. Non-finite sub-scores count as 0.
    pub fn compute(sub_scores: &SubScores, weights: &NormalizedWeights) -> Self {
        let factors: Vec<FactorContribution> = weights
            .iter()
            .map(|(factor, weight)| {
                let sub_score = finite_unit(sub_scores.get(factor));
                FactorContribution {
                    factor,
                    sub_score,
                    weight,
                    contribution: weight * sub_score,
                }
            })
            .collect();
        let raw = factors.iter().map(|f| f.contribution).sum();
        Self { factors, raw }
    }

    /// Display score: `round(100 * raw)` within 0-100
    pub fn score(&self) -> u8 {
        to_display_score(self.raw)
    }

    /// Human-readable justification naming the one or two largest
    /// contributors.
    pub fn reason(&self) -> String {
        let mut contributors: Vec<&FactorContribution> = self
            .factors
            .iter()
            .filter(|f| f.contribution > 0.0)
            .collect();
        if contributors.is_empty() || !(self.raw > 0.0) {
            return GENERAL_REASON.to_string();
        }
        // Stable sort keeps canonical order among equal contributions
        contributors.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
        });

        let first = contributors[0];
        let p1 = percent(first.contribution, self.raw);
        let second = contributors
            .get(1)
            .map(|f| (f, percent(f.contribution, self.raw).min(100 - p1)))
            .filter(|(_, p2)| *p2 > 0);

        match second {
            Some((f, p2)) => format!(
                "Recommended because of {} ({}%) and {} ({}%)",
                first.factor.label(),
                p1,
                f.factor.label(),
                p2
            ),
            None => format!(
                "Recommended because of {} ({}%)",
                first.factor.label(),
                p1
            ),
        }
    }
}

/// A candidate with its final score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: ContentItem,
    pub score: u8,
    pub reason: String,
    pub breakdown: ScoreBreakdown,
}

/// Applies normalized weights to sub-scores
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: NormalizedWeights,
}

impl Scorer {
    pub fn new(weights: NormalizedWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &NormalizedWeights {
        &self.weights
    }

    pub fn breakdown(&self, sub_scores: &SubScores) -> ScoreBreakdown {
        ScoreBreakdown::compute(sub_scores, &self.weights)
    }

    /// Score candidates in parallel.
    ///
    /// `sub_scores[i]` must belong to `candidates[i]`; extra entries on
    /// either side are ignored.
    pub fn score_all(&self, candidates: Vec<Candidate>, sub_scores: &[SubScores]) -> Vec<ScoredItem> {
        candidates
            .into_par_iter()
            .zip(sub_scores.par_iter())
            .map(|(candidate, sub)| {
                let breakdown = self.breakdown(sub);
                ScoredItem {
                    score: breakdown.score(),
                    reason: breakdown.reason(),
                    item: candidate.item,
                    breakdown,
                }
            })
            .collect()
    }
}

/// `round(100 * raw)` clamped to 0-100; NaN maps to 0
pub fn to_display_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    (raw * 100.0).round().clamp(0.0, MAX_SCORE as f64) as u8
}

/// Total ranking order: score desc, timestamp desc, id asc
pub fn compare_ranked(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.item.timestamp.cmp(&a.item.timestamp))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Sort into ranking order and keep the top `limit`
pub fn rank_and_select(mut scored: Vec<ScoredItem>, limit: usize) -> Vec<ScoredItem> {
    scored.sort_by(compare_ranked);
    scored.truncate(limit);
    scored
}

fn percent(part: f64, whole: f64) -> u8 {
    ((part / whole) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn finite_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightingPolicy;
    use content_store::PreferenceVector;
    use sources::CandidateSource;

    fn sub_scores(id: &str, values: [f64; 5]) -> SubScores {
        SubScores {
            content_id: id.to_string(),
            category_match: values[0],
            source_reputation: values[1],
            content_recency: values[2],
            rating: values[3],
            user_interaction: values[4],
        }
    }

    fn item(id: &str, timestamp: i64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: String::new(),
            source: "Wire".to_string(),
            url: String::new(),
            summary: String::new(),
            category: "Tech".to_string(),
            timestamp,
            upvotes: 0,
            downvotes: 0,
        }
    }

    fn scored(id: &str, score: u8, timestamp: i64) -> ScoredItem {
        ScoredItem {
            item: item(id, timestamp),
            score,
            reason: String::new(),
            breakdown: ScoreBreakdown {
                factors: Vec::new(),
                raw: 0.0,
            },
        }
    }

    #[test]
    fn test_display_score_bounds() {
        assert_eq!(to_display_score(0.0), 0);
        assert_eq!(to_display_score(1.0), 100);
        assert_eq!(to_display_score(0.556), 56);
        assert_eq!(to_display_score(0.554), 55);
        assert_eq!(to_display_score(1.7), 100);
        assert_eq!(to_display_score(-0.2), 0);
        assert_eq!(to_display_score(f64::NAN), 0);
    }

    #[test]
    fn test_breakdown_sums_contributions() {
        let weights = WeightingPolicy::new().resolve(&PreferenceVector::default());
        let breakdown = ScoreBreakdown::compute(&sub_scores("a", [1.0, 0.5, 1.0, 0.5, 0.0]), &weights);

        let expected = (50.0 + 15.0 + 40.0 + 25.0) / 215.0;
        assert!((breakdown.raw - expected).abs() < 1e-12);
        assert_eq!(breakdown.score(), 60);
        assert_eq!(breakdown.factors.len(), 5);
    }

    #[test]
    fn test_nan_sub_score_counts_as_zero() {
        let weights = NormalizedWeights::default();
        let breakdown = ScoreBreakdown::compute(&sub_scores("a", [f64::NAN, 0.0, 0.0, 0.0, 0.0]), &weights);
        assert_eq!(breakdown.raw, 0.0);
        assert_eq!(breakdown.reason(), GENERAL_REASON);
    }

    #[test]
    fn test_reason_two_factors() {
        let weights = NormalizedWeights::default();
        // category 50/215, recency 40/215 -> 56% and 44%
        let breakdown = ScoreBreakdown::compute(&sub_scores("a", [1.0, 0.0, 1.0, 0.0, 0.0]), &weights);
        assert_eq!(
            breakdown.reason(),
            "Recommended because of category match (56%) and content recency (44%)"
        );
    }

    #[test]
    fn test_reason_single_factor() {
        let weights = NormalizedWeights::default();
        let breakdown = ScoreBreakdown::compute(&sub_scores("a", [0.0, 0.0, 0.0, 0.0, 0.8]), &weights);
        assert_eq!(breakdown.reason(), "Recommended because of your interests (100%)");
    }

    #[test]
    fn test_reason_ties_use_canonical_order() {
        let weights = WeightingPolicy::new().normalize(&WeightingPolicy::new().overlay(
            Factor::ALL.into_iter().map(|f| (f, 20.0)),
        ));
        let breakdown = ScoreBreakdown::compute(&sub_scores("a", [0.5; 5]), &weights);
        assert_eq!(
            breakdown.reason(),
            "Recommended because of category match (20%) and source reputation (20%)"
        );
    }

    #[test]
    fn test_reason_percentages_never_exceed_100() {
        let weights = NormalizedWeights::default();
        for values in [
            [1.0, 1.0, 0.0, 0.0, 0.0],
            [0.9, 0.0, 0.1, 0.0, 0.0],
            [0.33, 0.33, 0.33, 0.0, 0.0],
            [1.0, 0.001, 0.0, 0.0, 0.0],
        ] {
            let breakdown = ScoreBreakdown::compute(&sub_scores("a", values), &weights);
            let reason = breakdown.reason();
            let total: u32 = reason
                .split('(')
                .skip(1)
                .filter_map(|part| part.split('%').next())
                .filter_map(|n| n.parse::<u32>().ok())
                .sum();
            assert!(total <= 100, "{} sums to {}", reason, total);
        }
    }

    #[test]
    fn test_ranking_order() {
        let ranked = rank_and_select(
            vec![
                scored("b", 70, 100),
                scored("a", 70, 100),
                scored("c", 70, 200),
                scored("d", 90, 0),
            ],
            10,
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.item.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_rank_and_select_truncates() {
        let ranked = rank_and_select((0..20).map(|i| scored(&i.to_string(), i as u8, 0)).collect(), 5);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].score, 19);
    }

    #[test]
    fn test_score_all_is_idempotent() {
        let scorer = Scorer::default();
        let candidates = vec![
            Candidate::new(item("a", 10), CandidateSource::Snapshot),
            Candidate::new(item("b", 20), CandidateSource::Snapshot),
        ];
        let subs = vec![
            sub_scores("a", [0.7, 0.5, 0.3, 0.5, 0.0]),
            sub_scores("b", [0.2, 0.5, 0.9, 0.5, 0.4]),
        ];

        let first = scorer.score_all(candidates.clone(), &subs);
        let second = scorer.score_all(candidates, &subs);
        assert_eq!(first, second);
        assert_eq!(first[0].item.id, "a");
        assert_eq!(first[1].item.id, "b");
    }
}
