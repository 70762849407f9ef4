//! Per-candidate signal extraction.
//!
//! This module runs every signal extractor over the selected candidates
//! and collects the results into one [`SubScores`] record per candidate,
//! ready for the scorer.

use crate::signals::{self, InfluenceCurve, RecencyConfig};
use content_store::{ContentId, Factor, ReputationModel};
use rayon::prelude::*;
use sources::keywords::content_tokens;
use sources::{Candidate, UserContext};
use std::sync::Arc;

/// Sub-scores computed for each candidate, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubScores {
    pub content_id: ContentId,

    pub category_match: f64,
    pub source_reputation: f64,
    pub content_recency: f64,
    pub rating: f64,
    pub user_interaction: f64,
}

impl SubScores {
    /// Neutral sub-scores for a content id
    pub fn neutral(content_id: ContentId) -> Self {
        Self {
            content_id,
            category_match: 0.5,
            source_reputation: 0.5,
            content_recency: 0.0,
            rating: signals::NEUTRAL_RATING,
            user_interaction: 0.0,
        }
    }

    /// Sub-score for one factor
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::CategoryMatch => self.category_match,
            Factor::SourceReputation => self.source_reputation,
            Factor::ContentRecency => self.content_recency,
            Factor::RatingWeight => self.rating,
            Factor::UserInteraction => self.user_interaction,
        }
    }
}

/// Computes sub-scores for candidates in parallel.
///
/// ## Performance Note
/// Uses Rayon for parallel extraction. Output order always matches the
/// input order.
#[derive(Clone)]
pub struct SignalExtractor {
    recency: RecencyConfig,
    curve: InfluenceCurve,
    reputation: Arc<ReputationModel>,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(Arc::new(ReputationModel::empty()))
    }
}

impl SignalExtractor {
    /// Create a new SignalExtractor reading reputations from `reputation`.
    pub fn new(reputation: Arc<ReputationModel>) -> Self {
        Self {
            recency: RecencyConfig::default(),
            curve: InfluenceCurve::default(),
            reputation,
        }
    }

    /// Configure the recency decay
    pub fn with_recency(mut self, recency: RecencyConfig) -> Self {
        self.recency = recency.sanitized();
        self
    }

    /// Configure the rating influence curve (default: linear)
    pub fn with_curve(mut self, curve: InfluenceCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Compute sub-scores for all candidates in parallel.
    ///
    /// # Arguments
    /// * `candidates` - The selected candidates
    /// * `context` - User context for personalized signals
    /// * `now` - Request time, unix seconds
    ///
    /// # Returns
    /// Vec of SubScores, one per candidate, in the same order
    pub fn extract(
        &self,
        candidates: &[Candidate],
        context: &UserContext,
        now: i64,
    ) -> Vec<SubScores> {
        candidates
            .par_iter()
            .map(|candidate| self.extract_single(candidate, context, now))
            .collect()
    }

    /// Compute sub-scores for a single candidate.
    ///
    /// This is called in parallel for each candidate.
    pub fn extract_single(
        &self,
        candidate: &Candidate,
        context: &UserContext,
        now: i64,
    ) -> SubScores {
        let item = &candidate.item;
        let mut scores = SubScores::neutral(item.id.clone());

        scores.category_match = signals::category_match(item, &context.preferences);
        scores.source_reputation = signals::source_reputation(item, &self.reputation);
        scores.content_recency = signals::recency_decay(item, now, &self.recency);
        scores.rating = signals::rating_influence(item, self.curve);

        // Tokenizing is the expensive part; skip it when the signal is off
        if context.has_consent() && !context.keyword_profile.is_empty() {
            let tokens = content_tokens(&item.title, &item.summary);
            scores.user_interaction =
                signals::keyword_affinity(&tokens, &context.keyword_profile, true);
        }

        scores
    }
}
