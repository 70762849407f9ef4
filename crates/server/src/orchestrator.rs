//! # Recommendation Orchestrator
//!
//! This module coordinates one recommendation request end to end:
//! 1. Build the user context (down-votes, seen set, keyword profile)
//! 2. Select candidates from the content snapshot
//! 3. Extract sub-scores in parallel
//! 4. Weight, score and explain each candidate
//! 5. Rank and cut to the requested limit
//!
//! ## States
//! `Idle -> Selecting -> Scoring -> Ranking -> Done`, or `Fallback` from
//! anywhere. The public entry points never return an error: an empty
//! candidate set, a timeout, cancellation or a worker panic all end in a
//! clearly flagged fallback result.
//!
//! ## Concurrency
//! The engine is CPU-bound and runs on `spawn_blocking` under a timeout.
//! A shared cancellation flag is checked between stages so a timed-out
//! worker stops early; its result is discarded either way. The reputation
//! model is swapped atomically behind a lock, so concurrent requests see
//! either the old model or the new one.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use content_store::{ContentItem, InteractionRecord, PreferenceVector, ReputationModel, UserId};
use pipeline::{CandidateSelector, SelectionError, SignalExtractor};
use scorer::{rank_and_select, ScoreBreakdown, Scorer, WeightingPolicy};
use sources::build_user_context;

use crate::config::EngineConfig;
use crate::fallback::{FallbackProvider, StaticFallback};

// ============================================================================
// Request / response types
// ============================================================================

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Selecting,
    Scoring,
    Ranking,
    Done,
    Fallback,
}

/// How much work a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringProfile {
    /// Scores and reasons
    #[default]
    Standard,
    /// Also per-factor breakdowns; gets the longer timeout
    Detailed,
}

/// Why a result set is synthetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    EmptyCandidateSet,
    Timeout,
    Cancelled,
    WorkerFailed,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FallbackReason::EmptyCandidateSet => "no candidates qualified",
            FallbackReason::Timeout => "engine timed out",
            FallbackReason::Cancelled => "request cancelled",
            FallbackReason::WorkerFailed => "engine worker failed",
        };
        f.write_str(text)
    }
}

/// Everything the engine needs for one request
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    pub preferences: PreferenceVector,
    /// Content snapshot to choose from
    pub content: Vec<ContentItem>,
    /// The user's interaction history; `None` when not supplied
    pub interactions: Option<Vec<InteractionRecord>>,
    /// Requested result count; `None` uses the configured default
    pub limit: Option<usize>,
    /// Request time, unix seconds
    pub now: i64,
    pub profile: ScoringProfile,
}

impl RecommendationRequest {
    pub fn new(
        user_id: impl Into<UserId>,
        preferences: PreferenceVector,
        content: Vec<ContentItem>,
        now: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            preferences,
            content,
            interactions: None,
            limit: None,
            now,
            profile: ScoringProfile::Standard,
        }
    }

    pub fn with_interactions(mut self, interactions: Vec<InteractionRecord>) -> Self {
        self.interactions = Some(interactions);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_profile(mut self, profile: ScoringProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// One returned item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub content: ContentItem,
    /// 0-100
    pub score: u8,
    pub reason: String,
    /// Present for `ScoringProfile::Detailed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

/// Result of a request, genuine or fallback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub items: Vec<Recommendation>,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl Recommendations {
    fn genuine(items: Vec<Recommendation>) -> Self {
        Self {
            items,
            fallback: false,
            fallback_reason: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Content ids in result order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|r| r.content.id.as_str()).collect()
    }
}

/// Outcome of a model refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshStatus {
    Completed { sources: usize, trained_at: i64 },
    Failed { reason: String },
}

impl RefreshStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RefreshStatus::Completed { .. })
    }
}

/// Internal failures, all of which end in the fallback path
#[derive(Error, Debug)]
enum EngineError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("cancelled between stages")]
    Cancelled,
}

impl EngineError {
    fn fallback_reason(&self) -> FallbackReason {
        match self {
            EngineError::Selection(SelectionError::EmptyCandidateSet) => {
                FallbackReason::EmptyCandidateSet
            }
            EngineError::Selection(SelectionError::Filter(_)) => FallbackReason::WorkerFailed,
            EngineError::Cancelled => FallbackReason::Cancelled,
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs recommendation requests. Cheap to clone; clones share the model.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<EngineConfig>,
    selector: CandidateSelector,
    policy: WeightingPolicy,
    reputation: Arc<RwLock<Arc<ReputationModel>>>,
    fallback: Arc<dyn FallbackProvider>,
}

impl Orchestrator {
    /// Create an orchestrator with an empty reputation model and the
    /// static fallback provider
    pub fn new(config: EngineConfig) -> Self {
        let selector = CandidateSelector::new(config.selector.clone());
        Self {
            config: Arc::new(config),
            selector,
            policy: WeightingPolicy::new(),
            reputation: Arc::new(RwLock::new(Arc::new(ReputationModel::empty()))),
            fallback: Arc::new(StaticFallback),
        }
    }

    /// Start with a loaded reputation model
    pub fn with_reputation(self, model: ReputationModel) -> Self {
        self.install_model(model);
        self
    }

    /// Replace the fallback provider
    pub fn with_fallback(mut self, provider: impl FallbackProvider + 'static) -> Self {
        self.fallback = Arc::new(provider);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The model current requests score against
    pub fn reputation(&self) -> Arc<ReputationModel> {
        let guard = self.reputation.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new reputation model
    pub fn install_model(&self, model: ReputationModel) {
        let mut guard = self.reputation.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(model);
    }

    fn timeout_for(&self, profile: ScoringProfile) -> Duration {
        match profile {
            ScoringProfile::Standard => self.config.standard_timeout(),
            ScoringProfile::Detailed => self.config.detailed_timeout(),
        }
    }

    /// Main entry point: recommendations for one request, under the
    /// profile's timeout.
    pub async fn recommend(&self, request: RecommendationRequest) -> Recommendations {
        self.recommend_cancellable(request, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Like [`Orchestrator::recommend`], with a caller-owned cancellation flag.
    ///
    /// Raising the flag makes the worker stop at its next stage boundary and
    /// the request fall back. The flag is also raised on timeout.
    #[instrument(skip(self, request, cancel), fields(user_id = %request.user_id))]
    pub async fn recommend_cancellable(
        &self,
        request: RecommendationRequest,
        cancel: Arc<AtomicBool>,
    ) -> Recommendations {
        let user_id = request.user_id.clone();
        let limit = self.config.clamp_limit(request.limit);
        let now = request.now;
        let budget = self.timeout_for(request.profile);

        let engine = self.clone();
        let flag = Arc::clone(&cancel);
        let worker = tokio::task::spawn_blocking(move || engine.run(request, &flag));

        match tokio::time::timeout(budget, worker).await {
            Ok(Ok(Ok(items))) => Recommendations::genuine(items),
            Ok(Ok(Err(e))) => self.serve_fallback(&user_id, limit, now, e.fallback_reason(), &e.to_string()),
            Ok(Err(join_error)) => self.serve_fallback(
                &user_id,
                limit,
                now,
                FallbackReason::WorkerFailed,
                &join_error.to_string(),
            ),
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                self.serve_fallback(
                    &user_id,
                    limit,
                    now,
                    FallbackReason::Timeout,
                    &format!("no result within {:?}", budget),
                )
            }
        }
    }

    /// Synchronous entry point without a timeout, for callers that are
    /// already off the async runtime.
    pub fn recommend_blocking(&self, request: RecommendationRequest) -> Recommendations {
        let user_id = request.user_id.clone();
        let limit = self.config.clamp_limit(request.limit);
        let now = request.now;
        let cancel = AtomicBool::new(false);

        match panic::catch_unwind(AssertUnwindSafe(|| self.run(request, &cancel))) {
            Ok(Ok(items)) => Recommendations::genuine(items),
            Ok(Err(e)) => self.serve_fallback(&user_id, limit, now, e.fallback_reason(), &e.to_string()),
            Err(_) => self.serve_fallback(
                &user_id,
                limit,
                now,
                FallbackReason::WorkerFailed,
                "engine panicked",
            ),
        }
    }

    /// Run the engine stages. Called on a blocking thread.
    fn run(
        &self,
        request: RecommendationRequest,
        cancel: &AtomicBool,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let start_time = Instant::now();
        let RecommendationRequest {
            user_id,
            preferences,
            content,
            interactions,
            limit,
            now,
            profile,
        } = request;
        let limit = self.config.clamp_limit(limit);

        // Selection
        transition(&user_id, Stage::Idle, Stage::Selecting);
        let history = interactions.unwrap_or_default();
        let context = build_user_context(&user_id, preferences, &history, &content);
        let snapshot_size = content.len();
        let candidates = self.selector.select(content, &context, now)?;
        info!(
            "Selected {} of {} snapshot items for user {} ({:.2?})",
            candidates.len(),
            snapshot_size,
            user_id,
            start_time.elapsed()
        );
        checkpoint(cancel)?;

        // Scoring
        transition(&user_id, Stage::Selecting, Stage::Scoring);
        let extractor = SignalExtractor::new(self.reputation())
            .with_recency(self.config.recency)
            .with_curve(self.config.rating_curve);
        let sub_scores = extractor.extract(&candidates, &context, now);
        let weights = self.policy.resolve(&context.preferences);
        let scored = Scorer::new(weights).score_all(candidates, &sub_scores);
        info!(
            "Scored {} candidates for user {} ({:.2?})",
            scored.len(),
            user_id,
            start_time.elapsed()
        );
        checkpoint(cancel)?;

        // Ranking
        transition(&user_id, Stage::Scoring, Stage::Ranking);
        let detailed = profile == ScoringProfile::Detailed;
        let recommendations: Vec<Recommendation> = rank_and_select(scored, limit)
            .into_iter()
            .map(|scored| Recommendation {
                content: scored.item,
                score: scored.score,
                reason: scored.reason,
                breakdown: detailed.then_some(scored.breakdown),
            })
            .collect();

        transition(&user_id, Stage::Ranking, Stage::Done);
        info!(
            "Total time to recommend {} items for user {}: {:.2?}",
            recommendations.len(),
            user_id,
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    fn serve_fallback(
        &self,
        user_id: &str,
        limit: usize,
        now: i64,
        reason: FallbackReason,
        detail: &str,
    ) -> Recommendations {
        warn!(
            "Serving fallback for user {}: {} ({})",
            user_id, reason, detail
        );
        info!("user {}: -> {:?}", user_id, Stage::Fallback);
        let mut items = self.fallback.placeholders(limit, now);
        items.truncate(limit);
        Recommendations {
            items,
            fallback: true,
            fallback_reason: Some(reason),
        }
    }

    /// Retrain the reputation model out-of-band and swap it in.
    ///
    /// Runs on its own blocking task under the refresh timeout. When a
    /// model path is configured the new model is persisted before it is
    /// installed. On failure the current model stays in place.
    #[instrument(skip(self, content), fields(items = content.len()))]
    pub async fn refresh_model(&self, content: Vec<ContentItem>, now: i64) -> RefreshStatus {
        let start_time = Instant::now();
        let budget = self.config.refresh_timeout();
        let model_path = self.config.model_path.clone();

        let worker = tokio::task::spawn_blocking(move || -> content_store::Result<ReputationModel> {
            let model = ReputationModel::train(&content, now);
            if let Some(path) = model_path {
                model.save(&path)?;
            }
            Ok(model)
        });

        let status = match tokio::time::timeout(budget, worker).await {
            Ok(Ok(Ok(model))) => {
                let status = RefreshStatus::Completed {
                    sources: model.sources.len(),
                    trained_at: model.trained_at,
                };
                self.install_model(model);
                status
            }
            Ok(Ok(Err(e))) => RefreshStatus::Failed {
                reason: format!("failed to persist model: {}", e),
            },
            Ok(Err(join_error)) => RefreshStatus::Failed {
                reason: format!("training task failed: {}", join_error),
            },
            Err(_) => RefreshStatus::Failed {
                reason: format!("training exceeded {:?}", budget),
            },
        };

        match &status {
            RefreshStatus::Completed { sources, .. } => info!(
                "Reputation model refreshed: {} sources ({:.2?})",
                sources,
                start_time.elapsed()
            ),
            RefreshStatus::Failed { reason } => warn!("Reputation model refresh failed: {}", reason),
        }
        status
    }
}

fn transition(user_id: &str, from: Stage, to: Stage) {
    info!("user {}: {:?} -> {:?}", user_id, from, to);
}

fn checkpoint(cancel: &AtomicBool) -> Result<(), EngineError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}
