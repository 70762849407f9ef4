//! Store-backed front door to the orchestrator.
//!
//! [`FeedService`] reads everything a request needs from the collaborator
//! stores and hands the orchestrator a snapshot. Store failures never reach
//! the caller of `recommend_for`: unknown or unreadable preferences become
//! defaults, unreadable history becomes an empty history, and an unreadable
//! snapshot becomes an empty one, which the orchestrator turns into a
//! flagged fallback.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use content_store::{
    ContentItem, ContentStore, InteractionLog, InteractionRecord, PreferenceVector,
    Result, StoreError, UserStore,
};
use sources::{RecentSource, build_user_context};

use crate::orchestrator::{
    Orchestrator, RecommendationRequest, Recommendations, RefreshStatus, ScoringProfile,
};

/// Current time in unix seconds
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Content behind a user's history; ids the store cannot resolve are skipped
fn interacted_content<S: ContentStore>(store: &S, history: &[InteractionRecord]) -> Vec<ContentItem> {
    let ids: BTreeSet<&str> = history.iter().map(|r| r.content_id.as_str()).collect();
    ids.into_iter()
        .filter_map(|id| match store.get(id) {
            Ok(item) => item,
            Err(e) => {
                debug!("Lookup of interacted content {} failed: {}", id, e);
                None
            }
        })
        .collect()
}

/// Wires a store implementing all three collaborator traits to an
/// [`Orchestrator`].
pub struct FeedService<S> {
    store: Arc<RwLock<S>>,
    orchestrator: Orchestrator,
    source: RecentSource,
}

impl<S> FeedService<S>
where
    S: ContentStore + UserStore + InteractionLog + 'static,
{
    pub fn new(store: S, orchestrator: Orchestrator) -> Self {
        let source = RecentSource::new().with_recent_limit(orchestrator.config().snapshot_size);
        Self {
            store: Arc::new(RwLock::new(store)),
            orchestrator,
            source,
        }
    }

    /// Replace the snapshot reader
    pub fn with_source(mut self, source: RecentSource) -> Self {
        self.source = source;
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<RwLock<S>> {
        Arc::clone(&self.store)
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, S>> {
        self.store
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, S>> {
        self.store
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Recommendations for a user at the current time
    pub async fn recommend_for(
        &self,
        user_id: &str,
        limit: Option<usize>,
        profile: ScoringProfile,
    ) -> Recommendations {
        self.recommend_at(user_id, limit, profile, now_unix()).await
    }

    /// Recommendations for a user at a fixed time
    #[instrument(skip(self))]
    pub async fn recommend_at(
        &self,
        user_id: &str,
        limit: Option<usize>,
        profile: ScoringProfile,
        now: i64,
    ) -> Recommendations {
        let mut request = self.build_request(user_id, now).with_profile(profile);
        request.limit = limit;
        self.orchestrator.recommend(request).await
    }

    /// Gather preferences, history and the snapshot for one request.
    ///
    /// Every read degrades independently on failure.
    pub fn build_request(&self, user_id: &str, now: i64) -> RecommendationRequest {
        let store = match self.read_store() {
            Ok(store) => store,
            Err(e) => {
                warn!("Store unreadable for user {}: {}; serving defaults", user_id, e);
                return RecommendationRequest::new(user_id, PreferenceVector::default(), Vec::new(), now)
                    .with_interactions(Vec::new());
            }
        };

        let preferences = match store.preferences(user_id) {
            Ok(Some(raw)) => PreferenceVector::from_value(&raw),
            Ok(None) => {
                debug!("User {} has no stored preferences, using defaults", user_id);
                PreferenceVector::default()
            }
            Err(e) => {
                warn!("Preference read for user {} failed: {}; using defaults", user_id, e);
                PreferenceVector::default()
            }
        };

        let history = store.history(user_id).unwrap_or_else(|e| {
            warn!("History read for user {} failed: {}; scoring without it", user_id, e);
            Vec::new()
        });

        // Learned categories and sources widen the snapshot read
        let interacted = if preferences.tracking_consent {
            interacted_content(&*store, &history)
        } else {
            Vec::new()
        };
        let context = build_user_context(user_id, preferences.clone(), &history, &interacted);
        let content = match self.source.get_snapshot(&*store, &context, now) {
            Ok(candidates) => candidates.into_iter().map(|c| c.item).collect(),
            Err(e) => {
                warn!("Snapshot read for user {} failed: {}", user_id, e);
                Vec::new()
            }
        };

        debug!(
            "Request for user {}: {} snapshot items, {} interactions",
            user_id,
            content.len(),
            history.len()
        );
        RecommendationRequest::new(user_id, preferences, content, now).with_interactions(history)
    }

    /// Log an interaction; votes also bump the item's aggregate counters.
    ///
    /// A vote on content the store does not hold is rejected before
    /// anything is written.
    pub fn record_interaction(&self, record: InteractionRecord) -> Result<()> {
        let mut store = self.write_store()?;
        let vote = record.vote();
        let content_id = record.content_id.clone();

        if vote.is_some() && store.get(&content_id)?.is_none() {
            return Err(StoreError::MissingReference {
                entity: "Content".to_string(),
                id: content_id,
            });
        }

        store.append(record)?;
        if let Some(vote) = vote {
            store.increment_rating(&content_id, vote)?;
        }
        Ok(())
    }

    /// Store a raw preference document and return its normalized form
    pub fn update_preferences(&self, user_id: &str, raw: Value) -> Result<PreferenceVector> {
        let preferences = PreferenceVector::from_value(&raw);
        self.write_store()?.update_preferences(user_id, raw)?;
        Ok(preferences)
    }

    /// Normalized preferences of a user; defaults for unknown users
    pub fn preferences(&self, user_id: &str) -> Result<PreferenceVector> {
        let raw = self.read_store()?.preferences(user_id)?;
        Ok(raw
            .map(|raw| PreferenceVector::from_value(&raw))
            .unwrap_or_default())
    }

    /// Drop a user's interaction history
    pub fn clear_history(&self, user_id: &str) -> Result<usize> {
        let removed = self.write_store()?.clear_user_history(user_id)?;
        info!("Cleared {} interactions for user {}", removed, user_id);
        Ok(removed)
    }

    /// Retrain the reputation model from the whole content store
    pub async fn refresh_model(&self, now: i64) -> RefreshStatus {
        let content = match self.read_store().and_then(|store| store.latest(usize::MAX)) {
            Ok(content) => content,
            Err(e) => {
                warn!("Cannot read content for model refresh: {}", e);
                return RefreshStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };
        self.orchestrator.refresh_model(content, now).await
    }
}
