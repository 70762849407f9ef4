//! Candidate selection: which content items get scored for a request.
//!
//! ## Stages
//! 0. Dedupe by content id (newest copy wins) and order newest first
//! 1. Lookback window
//! 2. Down-voted content (always on)
//! 3. Already-seen content (toggle; needs tracking consent)
//! 4. Category diversity cap (toggle, default off)
//! 5. Size bound, keeping the most recent

use crate::filter_pipeline::FilterPipeline;
use crate::filters::*;
use content_store::ContentItem;
use serde::{Deserialize, Serialize};
use sources::{Candidate, CandidateSource, UserContext};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the selector
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("no candidates left after filtering")]
    EmptyCandidateSet,

    #[error("filter failed: {0}")]
    Filter(#[from] anyhow::Error),
}

/// Selector policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Drop items older than this many days; `None` disables the window
    pub lookback_days: Option<u32>,
    /// Drop content the user already interacted with
    pub exclude_seen: bool,
    /// Enable the per-category run cap
    pub diversity: bool,
    /// Longest run of one category kept in diversity mode
    pub max_consecutive: usize,
    /// Upper bound on candidates handed to scoring
    pub max_candidates: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            lookback_days: Some(30),
            exclude_seen: true,
            diversity: false,
            max_consecutive: 3,
            max_candidates: 200,
        }
    }
}

/// Applies the selection policy to a content snapshot
#[derive(Debug, Clone, Default)]
pub struct CandidateSelector {
    config: SelectorConfig,
}

impl CandidateSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Filter pipeline for one request
    fn pipeline(&self, now: i64) -> FilterPipeline {
        FilterPipeline::new()
            .add_filter(LookbackFilter::new(now, self.config.lookback_days))
            .add_filter(DislikedFilter)
            .add_filter_if(self.config.exclude_seen, AlreadySeenFilter)
            .add_filter_if(
                self.config.diversity,
                CategoryCapFilter::new(self.config.max_consecutive),
            )
            .add_filter(SizeBoundFilter::new(self.config.max_candidates))
    }

    /// Select candidates from a snapshot.
    ///
    /// # Arguments
    /// * `content` - The caller's content snapshot, any order, may repeat ids
    /// * `context` - User context for exclusion decisions
    /// * `now` - Request time, unix seconds
    ///
    /// # Returns
    /// * `Ok(Vec<Candidate>)` - Non-empty, newest first
    /// * `Err(SelectionError::EmptyCandidateSet)` - Nothing survived
    pub fn select(
        &self,
        content: Vec<ContentItem>,
        context: &UserContext,
        now: i64,
    ) -> Result<Vec<Candidate>, SelectionError> {
        let snapshot_size = content.len();
        let candidates = dedupe_newest_first(content);
        debug!(
            "Snapshot of {} items holds {} distinct candidates",
            snapshot_size,
            candidates.len()
        );

        let selected = self.pipeline(now).apply(candidates, context)?;
        if selected.is_empty() {
            return Err(SelectionError::EmptyCandidateSet);
        }
        Ok(selected)
    }
}

/// Keep one copy per content id (the newest; the first seen on a tie) and
/// order by timestamp desc, then id asc.
pub fn dedupe_newest_first(content: Vec<ContentItem>) -> Vec<Candidate> {
    let mut newest: HashMap<String, ContentItem> = HashMap::with_capacity(content.len());
    for item in content {
        let replace = newest
            .get(&item.id)
            .is_none_or(|existing| item.timestamp > existing.timestamp);
        if replace {
            newest.insert(item.id.clone(), item);
        }
    }

    let mut candidates: Vec<Candidate> = newest
        .into_values()
        .map(|item| Candidate::new(item, CandidateSource::Snapshot))
        .collect();
    candidates.sort_by(|a, b| {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| a.id().cmp(b.id()))
    });
    candidates
}
