//! Request-scoped types shared by the retrieval, selection and scoring stages.

use content_store::{ContentId, ContentItem, PreferenceVector, UserId};
use std::collections::HashSet;

// ============================================================================
// Candidate
// ============================================================================

/// Where a candidate entered the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Supplied directly in the caller's content snapshot
    Snapshot,
    /// Newest items from the content store
    Recent,
    /// Newest items in one of the user's preferred categories
    Category,
    /// Free-text match on one of the user's keywords
    Search,
    /// Newest items in a category or from a source the user engages with
    Affinity,
    /// Very fresh items with strong up-vote counts, read for every user
    Trending,
}

/// A content item under consideration for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item: ContentItem,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(item: ContentItem, source: CandidateSource) -> Self {
        Self { item, source }
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }

    pub fn timestamp(&self) -> i64 {
        self.item.timestamp
    }

    pub fn category(&self) -> &str {
        &self.item.category
    }
}

// ============================================================================
// User context
// ============================================================================

/// Everything the engine knows about the requesting user, gathered once.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub user_id: UserId,

    /// Canonical preferences for this request
    pub preferences: PreferenceVector,

    /// Content whose latest rating from this user is a down-vote or dislike
    pub downvoted: HashSet<ContentId>,

    /// Content the user has interacted with in any way.
    /// Empty when tracking consent is off.
    pub seen: HashSet<ContentId>,

    /// Lowercase tokens from explicit keywords and positively
    /// interacted content
    pub keyword_profile: HashSet<String>,

    /// Up to three categories with the highest positive net engagement,
    /// best first. Empty when tracking consent is off.
    pub top_categories: Vec<String>,

    /// Up to three sources with the highest positive net engagement,
    /// best first. Empty when tracking consent is off.
    pub top_sources: Vec<String>,

    /// Number of interaction records that fed this context
    pub interaction_count: usize,
}

impl UserContext {
    /// Context with no history
    pub fn new(user_id: impl Into<UserId>, preferences: PreferenceVector) -> Self {
        Self {
            user_id: user_id.into(),
            preferences,
            downvoted: HashSet::new(),
            seen: HashSet::new(),
            keyword_profile: HashSet::new(),
            top_categories: Vec::new(),
            top_sources: Vec::new(),
            interaction_count: 0,
        }
    }

    pub fn has_consent(&self) -> bool {
        self.preferences.tracking_consent
    }

    pub fn is_downvoted(&self, content_id: &str) -> bool {
        self.downvoted.contains(content_id)
    }

    pub fn has_seen(&self, content_id: &str) -> bool {
        self.seen.contains(content_id)
    }
}
