//! Core domain types for aggregated content, users and interactions.
//!
//! This module defines the fundamental data structures used throughout the
//! system. Content items and interaction records arrive from the collaborator
//! stores; the scoring engine only ever reads snapshots of them.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================
// Both identifiers are opaque strings coming from the document store

/// Opaque identifier of a content item
pub type ContentId = String;

/// Opaque identifier of a user
pub type UserId = String;

// =============================================================================
// Content
// =============================================================================

/// A single piece of aggregated content (article, post, video, ...).
///
/// Immutable once fetched except for the vote counters, which are only
/// changed through [`crate::store::ContentStore::increment_rating`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(alias = "_id")]
    pub id: ContentId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "content_summary")]
    pub summary: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Publish time, unix seconds
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
}

fn default_source() -> String {
    "Unknown".to_string()
}

fn default_category() -> String {
    "General".to_string()
}

impl ContentItem {
    /// Total number of community votes on this item
    pub fn total_votes(&self) -> u64 {
        self.upvotes as u64 + self.downvotes as u64
    }
}

// =============================================================================
// Interactions
// =============================================================================

/// Kind of tracked user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Click,
    Share,
    #[serde(alias = "save")]
    Bookmark,
    Rating,
    Dislike,
}

/// Direction of a community vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    /// Map a +1/-1 rating value to a vote. Anything else is not a vote.
    pub fn from_rating(value: i8) -> Option<Vote> {
        match value {
            1 => Some(Vote::Up),
            -1 => Some(Vote::Down),
            _ => None,
        }
    }
}

/// One tracked user action. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub content_id: ContentId,
    #[serde(rename = "interaction_type", alias = "kind")]
    pub kind: InteractionKind,
    /// +1 / -1, present only for `InteractionKind::Rating`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i8>,
    /// Unix seconds
    #[serde(alias = "created_at")]
    pub timestamp: i64,
}

impl InteractionRecord {
    /// The vote carried by this record, if it is a well-formed rating.
    pub fn vote(&self) -> Option<Vote> {
        match self.kind {
            InteractionKind::Rating => self.rating.and_then(Vote::from_rating),
            _ => None,
        }
    }

    /// Whether this record expresses explicit feedback (a rating or a dislike)
    pub fn is_feedback(&self) -> bool {
        matches!(self.kind, InteractionKind::Rating | InteractionKind::Dislike)
    }
}

/// Aggregate of all rating interactions for one content item, across users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub upvotes: u32,
    pub downvotes: u32,
}

impl RatingAggregate {
    pub fn record(&mut self, vote: Vote) {
        match vote {
            Vote::Up => self.upvotes += 1,
            Vote::Down => self.downvotes += 1,
        }
    }
}

// =============================================================================
// Ranking factors
// =============================================================================

/// The five canonical ranking factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    CategoryMatch,
    SourceReputation,
    ContentRecency,
    RatingWeight,
    UserInteraction,
}

impl Factor {
    /// All factors in canonical order
    pub const ALL: [Factor; 5] = [
        Factor::CategoryMatch,
        Factor::SourceReputation,
        Factor::ContentRecency,
        Factor::RatingWeight,
        Factor::UserInteraction,
    ];

    /// Key used in raw preference documents
    pub fn key(self) -> &'static str {
        match self {
            Factor::CategoryMatch => "category_match",
            Factor::SourceReputation => "source_reputation",
            Factor::ContentRecency => "content_recency",
            Factor::RatingWeight => "rating_weight",
            Factor::UserInteraction => "user_interaction",
        }
    }

    /// Human-readable name used in recommendation reasons
    pub fn label(self) -> &'static str {
        match self {
            Factor::CategoryMatch => "category match",
            Factor::SourceReputation => "source reputation",
            Factor::ContentRecency => "content recency",
            Factor::RatingWeight => "community rating",
            Factor::UserInteraction => "your interests",
        }
    }

    /// Documented default weight on the 0-100 scale
    pub fn default_weight(self) -> f64 {
        match self {
            Factor::CategoryMatch => 50.0,
            Factor::SourceReputation => 30.0,
            Factor::ContentRecency => 40.0,
            Factor::RatingWeight => 50.0,
            Factor::UserInteraction => 45.0,
        }
    }

    pub fn from_key(key: &str) -> Option<Factor> {
        Factor::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Raw per-factor weights on the 0-100 scale, one slot per [`Factor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub category_match: f64,
    pub source_reputation: f64,
    pub content_recency: f64,
    pub rating_weight: f64,
    pub user_interaction: f64,
}

impl FactorWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::CategoryMatch => self.category_match,
            Factor::SourceReputation => self.source_reputation,
            Factor::ContentRecency => self.content_recency,
            Factor::RatingWeight => self.rating_weight,
            Factor::UserInteraction => self.user_interaction,
        }
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        let slot = match factor {
            Factor::CategoryMatch => &mut self.category_match,
            Factor::SourceReputation => &mut self.source_reputation,
            Factor::ContentRecency => &mut self.content_recency,
            Factor::RatingWeight => &mut self.rating_weight,
            Factor::UserInteraction => &mut self.user_interaction,
        };
        *slot = value;
    }

    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|&f| self.get(f)).sum()
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            category_match: Factor::CategoryMatch.default_weight(),
            source_reputation: Factor::SourceReputation.default_weight(),
            content_recency: Factor::ContentRecency.default_weight(),
            rating_weight: Factor::RatingWeight.default_weight(),
            user_interaction: Factor::UserInteraction.default_weight(),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered user. Preferences are kept in their raw, loosely-typed form
/// and normalized per request via [`crate::PreferenceVector::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub preferences: serde_json::Value,
}

// =============================================================================
// ContentIndex - the in-memory document store
// =============================================================================

/// In-memory store holding content, users and the interaction log.
///
/// Provides the lookups the collaborator traits in [`crate::store`] need:
/// latest-by-timestamp, by-category, free-text, per-user and per-content
/// interaction history, and rating aggregates.
#[derive(Debug, Default)]
pub struct ContentIndex {
    // Primary data stores
    pub(crate) content: HashMap<ContentId, ContentItem>,
    pub(crate) users: HashMap<UserId, UserRecord>,

    // Secondary indices
    /// Newest first; ties ordered by id
    pub(crate) recency_index: BTreeSet<(Reverse<i64>, ContentId)>,
    /// Lowercased category -> content ids
    pub(crate) category_index: HashMap<String, Vec<ContentId>>,

    // Interaction log, indexed both ways
    pub(crate) user_interactions: HashMap<UserId, Vec<InteractionRecord>>,
    pub(crate) content_interactions: HashMap<ContentId, Vec<InteractionRecord>>,
    pub(crate) rating_aggregates: HashMap<ContentId, RatingAggregate>,
}

impl ContentIndex {
    /// Creates a new, empty ContentIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a content item by ID
    pub fn get_content(&self, id: &str) -> Option<&ContentItem> {
        self.content.get(id)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Option<&UserRecord> {
        self.users.get(id)
    }

    /// All interactions made by a user, in insertion order
    pub fn get_user_interactions(&self, user_id: &str) -> &[InteractionRecord] {
        self.user_interactions
            .get(user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All interactions recorded against a content item
    pub fn get_content_interactions(&self, content_id: &str) -> &[InteractionRecord] {
        self.content_interactions
            .get(content_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Content ids in a category (case-insensitive)
    pub fn get_content_by_category(&self, category: &str) -> &[ContentId] {
        self.category_index
            .get(&category.to_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Aggregated rating interactions for a content item
    pub fn get_rating_aggregate(&self, content_id: &str) -> RatingAggregate {
        self.rating_aggregates
            .get(content_id)
            .copied()
            .unwrap_or_default()
    }

    /// Every content item, newest first
    pub fn iter_by_recency(&self) -> impl Iterator<Item = &ContentItem> {
        self.recency_index
            .iter()
            .filter_map(|(_, id)| self.content.get(id))
    }

    /// Insert or replace a content item, keeping the secondary indices current
    pub fn insert_content(&mut self, item: ContentItem) {
        if let Some(previous) = self.content.remove(&item.id) {
            self.recency_index
                .remove(&(Reverse(previous.timestamp), previous.id.clone()));
            if let Some(ids) = self
                .category_index
                .get_mut(&previous.category.to_lowercase())
            {
                ids.retain(|id| id != &previous.id);
            }
        }

        self.recency_index
            .insert((Reverse(item.timestamp), item.id.clone()));
        self.category_index
            .entry(item.category.to_lowercase())
            .or_default()
            .push(item.id.clone());
        self.content.insert(item.id.clone(), item);
    }

    /// Insert or replace a user record
    pub fn insert_user(&mut self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }

    /// Append an interaction and update the rating aggregate
    pub fn insert_interaction(&mut self, record: InteractionRecord) {
        if let Some(vote) = record.vote() {
            self.rating_aggregates
                .entry(record.content_id.clone())
                .or_default()
                .record(vote);
        }

        self.content_interactions
            .entry(record.content_id.clone())
            .or_default()
            .push(record.clone());
        self.user_interactions
            .entry(record.user_id.clone())
            .or_default()
            .push(record);
    }

    /// Known user ids, sorted
    pub fn user_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.users.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Get counts for debugging/validation: (content, users, interactions)
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_interactions = self.user_interactions.values().map(|v| v.len()).sum();
        (self.content.len(), self.users.len(), total_interactions)
    }
}
