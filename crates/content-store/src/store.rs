//! Collaborator interfaces the recommendation engine reads from and writes to.
//!
//! The engine itself only consumes snapshots. These traits describe the
//! stores that produce those snapshots so that an in-memory [`ContentIndex`],
//! a database-backed implementation, or a test double can be swapped in.

use crate::error::{Result, StoreError};
use crate::types::*;
use serde_json::Value;

/// Read/write access to aggregated content
pub trait ContentStore: Send + Sync {
    /// The `limit` newest items
    fn latest(&self, limit: usize) -> Result<Vec<ContentItem>>;

    /// The `limit` newest items in a category (case-insensitive)
    fn by_category(&self, category: &str, limit: usize) -> Result<Vec<ContentItem>>;

    /// The `limit` newest items from a source (case-insensitive)
    fn by_source(&self, source: &str, limit: usize) -> Result<Vec<ContentItem>>;

    /// Free-text match over title and summary
    fn search(&self, text: &str, limit: usize) -> Result<Vec<ContentItem>>;

    fn get(&self, id: &str) -> Result<Option<ContentItem>>;

    /// Bump the aggregate vote counter of a content item
    fn increment_rating(&mut self, id: &str, vote: Vote) -> Result<()>;
}

/// Access to user records and their raw preferences
pub trait UserStore: Send + Sync {
    /// Raw preference document for a user, `None` if the user is unknown
    fn preferences(&self, user_id: &str) -> Result<Option<Value>>;

    /// Replace a user's preferences, creating the user if needed
    fn update_preferences(&mut self, user_id: &str, preferences: Value) -> Result<()>;
}

/// Append-only log of user actions
pub trait InteractionLog: Send + Sync {
    fn append(&mut self, record: InteractionRecord) -> Result<()>;

    /// Every interaction made by a user
    fn history(&self, user_id: &str) -> Result<Vec<InteractionRecord>>;

    /// Every interaction recorded against a content item
    fn for_content(&self, content_id: &str) -> Result<Vec<InteractionRecord>>;

    /// Count of rating interactions across all users
    fn ratings_aggregate(&self, content_id: &str) -> Result<RatingAggregate>;

    /// Privacy control: drop a user's whole history. Returns the number removed.
    fn clear_user_history(&mut self, user_id: &str) -> Result<usize>;
}

impl ContentStore for ContentIndex {
    fn latest(&self, limit: usize) -> Result<Vec<ContentItem>> {
        Ok(ContentIndex::latest(self, limit))
    }

    fn by_category(&self, category: &str, limit: usize) -> Result<Vec<ContentItem>> {
        Ok(self.latest_in_category(category, limit))
    }

    fn by_source(&self, source: &str, limit: usize) -> Result<Vec<ContentItem>> {
        Ok(self.latest_from_source(source, limit))
    }

    fn search(&self, text: &str, limit: usize) -> Result<Vec<ContentItem>> {
        Ok(ContentIndex::search(self, text, limit))
    }

    fn get(&self, id: &str) -> Result<Option<ContentItem>> {
        Ok(self.get_content(id).cloned())
    }

    fn increment_rating(&mut self, id: &str, vote: Vote) -> Result<()> {
        let item = self
            .content
            .get_mut(id)
            .ok_or_else(|| StoreError::MissingReference {
                entity: "Content".to_string(),
                id: id.to_string(),
            })?;
        match vote {
            Vote::Up => item.upvotes = item.upvotes.saturating_add(1),
            Vote::Down => item.downvotes = item.downvotes.saturating_add(1),
        }
        Ok(())
    }
}

impl UserStore for ContentIndex {
    fn preferences(&self, user_id: &str) -> Result<Option<Value>> {
        Ok(self.get_user(user_id).map(|u| u.preferences.clone()))
    }

    fn update_preferences(&mut self, user_id: &str, preferences: Value) -> Result<()> {
        self.users
            .entry(user_id.to_string())
            .and_modify(|user| user.preferences = preferences.clone())
            .or_insert_with(|| UserRecord {
                id: user_id.to_string(),
                display_name: String::new(),
                preferences,
            });
        Ok(())
    }
}

impl InteractionLog for ContentIndex {
    fn append(&mut self, record: InteractionRecord) -> Result<()> {
        if record.kind == InteractionKind::Rating && record.vote().is_none() {
            return Err(StoreError::InvalidValue {
                field: "rating".to_string(),
                value: format!("{:?}", record.rating),
            });
        }
        self.insert_interaction(record);
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<InteractionRecord>> {
        Ok(self.get_user_interactions(user_id).to_vec())
    }

    fn for_content(&self, content_id: &str) -> Result<Vec<InteractionRecord>> {
        Ok(self.get_content_interactions(content_id).to_vec())
    }

    fn ratings_aggregate(&self, content_id: &str) -> Result<RatingAggregate> {
        Ok(self.get_rating_aggregate(content_id))
    }

    fn clear_user_history(&mut self, user_id: &str) -> Result<usize> {
        Ok(self.remove_user_interactions(user_id))
    }
}
