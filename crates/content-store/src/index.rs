//! Building, querying and persisting the ContentIndex.
//!
//! - Load a snapshot directory (content, users, interactions) in parallel
//! - Validate interaction records
//! - Recency, category and free-text queries
//! - Write the snapshot back after appends

use crate::error::{Result, StoreError};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{info, warn};

pub const CONTENT_FILE: &str = "content.jsonl";
pub const USERS_FILE: &str = "users.jsonl";
pub const INTERACTIONS_FILE: &str = "interactions.jsonl";

impl ContentIndex {
    /// Load a snapshot directory.
    ///
    /// `content.jsonl` is required; `users.jsonl` and `interactions.jsonl`
    /// are optional and treated as empty when absent.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading content snapshot from {:?}", data_dir);

        let content_path = data_dir.join(CONTENT_FILE);
        let users_path = data_dir.join(USERS_FILE);
        let interactions_path = data_dir.join(INTERACTIONS_FILE);

        // Parse all three files in parallel
        let ((content, users), interactions) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_content(&content_path),
                    || optional(parser::parse_users(&users_path)),
                )
            },
            || optional(parser::parse_interactions(&interactions_path)),
        );

        let content = content?;
        let users = users?;
        let interactions = interactions?;

        info!(
            "Loaded {} content items, {} users, {} interactions",
            content.len(),
            users.len(),
            interactions.len()
        );

        let mut index = ContentIndex::new();
        for item in content {
            index.insert_content(item);
        }
        for user in users {
            index.insert_user(user);
        }
        for record in interactions {
            index.insert_interaction(record);
        }

        index.validate()?;
        Ok(index)
    }

    /// Write the full snapshot back to a directory
    pub fn save_to_dir(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;

        let content: Vec<&ContentItem> = self.iter_by_recency().collect();
        parser::write_jsonl(&data_dir.join(CONTENT_FILE), content)?;

        let mut users: Vec<&UserRecord> = self.users.values().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        parser::write_jsonl(&data_dir.join(USERS_FILE), users)?;

        let mut interactions: Vec<&InteractionRecord> =
            self.user_interactions.values().flatten().collect();
        interactions.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        parser::write_jsonl(&data_dir.join(INTERACTIONS_FILE), interactions)?;

        info!("Saved snapshot to {:?}", data_dir);
        Ok(())
    }

    /// Validate data integrity
    ///
    /// Rating interactions must carry +1 or -1. Interactions pointing at
    /// content that has rotated out of the snapshot are kept but logged.
    pub fn validate(&self) -> Result<()> {
        let mut dangling = 0usize;
        for records in self.user_interactions.values() {
            for record in records {
                if record.kind == InteractionKind::Rating && record.vote().is_none() {
                    return Err(StoreError::InvalidValue {
                        field: "rating".to_string(),
                        value: format!("{:?}", record.rating),
                    });
                }
                if !self.content.contains_key(&record.content_id) {
                    dangling += 1;
                }
            }
        }
        if dangling > 0 {
            warn!("{} interactions reference content missing from the snapshot", dangling);
        }
        Ok(())
    }

    /// The `limit` newest items
    pub fn latest(&self, limit: usize) -> Vec<ContentItem> {
        self.iter_by_recency().take(limit).cloned().collect()
    }

    /// The `limit` newest items in a category
    pub fn latest_in_category(&self, category: &str, limit: usize) -> Vec<ContentItem> {
        let key = category.to_lowercase();
        self.iter_by_recency()
            .filter(|item| item.category.to_lowercase() == key)
            .take(limit)
            .cloned()
            .collect()
    }

    /// The `limit` newest items from a source, case-insensitive
    pub fn latest_from_source(&self, source: &str, limit: usize) -> Vec<ContentItem> {
        let key = source.trim().to_lowercase();
        self.iter_by_recency()
            .filter(|item| item.source.trim().to_lowercase() == key)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Case-insensitive free-text match over title and summary.
    ///
    /// Title matches rank ahead of summary-only matches; within a group the
    /// newest item wins.
    pub fn search(&self, text: &str, limit: usize) -> Vec<ContentItem> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut title_hits = Vec::new();
        let mut summary_hits = Vec::new();
        for item in self.iter_by_recency() {
            if item.title.to_lowercase().contains(&needle) {
                title_hits.push(item.clone());
            } else if item.summary.to_lowercase().contains(&needle) {
                summary_hits.push(item.clone());
            }
        }
        title_hits.extend(summary_hits);
        title_hits.truncate(limit);
        title_hits
    }

    /// Remove every interaction made by a user. Returns how many were removed.
    ///
    /// Rating aggregates are recomputed for the content the user had rated.
    pub fn remove_user_interactions(&mut self, user_id: &str) -> usize {
        let Some(removed) = self.user_interactions.remove(user_id) else {
            return 0;
        };

        for record in &removed {
            if let Some(records) = self.content_interactions.get_mut(&record.content_id) {
                records.retain(|r| r.user_id != user_id);
            }
        }
        for record in removed.iter().filter(|r| r.vote().is_some()) {
            let mut aggregate = RatingAggregate::default();
            for vote in self
                .get_content_interactions(&record.content_id)
                .iter()
                .filter_map(InteractionRecord::vote)
            {
                aggregate.record(vote);
            }
            self.rating_aggregates
                .insert(record.content_id.clone(), aggregate);
        }
        removed.len()
    }
}

/// Treat a missing optional file as empty
fn optional<T>(result: Result<Vec<T>>) -> Result<Vec<T>> {
    match result {
        Err(StoreError::FileNotFound { path }) => {
            warn!("{} not found, starting empty", path);
            Ok(Vec::new())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, category: &str, timestamp: i64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: format!("Title {}", id),
            source: "Wire".to_string(),
            url: format!("https://example.com/{}", id),
            summary: String::new(),
            category: category.to_string(),
            timestamp,
            upvotes: 0,
            downvotes: 0,
        }
    }

    fn rating(user: &str, content: &str, value: i8, timestamp: i64) -> InteractionRecord {
        InteractionRecord {
            user_id: user.to_string(),
            content_id: content.to_string(),
            kind: InteractionKind::Rating,
            rating: Some(value),
            timestamp,
        }
    }

    #[test]
    fn test_latest_orders_newest_first_then_id() {
        let mut index = ContentIndex::new();
        index.insert_content(item("b", "Tech", 100));
        index.insert_content(item("a", "Tech", 100));
        index.insert_content(item("c", "Tech", 300));

        let ids: Vec<_> = index.latest(10).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(index.latest(1).len(), 1);
    }

    #[test]
    fn test_reinsert_replaces_indices() {
        let mut index = ContentIndex::new();
        index.insert_content(item("a", "Tech", 100));
        index.insert_content(item("a", "Sports", 500));

        assert_eq!(index.counts().0, 1);
        assert!(index.get_content_by_category("tech").is_empty());
        assert_eq!(index.get_content_by_category("SPORTS").len(), 1);
        assert_eq!(index.latest(10).len(), 1);
    }

    #[test]
    fn test_latest_in_category() {
        let mut index = ContentIndex::new();
        index.insert_content(item("a", "Tech", 100));
        index.insert_content(item("b", "Sports", 200));
        index.insert_content(item("c", "tech", 300));

        let ids: Vec<_> = index
            .latest_in_category("TECH", 10)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_latest_from_source() {
        let mut index = ContentIndex::new();
        let mut wire = item("a", "Tech", 100);
        wire.source = "Wire".to_string();
        let mut ledger = item("b", "Tech", 200);
        ledger.source = "Ledger".to_string();
        let mut newer_wire = item("c", "Sports", 300);
        newer_wire.source = "wire ".to_string();
        index.insert_content(wire);
        index.insert_content(ledger);
        index.insert_content(newer_wire);

        let ids: Vec<_> = index
            .latest_from_source("WIRE", 10)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(index.latest_from_source("wire", 1).len(), 1);
    }

    #[test]
    fn test_search_prefers_title_matches() {
        let mut index = ContentIndex::new();
        let mut summary_only = item("a", "Tech", 300);
        summary_only.summary = "all about rust compilers".to_string();
        let mut in_title = item("b", "Tech", 100);
        in_title.title = "Rust 2.0 released".to_string();
        index.insert_content(summary_only);
        index.insert_content(in_title);
        index.insert_content(item("c", "Tech", 200));

        let ids: Vec<_> = index.search("RUST", 10).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn test_rating_aggregates_and_clear() {
        let mut index = ContentIndex::new();
        index.insert_content(item("a", "Tech", 100));
        index.insert_interaction(rating("u1", "a", 1, 10));
        index.insert_interaction(rating("u1", "a", -1, 11));
        index.insert_interaction(rating("u2", "a", 1, 12));

        let aggregate = index.get_rating_aggregate("a");
        assert_eq!(aggregate.upvotes, 2);
        assert_eq!(aggregate.downvotes, 1);

        assert_eq!(index.remove_user_interactions("u1"), 2);
        assert!(index.get_user_interactions("u1").is_empty());
        assert_eq!(index.get_content_interactions("a").len(), 1);
        assert_eq!(
            index.get_rating_aggregate("a"),
            RatingAggregate { upvotes: 1, downvotes: 0 }
        );
        assert_eq!(index.remove_user_interactions("nobody"), 0);
    }

    #[test]
    fn test_validate_rejects_bad_rating() {
        let mut index = ContentIndex::new();
        index.insert_interaction(rating("u1", "a", 3, 10));
        assert!(matches!(index.validate(), Err(StoreError::InvalidValue { .. })));
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = ContentIndex::new();
        index.insert_content(item("a", "Tech", 100));
        index.insert_content(item("b", "Sports", 200));
        index.insert_user(UserRecord {
            id: "u1".to_string(),
            display_name: "Reader".to_string(),
            preferences: serde_json::json!({"weights": {"Tech": 90}}),
        });
        index.insert_interaction(rating("u1", "a", 1, 10));

        index.save_to_dir(dir.path()).unwrap();
        let loaded = ContentIndex::load_from_dir(dir.path()).unwrap();

        assert_eq!(loaded.counts(), (2, 1, 1));
        assert_eq!(loaded.get_rating_aggregate("a").upvotes, 1);
        assert_eq!(loaded.get_user("u1").unwrap().display_name, "Reader");
    }

    #[test]
    fn test_load_requires_content_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ContentIndex::load_from_dir(dir.path());
        assert!(matches!(result, Err(StoreError::FileNotFound { .. })));
    }
}
