//! Recent Source - snapshot retrieval from the content store
//!
//! Builds the content snapshot for one request out of several store reads:
//! - Recency: the newest items overall
//! - Category: the newest items in each category the user weights above neutral
//! - Affinity: the newest items in the user's top engaged categories and sources
//! - Search: free-text matches on the user's explicit keywords
//! - Trending: very fresh items with strong up-vote counts, for every user
//!
//! Results are merged with the first occurrence of an id winning, then
//! ordered newest first. The recency read is required; the others are
//! best-effort and only logged when they fail.

use crate::types::{Candidate, CandidateSource, UserContext};
use content_store::{ContentId, ContentItem, ContentStore, Result};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

const HOUR_SECS: i64 = 3_600;

/// Retrieves the per-request content snapshot
#[derive(Debug, Clone)]
pub struct RecentSource {
    /// Newest items to read overall
    recent_limit: usize,

    /// Newest items to read per preferred category (0 disables)
    per_category: usize,

    /// Newest items to read per learned category or source (0 disables)
    per_affinity: usize,

    /// Matches to read per explicit keyword (0 disables)
    per_keyword: usize,

    /// Newest items scanned for trending content (0 disables)
    trending_scan: usize,

    /// Maximum age of a trending item
    trending_window_hours: i64,

    /// Up-votes a trending item must exceed
    trending_min_upvotes: u32,
}

impl Default for RecentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentSource {
    /// Create a new source with default limits
    pub fn new() -> Self {
        Self {
            recent_limit: 200,
            per_category: 20,
            per_affinity: 20,
            per_keyword: 10,
            trending_scan: 1_000,
            trending_window_hours: 12,
            trending_min_upvotes: 10,
        }
    }

    /// Configure how many of the newest items to read (default: 200)
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Configure items read per preferred category (default: 20)
    pub fn with_per_category(mut self, limit: usize) -> Self {
        self.per_category = limit;
        self
    }

    /// Configure items read per learned category or source (default: 20)
    pub fn with_per_affinity(mut self, limit: usize) -> Self {
        self.per_affinity = limit;
        self
    }

    /// Configure items read per explicit keyword (default: 10)
    pub fn with_per_keyword(mut self, limit: usize) -> Self {
        self.per_keyword = limit;
        self
    }

    /// Configure how many of the newest items are scanned for trending
    /// content (default: 1000)
    pub fn with_trending_scan(mut self, limit: usize) -> Self {
        self.trending_scan = limit;
        self
    }

    /// Configure what counts as trending: younger than `window_hours` and
    /// more than `min_upvotes` up-votes (default: 12 hours, 10 up-votes)
    pub fn with_trending(mut self, window_hours: i64, min_upvotes: u32) -> Self {
        self.trending_window_hours = window_hours;
        self.trending_min_upvotes = min_upvotes;
        self
    }

    /// Read the snapshot for a user
    ///
    /// # Arguments
    /// * `store` - Content to read from
    /// * `context` - The requesting user's context
    /// * `now` - Request time in unix seconds, for the trending window
    ///
    /// # Returns
    /// * `Ok(Vec<Candidate>)` - Distinct candidates, newest first
    /// * `Err` - If the recency read fails
    #[instrument(skip(self, store, context), fields(user_id = %context.user_id))]
    pub fn get_snapshot(
        &self,
        store: &dyn ContentStore,
        context: &UserContext,
        now: i64,
    ) -> Result<Vec<Candidate>> {
        let mut seen_ids: HashSet<ContentId> = HashSet::new();
        let mut candidates = Vec::new();

        let mut push = |items: Vec<ContentItem>, source: CandidateSource| {
            for item in items {
                if seen_ids.insert(item.id.clone()) {
                    candidates.push(Candidate::new(item, source));
                }
            }
        };

        push(store.latest(self.recent_limit)?, CandidateSource::Recent);

        if self.per_category > 0 {
            for category in context.preferences.preferred_categories() {
                match store.by_category(category, self.per_category) {
                    Ok(items) => push(items, CandidateSource::Category),
                    Err(e) => warn!("Category read for {} failed: {}", category, e),
                }
            }
        }

        if self.per_affinity > 0 {
            for category in &context.top_categories {
                match store.by_category(category, self.per_affinity) {
                    Ok(items) => push(items, CandidateSource::Affinity),
                    Err(e) => warn!("Affinity read for category {} failed: {}", category, e),
                }
            }
            for source in &context.top_sources {
                match store.by_source(source, self.per_affinity) {
                    Ok(items) => push(items, CandidateSource::Affinity),
                    Err(e) => warn!("Affinity read for source {} failed: {}", source, e),
                }
            }
        }

        if self.per_keyword > 0 {
            for keyword in &context.preferences.keywords {
                match store.search(keyword, self.per_keyword) {
                    Ok(items) => push(items, CandidateSource::Search),
                    Err(e) => warn!("Keyword search for {:?} failed: {}", keyword, e),
                }
            }
        }

        if self.trending_scan > 0 {
            match store.latest(self.trending_scan) {
                Ok(items) => push(self.trending(items, now), CandidateSource::Trending),
                Err(e) => warn!("Trending read failed: {}", e),
            }
        }

        candidates.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.id().cmp(b.id()))
        });

        debug!("Retrieved {} snapshot candidates", candidates.len());
        Ok(candidates)
    }

    /// Items inside the trending window with enough up-votes
    fn trending(&self, items: Vec<ContentItem>, now: i64) -> Vec<ContentItem> {
        let cutoff = now.saturating_sub(self.trending_window_hours.saturating_mul(HOUR_SECS));
        items
            .into_iter()
            .filter(|item| item.timestamp > cutoff)
            .filter(|item| item.upvotes > self.trending_min_upvotes)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_store::{ContentIndex, ContentItem, PreferenceVector, StoreError, Vote};

    const NOW: i64 = 100_000;
    const HOUR: i64 = 3_600;

    fn item(id: &str, category: &str, title: &str, timestamp: i64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            source: "Wire".to_string(),
            url: String::new(),
            summary: String::new(),
            category: category.to_string(),
            timestamp,
            upvotes: 0,
            downvotes: 0,
        }
    }

    fn create_test_index() -> ContentIndex {
        let mut index = ContentIndex::new();
        index.insert_content(item("t1", "Tech", "Chip shortage eases", 100));
        index.insert_content(item("t2", "Tech", "Open source funding", 200));
        index.insert_content(item("s1", "Sports", "Cup final tonight", 300));
        index.insert_content(item("s2", "Sports", "Marathon record", 400));
        index.insert_content(item("h1", "Health", "Sleep and memory", 500));
        index
    }

    fn context_with(prefs: PreferenceVector) -> UserContext {
        UserContext::new("u1", prefs)
    }

    #[test]
    fn test_recent_only() {
        let index = create_test_index();
        let source = RecentSource::new()
            .with_recent_limit(2)
            .with_per_category(0)
            .with_per_keyword(0);

        let snapshot = source
            .get_snapshot(&index, &context_with(PreferenceVector::default()), NOW)
            .unwrap();
        let ids: Vec<_> = snapshot.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["h1", "s2"]);
        assert!(snapshot.iter().all(|c| c.source == CandidateSource::Recent));
    }

    #[test]
    fn test_category_and_keyword_reads_merge() {
        let index = create_test_index();
        let mut prefs = PreferenceVector::default();
        prefs.category_weights.clear();
        prefs.category_weights.insert("tech".to_string(), 90.0);
        prefs.keywords = vec!["marathon".to_string()];

        let source = RecentSource::new().with_recent_limit(1);
        let snapshot = source.get_snapshot(&index, &context_with(prefs), NOW).unwrap();

        let ids: Vec<_> = snapshot.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["h1", "s2", "t2", "t1"]);
        assert_eq!(snapshot[1].source, CandidateSource::Search);
        assert_eq!(snapshot[2].source, CandidateSource::Category);
    }

    #[test]
    fn test_duplicates_keep_first_source() {
        let index = create_test_index();
        let mut prefs = PreferenceVector::default();
        prefs.category_weights.clear();
        prefs.category_weights.insert("health".to_string(), 80.0);

        let snapshot = RecentSource::new()
            .get_snapshot(&index, &context_with(prefs), NOW)
            .unwrap();
        assert_eq!(snapshot.len(), 5);
        let h1 = snapshot.iter().find(|c| c.id() == "h1").unwrap();
        assert_eq!(h1.source, CandidateSource::Recent);
    }

    #[test]
    fn test_learned_affinities_widen_snapshot() {
        let mut index = create_test_index();
        let mut ledger = item("b1", "Business", "Rates on hold", 50);
        ledger.source = "Ledger".to_string();
        index.insert_content(ledger);

        let mut context = context_with(PreferenceVector::default());
        context.top_categories = vec!["tech".to_string()];
        context.top_sources = vec!["ledger".to_string()];

        let source = RecentSource::new()
            .with_recent_limit(1)
            .with_per_category(0)
            .with_per_keyword(0);
        let snapshot = source.get_snapshot(&index, &context, NOW).unwrap();

        let ids: Vec<_> = snapshot.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["h1", "t2", "t1", "b1"]);
        assert!(snapshot[1..].iter().all(|c| c.source == CandidateSource::Affinity));

        // Disabled reads leave only the recency read
        let snapshot = source
            .with_per_affinity(0)
            .get_snapshot(&index, &context, NOW)
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_fresh_popular_items_always_included() {
        let mut index = ContentIndex::new();
        let mut newest = item("n1", "Tech", "Newest", NOW - HOUR);
        newest.upvotes = 1;
        let mut hot = item("hot", "Sports", "Popular and fresh", NOW - 11 * HOUR);
        hot.upvotes = 11;
        let mut lukewarm = item("warm", "Sports", "Fresh but quiet", NOW - 2 * HOUR);
        lukewarm.upvotes = 10;
        let mut stale = item("old", "Sports", "Popular but old", NOW - 13 * HOUR);
        stale.upvotes = 500;
        for content in [newest, hot, lukewarm, stale] {
            index.insert_content(content);
        }

        let source = RecentSource::new()
            .with_recent_limit(1)
            .with_per_category(0)
            .with_per_keyword(0);
        let snapshot = source
            .get_snapshot(&index, &context_with(PreferenceVector::default()), NOW)
            .unwrap();

        let ids: Vec<_> = snapshot.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["n1", "hot"]);
        assert_eq!(snapshot[1].source, CandidateSource::Trending);

        // A wider window and lower bar pick up the rest
        let snapshot = source
            .with_trending(24, 9)
            .get_snapshot(&index, &context_with(PreferenceVector::default()), NOW)
            .unwrap();
        assert_eq!(snapshot.len(), 4);
    }

    struct Unreachable;

    impl ContentStore for Unreachable {
        fn latest(&self, _limit: usize) -> Result<Vec<ContentItem>> {
            Err(StoreError::Unavailable("content store offline".to_string()))
        }
        fn by_category(&self, _category: &str, _limit: usize) -> Result<Vec<ContentItem>> {
            Err(StoreError::Unavailable("content store offline".to_string()))
        }
        fn by_source(&self, _source: &str, _limit: usize) -> Result<Vec<ContentItem>> {
            Err(StoreError::Unavailable("content store offline".to_string()))
        }
        fn search(&self, _text: &str, _limit: usize) -> Result<Vec<ContentItem>> {
            Err(StoreError::Unavailable("content store offline".to_string()))
        }
        fn get(&self, _id: &str) -> Result<Option<ContentItem>> {
            Ok(None)
        }
        fn increment_rating(&mut self, _id: &str, _vote: Vote) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unavailable_store_propagates() {
        let result = RecentSource::new()
            .get_snapshot(&Unreachable, &context_with(PreferenceVector::default()), NOW);
        assert!(matches!(result, Err(e) if e.is_unavailable()));
    }
}
