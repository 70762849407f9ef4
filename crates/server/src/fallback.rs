//! Placeholder recommendations served when genuine scoring cannot run.
//!
//! The provider is a seam: production uses [`StaticFallback`], tests and
//! embedders can inject their own.

use crate::orchestrator::Recommendation;
use content_store::ContentItem;

/// Supplies clearly-synthetic items for the fallback path
pub trait FallbackProvider: Send + Sync {
    /// Up to `limit` placeholder recommendations at time `now`
    fn placeholders(&self, limit: usize, now: i64) -> Vec<Recommendation>;
}

/// Reason attached to every placeholder of a category
pub fn placeholder_reason(category: &str) -> String {
    format!("Recommended because it's a {} article", category)
}

/// Five fixed placeholder articles, one per common category.
///
/// Output is deterministic for a given `now`.
#[derive(Debug, Clone, Default)]
pub struct StaticFallback;

/// (title, source, category, age in hours)
const PLACEHOLDERS: [(&str, &str, &str, i64); 5] = [
    ("Tech Innovations This Week", "TechCrunch", "Tech", 2),
    ("Global Market Report", "Financial Times", "Business", 5),
    ("Championship Finals Recap", "Sports Network", "Sports", 8),
    ("New Breakthrough in Medical Research", "Health Journal", "Health", 12),
    ("Film Festival Winners Announced", "Entertainment Weekly", "Entertainment", 18),
];

impl FallbackProvider for StaticFallback {
    fn placeholders(&self, limit: usize, now: i64) -> Vec<Recommendation> {
        PLACEHOLDERS
            .iter()
            .enumerate()
            .take(limit)
            .map(|(i, &(title, source, category, age_hours))| {
                let item = ContentItem {
                    id: format!("fallback-{}", i + 1),
                    title: title.to_string(),
                    source: source.to_string(),
                    url: String::new(),
                    summary: String::new(),
                    category: category.to_string(),
                    timestamp: now.saturating_sub(age_hours * 3600),
                    upvotes: 0,
                    downvotes: 0,
                };
                Recommendation {
                    content: item,
                    score: 0,
                    reason: placeholder_reason(category),
                    breakdown: None,
                }
            })
            .collect()
    }
}
