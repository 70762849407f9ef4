//! Helper functions to build a UserContext from preferences and history
//!
//! The context is assembled once per request so that filtering and scoring
//! only ever do set lookups.

use crate::keywords::{content_tokens, tokenize};
use crate::types::UserContext;
use content_store::{ContentId, ContentItem, InteractionKind, InteractionRecord, PreferenceVector, Vote};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Number of learned categories and sources kept per user
const TOP_AFFINITIES: usize = 3;

/// Build a UserContext for one request
///
/// - Down-vote set: content whose most recent rating or dislike from this
///   user is negative. Explicit feedback is honoured regardless of consent.
/// - Seen set: every content id in the history, only with tracking consent.
/// - Keyword profile: explicit keywords, plus (with consent) the tokens of
///   content the user engaged with positively on balance.
/// - Top categories and sources: (with consent) the three of each with the
///   highest positive net engagement weight.
///
/// # Arguments
/// * `user_id` - The requesting user
/// * `preferences` - Already-normalized preferences
/// * `history` - The user's interaction records, in log order
/// * `content` - Content available for looking up interacted items
pub fn build_user_context(
    user_id: &str,
    preferences: PreferenceVector,
    history: &[InteractionRecord],
    content: &[ContentItem],
) -> UserContext {
    let mut context = UserContext::new(user_id, preferences);

    // Records for other users are ignored
    let own: Vec<&InteractionRecord> = history
        .iter()
        .filter(|record| record.user_id == user_id)
        .collect();
    context.interaction_count = own.len();

    context.downvoted = compute_downvoted(&own);

    for keyword in &context.preferences.keywords {
        context.keyword_profile.extend(tokenize(keyword));
    }

    if context.has_consent() {
        context.seen = own.iter().map(|record| record.content_id.clone()).collect();
        context
            .keyword_profile
            .extend(compute_interest_tokens(&own, content));

        let (categories, sources) = compute_affinities(&own, content);
        context.top_categories = categories;
        context.top_sources = sources;
    }

    debug!(
        "Built context for user {}: {} interactions, {} down-voted, {} seen, {} profile tokens, top categories {:?}, top sources {:?}",
        context.user_id,
        context.interaction_count,
        context.downvoted.len(),
        context.seen.len(),
        context.keyword_profile.len(),
        context.top_categories,
        context.top_sources
    );

    context
}

/// Engagement weight of one interaction.
///
/// Negative for down-votes and dislikes; malformed ratings count as nothing.
pub fn interaction_weight(record: &InteractionRecord) -> f64 {
    match record.kind {
        InteractionKind::View => 1.0,
        InteractionKind::Click => 1.5,
        InteractionKind::Share => 2.0,
        InteractionKind::Bookmark => 2.0,
        InteractionKind::Rating => match record.vote() {
            Some(Vote::Up) => 3.0,
            Some(Vote::Down) => -1.0,
            None => 0.0,
        },
        InteractionKind::Dislike => -2.0,
    }
}

/// Content ids whose latest feedback record is negative.
///
/// Later timestamps win; equal timestamps resolve to the later log entry.
fn compute_downvoted(history: &[&InteractionRecord]) -> HashSet<ContentId> {
    let mut latest: HashMap<&str, &InteractionRecord> = HashMap::new();
    for &record in history.iter().filter(|r| r.is_feedback()) {
        // Ratings without a usable value carry no feedback
        if record.kind == InteractionKind::Rating && record.vote().is_none() {
            continue;
        }
        latest
            .entry(record.content_id.as_str())
            .and_modify(|current| {
                if record.timestamp >= current.timestamp {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    latest
        .into_iter()
        .filter(|(_, record)| {
            record.kind == InteractionKind::Dislike || record.vote() == Some(Vote::Down)
        })
        .map(|(content_id, _)| content_id.to_string())
        .collect()
}

/// Tokens of every content item with a positive net engagement weight
fn compute_interest_tokens(
    history: &[&InteractionRecord],
    content: &[ContentItem],
) -> HashSet<String> {
    let mut engagement: HashMap<&str, f64> = HashMap::new();
    for record in history {
        *engagement.entry(record.content_id.as_str()).or_insert(0.0) += interaction_weight(record);
    }

    content
        .par_iter()
        .filter(|item| engagement.get(item.id.as_str()).is_some_and(|&w| w > 0.0))
        .map(|item| content_tokens(&item.title, &item.summary))
        .reduce(HashSet::new, |mut acc, tokens| {
            acc.extend(tokens);
            acc
        })
}

/// Lowercased categories and sources ranked by net engagement weight.
///
/// Interactions on content missing from `content` are skipped. Only positive
/// totals are kept; equal totals rank by name.
fn compute_affinities(
    history: &[&InteractionRecord],
    content: &[ContentItem],
) -> (Vec<String>, Vec<String>) {
    let by_id: HashMap<&str, &ContentItem> =
        content.iter().map(|item| (item.id.as_str(), item)).collect();

    let mut categories: HashMap<String, f64> = HashMap::new();
    let mut sources: HashMap<String, f64> = HashMap::new();
    for record in history {
        let Some(item) = by_id.get(record.content_id.as_str()) else {
            continue;
        };
        let weight = interaction_weight(record);
        *categories.entry(item.category.trim().to_lowercase()).or_insert(0.0) += weight;
        *sources.entry(item.source.trim().to_lowercase()).or_insert(0.0) += weight;
    }

    (top_entries(categories), top_entries(sources))
}

fn top_entries(totals: HashMap<String, f64>) -> Vec<String> {
    let mut ranked: Vec<(String, f64)> = totals
        .into_iter()
        .filter(|(name, weight)| *weight > 0.0 && !name.is_empty())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(TOP_AFFINITIES)
        .map(|(name, _)| name)
        .collect()
}
