//! Candidate selection and signal extraction for content recommendations.
//!
//! This crate provides:
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - CandidateSelector applying the selection policy to a snapshot
//! - Signal extractors and the parallel SignalExtractor
//!
//! ## Architecture
//! The pipeline processes a request in stages:
//! 1. The selector dedupes the snapshot and filters it (lookback window,
//!    down-voted, already seen, diversity cap, size bound)
//! 2. SignalExtractor computes sub-scores for the surviving candidates
//! 3. Sub-scores go to the scorer for weighting and ranking
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{CandidateSelector, SelectorConfig, SignalExtractor};
//!
//! let selector = CandidateSelector::new(SelectorConfig::default());
//! let candidates = selector.select(snapshot, &context, now)?;
//!
//! let extractor = SignalExtractor::new(reputation.clone());
//! let sub_scores = extractor.extract(&candidates, &context, now);
//! ```

pub mod traits;
pub mod filters;
pub mod filter_pipeline;
pub mod selector;
pub mod signals;
pub mod features;

// Re-export main types
pub use traits::Filter;
pub use filter_pipeline::FilterPipeline;
pub use selector::{CandidateSelector, SelectionError, SelectorConfig};
pub use signals::{InfluenceCurve, RecencyConfig};
pub use features::{SignalExtractor, SubScores};

#[cfg(test)]
pub(crate) mod test_support {
    use content_store::ContentItem;
    use sources::{Candidate, CandidateSource};

    pub fn item(id: &str, category: &str, timestamp: i64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: format!("Title {}", id),
            source: "Wire".to_string(),
            url: format!("https://news.example/{}", id),
            summary: String::new(),
            category: category.to_string(),
            timestamp,
            upvotes: 0,
            downvotes: 0,
        }
    }

    pub fn candidate(id: &str, category: &str, timestamp: i64) -> Candidate {
        Candidate::new(item(id, category, timestamp), CandidateSource::Snapshot)
    }
}
