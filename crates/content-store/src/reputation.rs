//! Source reputation model.
//!
//! Built out-of-band from the whole content store and persisted as JSON.
//! Per-request scoring only ever reads a loaded model; it never trains.
//!
//! Reputation of a source is the Laplace-smoothed share of upvotes across all
//! of its items: `(up + 1) / (up + down + 2)`. A source with no votes sits at
//! exactly 0.5.

use crate::error::Result;
use crate::types::ContentItem;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Reputation used for sources the model has never seen
pub const NEUTRAL_REPUTATION: f64 = 0.5;

/// Aggregated statistics for one source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub items: u32,
    pub upvotes: u64,
    pub downvotes: u64,
    /// Smoothed upvote share in [0, 1]
    pub reputation: f64,
}

/// Persisted reputation artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationModel {
    /// Unix seconds at which the model was trained
    pub trained_at: i64,
    /// Lowercased source name -> stats
    pub sources: BTreeMap<String, SourceStats>,
}

impl Default for ReputationModel {
    fn default() -> Self {
        Self::empty()
    }
}

impl ReputationModel {
    /// A model that knows no sources; every lookup is neutral.
    pub fn empty() -> Self {
        Self {
            trained_at: 0,
            sources: BTreeMap::new(),
        }
    }

    /// Aggregate votes per source in parallel.
    pub fn train(items: &[ContentItem], now: i64) -> Self {
        let totals: HashMap<String, (u32, u64, u64)> = items
            .par_iter()
            .fold(HashMap::new, |mut acc: HashMap<String, (u32, u64, u64)>, item| {
                let entry = acc.entry(item.source.trim().to_lowercase()).or_default();
                entry.0 += 1;
                entry.1 += item.upvotes as u64;
                entry.2 += item.downvotes as u64;
                acc
            })
            .reduce(HashMap::new, |mut left, right| {
                for (source, (items, up, down)) in right {
                    let entry = left.entry(source).or_default();
                    entry.0 += items;
                    entry.1 += up;
                    entry.2 += down;
                }
                left
            });

        let sources = totals
            .into_iter()
            .map(|(source, (items, upvotes, downvotes))| {
                let reputation = smoothed_reputation(upvotes, downvotes);
                (
                    source,
                    SourceStats {
                        items,
                        upvotes,
                        downvotes,
                        reputation,
                    },
                )
            })
            .collect();

        Self {
            trained_at: now,
            sources,
        }
    }

    /// Reputation of a source, case-insensitive; neutral when unknown
    pub fn reputation(&self, source: &str) -> f64 {
        self.sources
            .get(&source.trim().to_lowercase())
            .map(|stats| stats.reputation)
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL_REPUTATION)
    }

    /// Whether the model is older than `max_age_secs` at `now`
    pub fn is_stale(&self, now: i64, max_age_secs: i64) -> bool {
        now.saturating_sub(self.trained_at) >= max_age_secs
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Reuse a fresh persisted model, otherwise retrain and persist.
    ///
    /// A model that fails to save is still returned; the next call retrains.
    pub fn load_or_train(path: &Path, items: &[ContentItem], now: i64, max_age_secs: i64) -> Self {
        match Self::load(path) {
            Ok(model) if !model.is_stale(now, max_age_secs) => {
                info!(
                    "Loaded reputation model ({} sources, age {}s)",
                    model.sources.len(),
                    now - model.trained_at
                );
                return model;
            }
            Ok(_) => info!("Reputation model at {:?} is stale, retraining", path),
            Err(e) => info!("No usable reputation model at {:?} ({}), training", path, e),
        }

        let model = Self::train(items, now);
        if let Err(e) = model.save(path) {
            warn!("Failed to save reputation model to {:?}: {}", path, e);
        }
        model
    }
}

fn smoothed_reputation(upvotes: u64, downvotes: u64) -> f64 {
    (upvotes as f64 + 1.0) / ((upvotes + downvotes) as f64 + 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, source: &str, upvotes: u32, downvotes: u32) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: String::new(),
            source: source.to_string(),
            url: String::new(),
            summary: String::new(),
            category: "General".to_string(),
            timestamp: 0,
            upvotes,
            downvotes,
        }
    }

    #[test]
    fn test_train_aggregates_per_source() {
        let items = vec![
            item("1", "Wire", 8, 0),
            item("2", "wire", 0, 0),
            item("3", "Tabloid", 1, 9),
        ];
        let model = ReputationModel::train(&items, 1_000);

        let wire = model.sources["wire"];
        assert_eq!(wire.items, 2);
        assert_eq!(wire.upvotes, 8);
        assert!((model.reputation("WIRE") - 0.9).abs() < 1e-12);
        assert!((model.reputation("Tabloid") - 2.0 / 12.0).abs() < 1e-12);
        assert_eq!(model.trained_at, 1_000);
    }

    #[test]
    fn test_unknown_and_unrated_sources_are_neutral() {
        let model = ReputationModel::train(&[item("1", "Quiet", 0, 0)], 0);
        assert_eq!(model.reputation("Quiet"), NEUTRAL_REPUTATION);
        assert_eq!(model.reputation("Elsewhere"), NEUTRAL_REPUTATION);
        assert_eq!(ReputationModel::empty().reputation("x"), NEUTRAL_REPUTATION);
    }

    #[test]
    fn test_staleness() {
        let model = ReputationModel::train(&[], 100);
        assert!(!model.is_stale(150, 100));
        assert!(model.is_stale(200, 100));
    }

    #[test]
    fn test_save_load_and_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("reputation.json");
        let items = vec![item("1", "Wire", 3, 1)];

        let trained = ReputationModel::load_or_train(&path, &items, 1_000, 86_400);
        assert!(path.exists());

        // Fresh artifact is reused even though the content changed
        let reused = ReputationModel::load_or_train(&path, &[], 2_000, 86_400);
        assert_eq!(reused.trained_at, trained.trained_at);
        assert!(reused.sources.contains_key("wire"));

        // Stale artifact is retrained
        let retrained = ReputationModel::load_or_train(&path, &[], 1_000 + 86_400, 86_400);
        assert!(retrained.sources.is_empty());
        assert_eq!(ReputationModel::load(&path).unwrap().trained_at, retrained.trained_at);
    }
}
