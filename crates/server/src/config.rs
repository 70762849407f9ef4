//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use anyhow::{Context, Result};
use pipeline::{InfluenceCurve, RecencyConfig, SelectorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for the orchestrator and the service around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Results returned when the caller gives no limit
    pub default_limit: usize,
    /// Largest limit a caller may ask for
    pub max_limit: usize,

    /// Candidate selection policy
    pub selector: SelectorConfig,
    /// Recency decay shape
    pub recency: RecencyConfig,
    /// Mapping from upvote ratio to the rating sub-score
    pub rating_curve: InfluenceCurve,

    /// Newest items read from the content store per request
    pub snapshot_size: usize,

    /// Budget for a standard request
    pub standard_timeout_ms: u64,
    /// Budget for a request that also returns breakdowns
    pub detailed_timeout_ms: u64,
    /// Budget for retraining the reputation model
    pub refresh_timeout_ms: u64,

    /// Where the reputation model is persisted, if anywhere
    pub model_path: Option<PathBuf>,
    /// Age after which a persisted model is retrained
    pub model_max_age_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            selector: SelectorConfig::default(),
            recency: RecencyConfig::default(),
            rating_curve: InfluenceCurve::Linear,
            snapshot_size: 500,
            standard_timeout_ms: 10_000,
            detailed_timeout_ms: 20_000,
            refresh_timeout_ms: 60_000,
            model_path: None,
            model_max_age_secs: 24 * 3600,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_lookback_days(mut self, days: Option<u32>) -> Self {
        self.selector.lookback_days = days;
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.selector.max_candidates = max;
        self
    }

    pub fn with_diversity(mut self, enabled: bool) -> Self {
        self.selector.diversity = enabled;
        self
    }

    pub fn with_exclude_seen(mut self, enabled: bool) -> Self {
        self.selector.exclude_seen = enabled;
        self
    }

    pub fn with_rating_curve(mut self, curve: InfluenceCurve) -> Self {
        self.rating_curve = curve;
        self
    }

    pub fn with_timeouts(mut self, standard: Duration, detailed: Duration) -> Self {
        self.standard_timeout_ms = duration_ms(standard);
        self.detailed_timeout_ms = duration_ms(detailed);
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Resolve a requested limit: default when absent, otherwise 1..=max
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        let max = self.max_limit.max(1);
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, max)
    }

    pub fn standard_timeout(&self) -> Duration {
        Duration::from_millis(self.standard_timeout_ms)
    }

    pub fn detailed_timeout(&self) -> Duration {
        Duration::from_millis(self.detailed_timeout_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_limit(None), 10);
        assert_eq!(config.standard_timeout(), Duration::from_secs(10));
        assert_eq!(config.detailed_timeout(), Duration::from_secs(20));
        assert_eq!(config.refresh_timeout(), Duration::from_secs(60));
        assert_eq!(config.selector.max_candidates, 200);
        assert_eq!(config.selector.lookback_days, Some(30));
        assert!(!config.selector.diversity);
    }

    #[test]
    fn test_clamp_limit() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_limit(Some(0)), 1);
        assert_eq!(config.clamp_limit(Some(7)), 7);
        assert_eq!(config.clamp_limit(Some(500)), 50);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_default_limit(5)
            .with_diversity(true)
            .with_lookback_days(None)
            .with_timeouts(Duration::from_millis(250), Duration::from_secs(1));
        assert_eq!(config.clamp_limit(None), 5);
        assert!(config.selector.diversity);
        assert_eq!(config.selector.lookback_days, None);
        assert_eq!(config.standard_timeout_ms, 250);
        assert_eq!(config.detailed_timeout_ms, 1_000);
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"default_limit": 20, "selector": {"diversity": true}, "rating_curve": {"kind": "sigmoid", "steepness": 8.0}}"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.default_limit, 20);
        assert!(config.selector.diversity);
        assert_eq!(config.selector.max_consecutive, 3);
        assert_eq!(config.rating_curve, InfluenceCurve::Sigmoid { steepness: 8.0 });
        assert_eq!(config.max_limit, 50);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineConfig::from_file(&dir.path().join("nope.json")).is_err());
    }
}
