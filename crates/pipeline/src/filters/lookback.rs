//! Filter dropping content outside the recent window.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

const SECONDS_PER_DAY: i64 = 86_400;

/// Drops candidates published more than `lookback_days` before `now`.
///
/// ## Algorithm
/// 1. With no window configured, keep everything
/// 2. Otherwise keep items with `timestamp >= now - window`
/// 3. Future-dated items are always kept
pub struct LookbackFilter {
    /// Earliest timestamp kept, `None` when the window is disabled
    cutoff: Option<i64>,
}

impl LookbackFilter {
    /// Create a new LookbackFilter.
    ///
    /// # Arguments
    /// * `now` - Request time, unix seconds
    /// * `lookback_days` - Window length; `None` disables the filter
    pub fn new(now: i64, lookback_days: Option<u32>) -> Self {
        let cutoff = lookback_days
            .map(|days| now.saturating_sub(i64::from(days).saturating_mul(SECONDS_PER_DAY)));
        Self { cutoff }
    }
}

impl Filter for LookbackFilter {
    fn name(&self) -> &str {
        "LookbackFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        _context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        let Some(cutoff) = self.cutoff else {
            return Ok(candidates);
        };
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| candidate.timestamp() >= cutoff)
            .collect();
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::candidate;
    use content_store::PreferenceVector;

    const NOW: i64 = 1_700_000_000;

    fn candidates() -> Vec<Candidate> {
        vec![
            candidate("future", "Tech", NOW + 60),
            candidate("today", "Tech", NOW - 3_600),
            candidate("edge", "Tech", NOW - 30 * SECONDS_PER_DAY),
            candidate("old", "Tech", NOW - 30 * SECONDS_PER_DAY - 1),
        ]
    }

    #[test]
    fn test_window_applies() {
        let context = UserContext::new("u1", PreferenceVector::default());
        let filtered = LookbackFilter::new(NOW, Some(30))
            .apply(candidates(), &context)
            .unwrap();

        let ids: Vec<_> = filtered.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["future", "today", "edge"]);
    }

    #[test]
    fn test_disabled_window_keeps_all() {
        let context = UserContext::new("u1", PreferenceVector::default());
        let filtered = LookbackFilter::new(NOW, None)
            .apply(candidates(), &context)
            .unwrap();
        assert_eq!(filtered.len(), 4);
    }
}
