//! Filter bounding the number of candidates handed to scoring.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Keeps the `max_candidates` most recent candidates.
///
/// Relies on the selector's newest-first ordering, so truncation keeps
/// the most recent items.
pub struct SizeBoundFilter {
    max_candidates: usize,
}

impl SizeBoundFilter {
    pub fn new(max_candidates: usize) -> Self {
        Self { max_candidates }
    }
}

impl Filter for SizeBoundFilter {
    fn name(&self) -> &str {
        "SizeBoundFilter"
    }

    fn apply(
        &self,
        mut candidates: Vec<Candidate>,
        _context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        candidates.truncate(self.max_candidates);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::candidate;
    use content_store::PreferenceVector;

    #[test]
    fn test_keeps_most_recent() {
        let context = UserContext::new("u1", PreferenceVector::default());
        let candidates: Vec<Candidate> = (0..10)
            .rev()
            .map(|i| candidate(&format!("c{}", i), "Tech", i))
            .collect();

        let filtered = SizeBoundFilter::new(3).apply(candidates, &context).unwrap();
        let ids: Vec<_> = filtered.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["c9", "c8", "c7"]);
    }

    #[test]
    fn test_under_bound_unchanged() {
        let context = UserContext::new("u1", PreferenceVector::default());
        let candidates = vec![candidate("a", "Tech", 1)];
        let filtered = SizeBoundFilter::new(200).apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 1);
    }
}
