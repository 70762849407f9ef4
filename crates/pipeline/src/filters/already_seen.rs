//! Filter to remove content the user has already interacted with.
//!
//! Only meaningful with tracking consent; without it the seen set is
//! empty and the filter passes everything through.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Removes candidates present in the user's seen set.
///
/// ## Algorithm
/// Uses the HashSet in UserContext.seen for O(1) lookups.
pub struct AlreadySeenFilter;

impl Filter for AlreadySeenFilter {
    fn name(&self) -> &str {
        "AlreadySeenFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        if !context.has_consent() {
            return Ok(candidates);
        }
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !context.has_seen(candidate.id()))
            .collect();
        Ok(filtered)
    }
}
