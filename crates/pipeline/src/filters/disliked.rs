//! Filter to remove content the user has down-voted.
//!
//! Always part of the selector: hiding disliked content is an explicit
//! user instruction, not a tracking-derived signal.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Removes candidates in the user's down-vote set.
pub struct DislikedFilter;

impl Filter for DislikedFilter {
    fn name(&self) -> &str {
        "DislikedFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        if context.downvoted.is_empty() {
            return Ok(candidates);
        }
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !context.is_downvoted(candidate.id()))
            .collect();
        Ok(filtered)
    }
}
