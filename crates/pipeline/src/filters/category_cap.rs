//! Diversity filter limiting runs of same-category content.
//!
//! Walks candidates in order and drops any item that would extend a run
//! of one category beyond the cap. Comparison is case-insensitive.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Drops an item when the preceding `max_consecutive` survivors all share
/// its category.
pub struct CategoryCapFilter {
    max_consecutive: usize,
}

impl CategoryCapFilter {
    /// Create a new CategoryCapFilter.
    ///
    /// A cap of 0 is treated as 1 so that at least one item survives.
    pub fn new(max_consecutive: usize) -> Self {
        Self {
            max_consecutive: max_consecutive.max(1),
        }
    }
}

impl Filter for CategoryCapFilter {
    fn name(&self) -> &str {
        "CategoryCapFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        _context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        let mut filtered: Vec<Candidate> = Vec::with_capacity(candidates.len());
        let mut run_category = String::new();
        let mut run_length = 0usize;

        for candidate in candidates {
            let category = candidate.category().to_lowercase();
            if category == run_category {
                if run_length >= self.max_consecutive {
                    continue;
                }
                run_length += 1;
            } else {
                run_category = category;
                run_length = 1;
            }
            filtered.push(candidate);
        }

        Ok(filtered)
    }
}
