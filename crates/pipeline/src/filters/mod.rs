//! Filter implementations for the candidate selector.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline.

pub mod lookback;
pub mod disliked;
pub mod already_seen;
pub mod category_cap;
pub mod size_bound;

// Re-export for convenience
pub use already_seen::AlreadySeenFilter;
pub use category_cap::CategoryCapFilter;
pub use disliked::DislikedFilter;
pub use lookback::LookbackFilter;
pub use size_bound::SizeBoundFilter;
