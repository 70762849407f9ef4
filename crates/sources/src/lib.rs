//! # Sources Crate
//!
//! Request-scoped inputs for the recommendation engine.
//!
//! ## Components
//!
//! ### User Context
//! Everything the selector and the extractors need to know about the user,
//! gathered once per request:
//! - Down-vote set from the latest rating/dislike per content id
//! - Seen set (only with tracking consent)
//! - Keyword profile from explicit keywords and positively engaged content
//! - Top three categories and sources by net engagement (only with consent)
//!
//! ### Recent Source
//! Reads the content snapshot from a [`content_store::ContentStore`]:
//! newest items, plus newest items in preferred and learned categories,
//! items from learned sources, keyword matches and fresh popular items,
//! merged without duplicates.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{user_context::build_user_context, RecentSource};
//! use content_store::{ContentIndex, InteractionLog, PreferenceVector};
//!
//! let index = ContentIndex::load_from_dir(Path::new("data/snapshot"))?;
//! let history = index.history("u1")?;
//! let context = build_user_context("u1", PreferenceVector::default(), &history, &index.latest(500));
//!
//! let snapshot = RecentSource::new().get_snapshot(&index, &context, now_unix())?;
//! ```

// Public modules
pub mod types;
pub mod keywords;
pub mod user_context;
pub mod recent;

// Re-export commonly used types
pub use types::{Candidate, CandidateSource, UserContext};
pub use keywords::tokenize;
pub use recent::RecentSource;
pub use user_context::build_user_context;
