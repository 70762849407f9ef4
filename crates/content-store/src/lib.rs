//! # Content Store Crate
//!
//! This crate holds the data model of the aggregator and an in-memory
//! implementation of the stores the recommendation engine talks to.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (ContentItem, InteractionRecord, Factor, ContentIndex)
//! - **preferences**: Canonical PreferenceVector and the normalization step for raw preferences
//! - **parser**: JSON Lines snapshot reading and writing
//! - **index**: Loading, querying and persisting the ContentIndex
//! - **store**: Collaborator traits (ContentStore, UserStore, InteractionLog)
//! - **reputation**: Out-of-band source reputation model
//! - **error**: Error types for store access
//!
//! ## Example Usage
//!
//! ```ignore
//! use content_store::{ContentIndex, ContentStore, PreferenceVector, UserStore};
//! use std::path::Path;
//!
//! let index = ContentIndex::load_from_dir(Path::new("data/snapshot"))?;
//! let latest = index.latest(100);
//! let prefs = PreferenceVector::from_value(&index.preferences("u1")?.unwrap_or_default());
//! ```

pub mod error;
pub mod types;
pub mod preferences;
pub mod parser;
pub mod index;
pub mod store;
pub mod reputation;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
pub use types::{
    // Type aliases
    ContentId,
    UserId,
    // Core types
    ContentIndex,
    ContentItem,
    InteractionRecord,
    RatingAggregate,
    UserRecord,
    FactorWeights,
    // Enums
    Factor,
    InteractionKind,
    Vote,
};
pub use preferences::PreferenceVector;
pub use reputation::{ReputationModel, SourceStats};
pub use store::{ContentStore, InteractionLog, UserStore};
