//! Server crate for the FeedRank recommendation engine.
//!
//! This crate contains the orchestrator that coordinates selection,
//! extraction, weighting and scoring for a request, the fallback path that
//! takes over when any of that fails, and a store-backed service that
//! gathers request snapshots.
//!
//! ## Example Usage
//!
//! ```ignore
//! use server::{EngineConfig, FeedService, Orchestrator, ScoringProfile};
//!
//! let orchestrator = Orchestrator::new(EngineConfig::default()).with_reputation(model);
//! let service = FeedService::new(index, orchestrator);
//! let recs = service.recommend_for("u1", Some(10), ScoringProfile::Standard).await;
//! ```

pub mod config;
pub mod fallback;
pub mod orchestrator;
pub mod service;

pub use config::EngineConfig;
pub use fallback::{FallbackProvider, StaticFallback, placeholder_reason};
pub use orchestrator::{
    FallbackReason, Orchestrator, Recommendation, RecommendationRequest, Recommendations,
    RefreshStatus, ScoringProfile, Stage,
};
pub use service::{FeedService, now_unix};
