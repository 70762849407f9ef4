//! Simple test harness for the recommendation orchestrator.
//!
//! Loads a snapshot directory, prepares the reputation model and prints
//! recommendations for one user.
//!
//! Usage: `server [DATA_DIR] [USER_ID] [LIMIT]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use content_store::{ContentIndex, ReputationModel};
use server::{EngineConfig, FeedService, Orchestrator, ScoringProfile, now_unix};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data/snapshot".to_string()));
    let user_id = args.next().unwrap_or_else(|| "u1".to_string());
    let limit = args
        .next()
        .map(|raw| raw.parse::<usize>())
        .transpose()
        .context("LIMIT must be a number")?;

    info!("Starting FeedRank server test harness");

    let index = ContentIndex::load_from_dir(&data_dir)
        .with_context(|| format!("Failed to load snapshot from {:?}", data_dir))?;
    let (content, users, interactions) = index.counts();
    info!("Loaded {} items, {} users, {} interactions", content, users, interactions);

    let config = EngineConfig::default();
    let now = now_unix();
    let model_path = config
        .model_path
        .clone()
        .unwrap_or_else(|| data_dir.join("reputation.json"));
    let model = ReputationModel::load_or_train(
        &model_path,
        &index.latest(usize::MAX),
        now,
        config.model_max_age_secs,
    );

    let orchestrator = Orchestrator::new(config).with_reputation(model);
    let service = FeedService::new(index, orchestrator);

    info!("Getting recommendations for user {} (limit: {:?})", user_id, limit);
    let recommendations = service
        .recommend_at(&user_id, limit, ScoringProfile::Standard, now)
        .await;

    if recommendations.fallback {
        info!(
            "Serving fallback: {:?}",
            recommendations.fallback_reason
        );
    }
    info!("Received {} recommendations:", recommendations.len());
    for (i, rec) in recommendations.items.iter().enumerate() {
        info!(
            "{}. {} [{} / {}] - Score: {}",
            i + 1,
            rec.content.title,
            rec.content.category,
            rec.content.source,
            rec.score
        );
        info!("   {}", rec.reason);
    }

    Ok(())
}
