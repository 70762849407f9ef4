use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use content_store::{
    ContentIndex, InteractionKind, InteractionRecord, PreferenceVector, ReputationModel, UserStore,
};
use rand::seq::IndexedRandom;
use server::{
    now_unix, EngineConfig, FeedService, Orchestrator, Recommendations, RefreshStatus,
    ScoringProfile,
};
use sources::build_user_context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// FeedRank - Content Recommendation Engine
#[derive(Parser)]
#[command(name = "feedrank")]
#[command(about = "Weighted, explainable content recommendations", long_about = None)]
struct Cli {
    /// Snapshot directory (content.jsonl, users.jsonl, interactions.jsonl)
    #[arg(short, long, default_value = "data/snapshot")]
    data_dir: PathBuf,

    /// Engine configuration file (JSON); unset fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reputation model location [default: <data-dir>/reputation.json]
    #[arg(long)]
    model: Option<PathBuf>,

    /// Only consider content published within this many days
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Upper bound on candidates scored per request
    #[arg(long)]
    max_candidates: Option<usize>,

    /// Break up long runs of a single category
    #[arg(long)]
    diversity: bool,

    /// Keep content the user already interacted with
    #[arg(long)]
    include_seen: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get recommendations for a user
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: String,

        /// Number of recommendations to return [default: from config]
        #[arg(long)]
        limit: Option<usize>,

        /// Show the per-factor breakdown of each score
        #[arg(long)]
        explain: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user's preferences and interaction history
    User {
        /// User ID to display
        #[arg(long)]
        user_id: String,

        /// Replace the user's preferences with this JSON document
        #[arg(long)]
        set_preferences: Option<String>,
    },

    /// Search content by title or summary
    Search {
        /// Text to look for (case-insensitive)
        #[arg(long)]
        text: String,

        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Record a user interaction
    Interact {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        content_id: String,

        #[arg(long, value_enum)]
        kind: KindArg,

        /// +1 or -1, required for ratings
        #[arg(long, allow_hyphen_values = true)]
        rating: Option<i8>,
    },

    /// Delete a user's interaction history
    ClearHistory {
        #[arg(long)]
        user_id: String,
    },

    /// Retrain the source reputation model
    Refresh,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    View,
    Click,
    Share,
    Bookmark,
    Rating,
    Dislike,
}

impl From<KindArg> for InteractionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::View => InteractionKind::View,
            KindArg::Click => InteractionKind::Click,
            KindArg::Share => InteractionKind::Share,
            KindArg::Bookmark => InteractionKind::Bookmark,
            KindArg::Rating => InteractionKind::Rating,
            KindArg::Dislike => InteractionKind::Dislike,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    println!("Loading snapshot from {}...", cli.data_dir.display());
    let start = Instant::now();
    let index = ContentIndex::load_from_dir(&cli.data_dir)
        .with_context(|| format!("Failed to load snapshot from {}", cli.data_dir.display()))?;
    let (content, users, interactions) = index.counts();
    println!(
        "{} Loaded {} items, {} users, {} interactions in {:?}",
        "✓".green(),
        content,
        users,
        interactions,
        start.elapsed()
    );

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            ref user_id,
            limit,
            explain,
            json,
        } => {
            let service = build_service(index, config);
            handle_recommend(&service, user_id, limit, explain, json).await?
        }
        Commands::User {
            ref user_id,
            ref set_preferences,
        } => handle_user(index, &cli.data_dir, user_id, set_preferences.as_deref())?,
        Commands::Search { ref text, limit } => handle_search(&index, text, limit),
        Commands::Interact {
            ref user_id,
            ref content_id,
            kind,
            rating,
        } => {
            let service = build_service(index, config);
            handle_interact(&service, &cli.data_dir, user_id, content_id, kind, rating)?
        }
        Commands::ClearHistory { ref user_id } => {
            let service = build_service(index, config);
            handle_clear_history(&service, &cli.data_dir, user_id)?
        }
        Commands::Refresh => {
            let service = build_service(index, config);
            handle_refresh(&service).await?
        }
        Commands::Benchmark {
            requests,
            concurrent,
        } => {
            let service = Arc::new(build_service(index, config));
            handle_benchmark(service, requests, concurrent).await?
        }
    }

    Ok(())
}

/// Config file first, then command-line overrides
fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(days) = cli.lookback_days {
        config = config.with_lookback_days(Some(days));
    }
    if let Some(max) = cli.max_candidates {
        config = config.with_max_candidates(max);
    }
    if cli.diversity {
        config = config.with_diversity(true);
    }
    if cli.include_seen {
        config = config.with_exclude_seen(false);
    }

    let model_path = cli
        .model
        .clone()
        .or_else(|| config.model_path.clone())
        .unwrap_or_else(|| cli.data_dir.join("reputation.json"));
    Ok(config.with_model_path(model_path))
}

fn build_service(index: ContentIndex, config: EngineConfig) -> FeedService<ContentIndex> {
    let model = match &config.model_path {
        Some(path) => ReputationModel::load_or_train(
            path,
            &index.latest(usize::MAX),
            now_unix(),
            config.model_max_age_secs,
        ),
        None => ReputationModel::train(&index.latest(usize::MAX), now_unix()),
    };
    let orchestrator = Orchestrator::new(config).with_reputation(model);
    FeedService::new(index, orchestrator)
}

fn save_store(service: &FeedService<ContentIndex>, data_dir: &Path) -> Result<()> {
    let store = service.store();
    let index = store.read().map_err(|_| anyhow!("Store lock poisoned"))?;
    index
        .save_to_dir(data_dir)
        .with_context(|| format!("Failed to save snapshot to {}", data_dir.display()))
}

/// Handle the 'recommend' command
async fn handle_recommend(
    service: &FeedService<ContentIndex>,
    user_id: &str,
    limit: Option<usize>,
    explain: bool,
    json: bool,
) -> Result<()> {
    let profile = if explain {
        ScoringProfile::Detailed
    } else {
        ScoringProfile::Standard
    };

    let start = Instant::now();
    let recommendations = service.recommend_for(user_id, limit, profile).await;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
    } else {
        print_recommendations(user_id, &recommendations, explain);
        println!("\n{} in {:?}", "Done".dimmed(), elapsed);
    }
    Ok(())
}

/// Handle the 'user' command
fn handle_user(
    mut index: ContentIndex,
    data_dir: &Path,
    user_id: &str,
    set_preferences: Option<&str>,
) -> Result<()> {
    if let Some(raw) = set_preferences {
        let doc: serde_json::Value =
            serde_json::from_str(raw).context("Preferences must be a JSON document")?;
        index.update_preferences(user_id, doc)?;
        index
            .save_to_dir(data_dir)
            .with_context(|| format!("Failed to save snapshot to {}", data_dir.display()))?;
        println!("{} Preferences updated", "✓".green());
    }

    let user = index.get_user(user_id);
    let preferences = user
        .map(|u| PreferenceVector::from_value(&u.preferences))
        .unwrap_or_default();

    println!("{}", format!("User: {}", user_id).bold().blue());
    match user {
        Some(user) if !user.display_name.is_empty() => {
            println!("{}Name: {}", "• ".green(), user.display_name)
        }
        Some(_) => {}
        None => println!("{}", "  (unknown user, default preferences apply)".yellow()),
    }

    // Preferences
    let mut categories: Vec<(&String, &f64)> = preferences.category_weights.iter().collect();
    categories.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    println!("Category weights:");
    for (category, weight) in categories {
        println!("  - {}: {}", category, weight);
    }
    println!("Algorithm weights:");
    for factor in content_store::Factor::ALL {
        println!(
            "  - {}: {}",
            factor.key(),
            preferences.algorithm_weights.get(factor)
        );
    }
    if preferences.rating_weight.is_some() {
        println!(
            "{}Rating weight override: {}",
            "• ".cyan(),
            preferences.effective_rating_weight()
        );
    }
    println!("{}Tracking consent: {}", "• ".cyan(), preferences.tracking_consent);
    if !preferences.keywords.is_empty() {
        println!("{}Keywords: {}", "• ".cyan(), preferences.keywords.join(", "));
    }

    // History
    let history = index.get_user_interactions(user_id);
    let content = index.latest(usize::MAX);
    let context = build_user_context(user_id, preferences, history, &content);
    println!("{}Interactions: {}", "• ".cyan(), history.len());

    let mut downvoted: Vec<&String> = context.downvoted.iter().collect();
    downvoted.sort();
    if !downvoted.is_empty() {
        println!("Down-voted:");
        for id in downvoted {
            let title = index.get_content(id).map(|c| c.title.as_str()).unwrap_or("?");
            println!("  - {} ({})", title, id);
        }
    }

    let mut profile: Vec<&String> = context.keyword_profile.iter().collect();
    profile.sort();
    if !profile.is_empty() {
        let shown: Vec<&str> = profile.iter().take(20).map(|k| k.as_str()).collect();
        println!("Interest keywords: {}", shown.join(", "));
    }
    Ok(())
}

/// Handle the 'search' command
fn handle_search(index: &ContentIndex, text: &str, limit: usize) {
    let matches = index.search(text, limit);

    println!("{}", format!("Search results for '{}':", text).bold().blue());
    if matches.is_empty() {
        println!("  (no matches)");
    }
    for item in matches {
        println!(
            "{}: {} [{} / {}] +{} -{}",
            item.id.green(),
            item.title,
            item.category,
            item.source,
            item.upvotes,
            item.downvotes
        );
    }
}

/// Handle the 'interact' command
fn handle_interact(
    service: &FeedService<ContentIndex>,
    data_dir: &Path,
    user_id: &str,
    content_id: &str,
    kind: KindArg,
    rating: Option<i8>,
) -> Result<()> {
    let kind = InteractionKind::from(kind);
    if kind == InteractionKind::Rating && rating.is_none() {
        bail!("--rating is required for rating interactions");
    }

    let record = InteractionRecord {
        user_id: user_id.to_string(),
        content_id: content_id.to_string(),
        kind,
        rating: if kind == InteractionKind::Rating { rating } else { None },
        timestamp: now_unix(),
    };
    service
        .record_interaction(record)
        .with_context(|| format!("Failed to record {:?} on {}", kind, content_id))?;
    save_store(service, data_dir)?;

    println!("{} Recorded {:?} by {} on {}", "✓".green(), kind, user_id, content_id);
    Ok(())
}

/// Handle the 'clear-history' command
fn handle_clear_history(
    service: &FeedService<ContentIndex>,
    data_dir: &Path,
    user_id: &str,
) -> Result<()> {
    let removed = service.clear_history(user_id)?;
    save_store(service, data_dir)?;
    println!("{} Removed {} interactions for {}", "✓".green(), removed, user_id);
    Ok(())
}

/// Handle the 'refresh' command
async fn handle_refresh(service: &FeedService<ContentIndex>) -> Result<()> {
    match service.refresh_model(now_unix()).await {
        RefreshStatus::Completed { sources, .. } => {
            println!("{} Reputation model trained on {} sources", "✓".green(), sources);
            let model = service.orchestrator().reputation();
            let mut ranked: Vec<_> = model.sources.iter().collect();
            ranked.sort_by(|a, b| b.1.reputation.total_cmp(&a.1.reputation));
            for (source, stats) in ranked.iter().take(10) {
                println!(
                    "  - {}: {:.3} ({} items, +{} -{})",
                    source, stats.reputation, stats.items, stats.upvotes, stats.downvotes
                );
            }
            Ok(())
        }
        RefreshStatus::Failed { reason } => bail!("Model refresh failed: {}", reason),
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: Arc<FeedService<ContentIndex>>,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }

    let user_ids: Vec<String> = {
        let store = service.store();
        let index = store.read().map_err(|_| anyhow!("Store lock poisoned"))?;
        index.user_ids().into_iter().map(str::to_string).collect()
    };
    if user_ids.is_empty() {
        bail!("Snapshot has no users to benchmark with");
    }

    let mut rng = rand::rng();
    let picks: Vec<String> = (0..requests)
        .filter_map(|_| user_ids.choose(&mut rng).cloned())
        .collect();

    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall = Instant::now();
    let mut handles = Vec::with_capacity(picks.len());
    for user in picks {
        let service = Arc::clone(&service);
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            let result = service
                .recommend_for(&user, None, ScoringProfile::Standard)
                .await;
            Ok::<_, anyhow::Error>((start.elapsed(), result.fallback))
        }));
    }

    let mut timings: Vec<Duration> = Vec::with_capacity(handles.len());
    let mut fallbacks = 0;
    for handle in handles {
        let (elapsed, fallback) = handle.await??;
        timings.push(elapsed);
        if fallback {
            fallbacks += 1;
        }
    }
    let total_time = wall.elapsed();

    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let throughput = timings.len() as f64 / total_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", timings.len(), concurrent.max(1));
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);
    println!("Fallbacks: {}", fallbacks);

    Ok(())
}

/// Helper function to format and print recommendations
fn print_recommendations(user_id: &str, recommendations: &Recommendations, explain: bool) {
    println!("{}", format!("Recommendations for {}:", user_id).bold().blue());
    if recommendations.fallback {
        let reason = recommendations
            .fallback_reason
            .map(|r| r.to_string())
            .unwrap_or_default();
        println!("{}", format!("Showing placeholder content ({})", reason).yellow());
    }

    for (i, rec) in recommendations.items.iter().enumerate() {
        let rank = i + 1;
        let score = match rec.score {
            70..=100 => rec.score.to_string().green(),
            40..=69 => rec.score.to_string().yellow(),
            _ => rec.score.to_string().normal(),
        };
        println!(
            "{}. {} [{} / {}] - Score: {}",
            rank.to_string().green(),
            rec.content.title.bold(),
            rec.content.category,
            rec.content.source,
            score
        );
        println!("   {}", rec.reason.dimmed());

        if explain {
            if let Some(breakdown) = &rec.breakdown {
                for factor in &breakdown.factors {
                    println!(
                        "     {:<18} sub {:.3}  weight {:.3}  -> {:.3}",
                        factor.factor.label(),
                        factor.sub_score,
                        factor.weight,
                        factor.contribution
                    );
                }
            }
        }
    }
}
