use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use goalconvo_domain::config::Config;
use goalconvo_domain::fallback_responses::FallbackCatalog;
use goalconvo_llm::LlmGateway;
use goalconvo_pipeline::{PipelineContext, RoomRegistry};
use goalconvo_store::{DatasetStore, FewShotHub, HumanEvalStore, SeedGoalPool, VersionManager};

/// GoalConvo: synthesize goal-oriented, multi-turn dialogues through a
/// generation-verification-repair pipeline and serve the results over
/// HTTP/WebSocket.
#[derive(Parser, Debug)]
#[command(name = "goalconvo", version)]
struct Args {
    /// Path to a TOML config file. Missing file falls back to defaults.
    #[arg(long, default_value = "config.toml")]
    config: std::path::PathBuf,

    /// Root data directory (overrides the config file's `data_dir`).
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Bind host for the HTTP/WebSocket server.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port for the HTTP/WebSocket server.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("goalconvo=info,tower_http=info")),
        )
        .json()
        .init();

    tracing::info!("GoalConvo starting");

    let args = Args::parse();

    let mut config = Config::load(Some(&args.config))?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    tracing::info!(
        data_dir = %config.data_dir.display(),
        domains = ?config.domains,
        min_turns = config.min_turns,
        max_turns = config.max_turns,
        "configuration loaded"
    );
    let config = Arc::new(config);

    let gateway = Arc::new(LlmGateway::from_credentials(
        &config.credentials,
        Duration::from_secs(config.timeout_seconds),
        config.max_retries,
    )?);

    let dataset_store = Arc::new(DatasetStore::new(&config.data_dir)?);
    let few_shot_hub = Arc::new(FewShotHub::new(&config.data_dir, &config.domains)?);
    let version_manager = Arc::new(VersionManager::new(&config.data_dir)?);
    let human_eval_store = Arc::new(HumanEvalStore::new(&config.data_dir)?);
    let seed_table = PipelineContext::default_seed_goal_table(&config.domains);
    let seed_goals = Arc::new(SeedGoalPool::load(&config.data_dir, &seed_table)?);
    let fallbacks = Arc::new(FallbackCatalog::load(&config.data_dir));
    let rooms = Arc::new(RoomRegistry::new());

    let ctx = PipelineContext {
        config: config.clone(),
        gateway,
        dataset_store,
        few_shot_hub,
        version_manager,
        human_eval_store,
        seed_goals,
        fallbacks,
        rooms,
    };

    let state = goalconvo_api::AppState::new(ctx);

    let app = goalconvo_api::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
