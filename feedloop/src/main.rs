use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedloop::api::{create_router, AppState};
use feedloop::config::Config;
use feedloop::embeddings;
use feedloop::llm::LlmProvider;

#[derive(Parser)]
#[command(name = "feedloop")]
#[command(about = "Document question answering where expert feedback outranks the corpus")]
struct Args {
    /// Drop the feedback vector index and rebuild it from the ledger before serving
    #[arg(long)]
    rebuild_feedback_index: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "feedloop=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    config.storage.ensure_directories()?;

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embedder = embeddings::from_config(&config.embeddings)?;

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!(
            reason = %llm.unavailable_reason(),
            "LLM unavailable - answers will be simulated"
        );
    }

    let state = AppState::new(config.clone(), embedder, llm).await?;

    if args.rebuild_feedback_index {
        let rebuilt = state.feedback.rebuild().await?;
        tracing::info!(entries = rebuilt, "Feedback index rebuilt from ledger");
    } else {
        match state.feedback.reconcile().await {
            Ok(0) => {}
            Ok(count) => tracing::info!(reindexed = count, "Feedback index caught up with ledger"),
            Err(e) => tracing::warn!(
                error = %e,
                "Could not reconcile feedback index; run with --rebuild-feedback-index to retry"
            ),
        }
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Feedloop starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
