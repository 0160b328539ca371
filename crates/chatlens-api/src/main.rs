use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatlens::ChatlensBuilder;
use chatlens_api::{build_router, config::Config, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Chatlens API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let mut builder = ChatlensBuilder::new()
        .openai_key(config.openai_api_key.clone())
        .analysis_config(config.analysis_config())
        .context_config(config.context_config())
        .stats_config(config.stats.clone())
        .max_upload_bytes(config.server.max_upload_bytes);
    if let Some(base_url) = &config.llm.base_url {
        builder = builder.base_url(base_url.clone());
    }

    match config.store.backend.as_str() {
        "memory" => {
            tracing::warn!("Using the in-memory store; rooms are lost on restart");
        }
        #[cfg(feature = "mongodb")]
        "mongodb" => {
            tracing::info!("Connecting to MongoDB");
            builder = builder.mongodb(config.mongodb_uri.clone(), config.store.database.clone());
        }
        other => anyhow::bail!("Unsupported store backend '{}'", other),
    }

    let chatlens = builder.build().await.context("Failed to build chatlens")?;

    let state = Arc::new(AppState::new(config.clone(), chatlens));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
