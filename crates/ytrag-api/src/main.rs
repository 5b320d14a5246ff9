use std::sync::Arc;

use tower_http::cors::CorsLayer;
use ytrag_core::config::YtragConfig;
use ytrag_db::{rag_defaults, worker_defaults};

use ytrag_api::app::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ytrag_api=info".into()),
        )
        .init();

    let config_path = std::env::var("YTRAG_CONFIG").ok();
    let config = YtragConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        YtragConfig::default()
    });

    let pool = ytrag_db::connect(&config.database.url, config.database.pool_size).await?;

    let settings = ytrag_db::SettingsRepo::new(pool.clone());
    settings.populate_defaults("rag", &rag_defaults(&config.rag)).await?;
    settings.populate_defaults("worker", &worker_defaults(&config.pipeline)).await?;

    let bind = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let state = Arc::new(AppState::new(config, pool));
    let app = build_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "ytrag-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
