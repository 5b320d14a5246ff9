use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use ytrag_core::config::YtragConfig;
use ytrag_core::llm::OpenAiLlmClient;
use ytrag_db::{ChannelRepo, ChunkRepo, SegmentRepo, TaskNotifier, TaskStore, VideoRepo};
use ytrag_worker::runner::WorkerDeps;
use ytrag_worker::services::encoder::HttpSentenceEncoder;
use ytrag_worker::services::fetcher::YtDlpFetcher;
use ytrag_worker::services::stt::HttpSpeechToText;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ytrag_worker=info".into()),
        )
        .init();

    let config_path = std::env::var("YTRAG_CONFIG").ok();
    let config = YtragConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        YtragConfig::default()
    });

    let pool = ytrag_db::connect(&config.database.url, config.database.pool_size).await?;

    let tasks = TaskStore::new(pool.clone());
    let channels = ChannelRepo::new(pool.clone());
    let videos = VideoRepo::new(pool.clone());
    let segments = SegmentRepo::new(pool.clone());
    let chunks = ChunkRepo::new(pool.clone());

    let fetcher = Arc::new(YtDlpFetcher::new(
        config.providers.fetcher.yt_dlp_path.clone(),
        config.providers.fetcher.ffmpeg_path.clone(),
        config.providers.fetcher.audio_dir.clone(),
    ));
    let stt = Arc::new(HttpSpeechToText::new(config.providers.stt.endpoint.clone()));
    let encoder = Arc::new(HttpSentenceEncoder::new(
        config.providers.encoder.endpoint.clone(),
        config.providers.encoder.dim,
    ));
    let llm = Arc::new(OpenAiLlmClient::new(
        config.providers.openai.api_key.clone(),
        config.providers.openai.base_url.clone(),
        config.providers.openai.model.clone(),
    ));

    let deps = WorkerDeps {
        tasks,
        channels,
        videos,
        segments,
        chunks,
        fetcher,
        stt,
        encoder,
        llm,
        language: config.providers.stt.language.clone(),
        embed_batch_size: config.pipeline.embed_batch_size,
    };

    let notifier = TaskNotifier::spawn(config.database.url.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    ytrag_worker::run(deps, notifier, shutdown_rx).await;

    Ok(())
}

/// Resolves on either Ctrl-C or SIGTERM, whichever comes first — the
/// worker loop always finishes its in-flight task before exiting.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
