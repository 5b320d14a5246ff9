use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::PgPool;
use ytrag_core::config::YtragConfig;
use ytrag_core::llm::{LlmClient, OpenAiLlmClient};
use ytrag_db::{ChannelRepo, ChatRepo, ChunkRepo, SegmentRepo, SettingsRepo, TaskStore, VideoRepo};
use ytrag_rag::{RagOrchestrator, RagParams};

/// Central shared state, passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub config: YtragConfig,
    pub pool: PgPool,
    pub channels: ChannelRepo,
    pub videos: VideoRepo,
    pub segments: SegmentRepo,
    pub chunks: ChunkRepo,
    pub chat: ChatRepo,
    pub tasks: TaskStore,
    pub settings: SettingsRepo,
    pub rag: RagOrchestrator,
}

impl AppState {
    pub fn new(config: YtragConfig, pool: PgPool) -> Self {
        let channels = ChannelRepo::new(pool.clone());
        let videos = VideoRepo::new(pool.clone());
        let segments = SegmentRepo::new(pool.clone());
        let chunks = ChunkRepo::new(pool.clone());
        let chat = ChatRepo::new(pool.clone());
        let tasks = TaskStore::new(pool.clone());
        let settings = SettingsRepo::new(pool.clone());

        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiLlmClient::new(
            config.providers.openai.api_key.clone(),
            config.providers.openai.base_url.clone(),
            config.providers.openai.model.clone(),
        ));
        let rag = RagOrchestrator::new(
            pool.clone(),
            chat.clone(),
            videos.clone(),
            chunks.clone(),
            tasks.clone(),
            llm,
        );

        Self {
            config,
            pool,
            channels,
            videos,
            segments,
            chunks,
            chat,
            tasks,
            settings,
            rag,
        }
    }

    /// Resolves retrieval/LLM tuning parameters from the `rag` settings
    /// component, falling back to the process's static config defaults
    /// whenever a row is absent — the settings table is seeded on boot,
    /// but a handler must still degrade gracefully if it isn't.
    pub async fn rag_params(&self) -> RagParams {
        let top_k = self
            .settings
            .get_int("rag", "retrieval", "top_k")
            .await
            .unwrap_or(self.config.rag.top_k);
        let vector_weight = self
            .settings
            .get_float("rag", "retrieval", "vector_weight")
            .await
            .unwrap_or(self.config.rag.vector_weight);
        let text_weight = self
            .settings
            .get_float("rag", "retrieval", "text_weight")
            .await
            .unwrap_or(self.config.rag.text_weight);
        let llm_temperature = self
            .settings
            .get_float("rag", "llm", "temperature")
            .await
            .unwrap_or(self.config.rag.llm_temperature);
        let max_summaries_per_video = self
            .settings
            .get_int("rag", "retrieval", "max_summaries_per_video")
            .await
            .unwrap_or(self.config.rag.max_summaries_per_video);
        let channel_scope_limit = self
            .settings
            .get_int("rag", "retrieval", "channel_scope_limit")
            .await
            .unwrap_or(self.config.rag.channel_scope_limit);

        RagParams {
            top_k,
            vector_weight,
            text_weight,
            llm_temperature,
            max_summaries_per_video,
            channel_scope_limit,
        }
    }
}

/// Assembles the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .nest(
            "/api/v1",
            Router::new()
                .route(
                    "/channels/",
                    get(crate::http::channels::list).post(crate::http::channels::create),
                )
                .route(
                    "/channels/{id}",
                    get(crate::http::channels::get)
                        .patch(crate::http::channels::update)
                        .delete(crate::http::channels::delete),
                )
                .route("/videos/", get(crate::http::videos::list))
                .route("/videos/{vid}", get(crate::http::videos::get))
                .route("/chat/sessions", get(crate::http::chat::list_sessions))
                .route(
                    "/chat/sessions/{id}",
                    get(crate::http::chat::get_session).delete(crate::http::chat::delete_session),
                )
                .route("/chat/ask_stream", post(crate::http::chat::ask_stream))
                .route("/pipeline/stats", get(crate::http::pipeline::stats))
                .route(
                    "/pipeline/tasks",
                    get(crate::http::pipeline::list_tasks).post(crate::http::pipeline::create_task),
                )
                .route("/pipeline/tasks/{id}", delete(crate::http::pipeline::delete_task))
                .route("/pipeline/events", get(crate::http::pipeline::events))
                .route(
                    "/settings/{component}",
                    get(crate::http::settings::get_component),
                )
                .route(
                    "/settings/{component}/{section}/{key}",
                    get(crate::http::settings::get_one)
                        .post(crate::http::settings::set_one)
                        .put(crate::http::settings::set_one)
                        .delete(crate::http::settings::delete_one),
                ),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
