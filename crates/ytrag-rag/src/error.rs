use thiserror::Error;

/// Errors raised by the RAG orchestrator and the metadata/SQL-agent path.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("database error: {0}")]
    Db(#[from] ytrag_db::DbError),

    #[error("external service error ({service}): {message}")]
    ExternalService { service: &'static str, message: String },

    #[error("timed out waiting for embedding after {0}s")]
    EmbedTimeout(u64),

    #[error("embed_question task failed: {0}")]
    EmbedFailed(String),

    #[error("sql agent rejected a non-SELECT statement: {0}")]
    UnsafeSql(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl From<RagError> for ytrag_core::YtragError {
    fn from(e: RagError) -> Self {
        match e {
            RagError::Db(e) => e.into(),
            RagError::ExternalService { service, message } => {
                ytrag_core::YtragError::ExternalService { service: service.to_string(), message }
            }
            RagError::EmbedTimeout(secs) => {
                ytrag_core::YtragError::Timeout(format!("embedding wait timed out after {secs}s"))
            }
            RagError::EmbedFailed(msg) => ytrag_core::YtragError::Pipeline(msg),
            RagError::UnsafeSql(msg) => ytrag_core::YtragError::Validation(msg),
            RagError::NotFound(msg) => ytrag_core::YtragError::NotFound(msg),
        }
    }
}
