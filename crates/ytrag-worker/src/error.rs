use thiserror::Error;

/// Errors raised by a pipeline stage. A stage failing for one video must
/// not propagate to the task runner as a hard error — `process_single_video`
/// catches this and records the video as failed, continuing the loop.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("database error: {0}")]
    Db(#[from] ytrag_db::DbError),

    #[error("external service error ({service}): {message}")]
    ExternalService { service: &'static str, message: String },

    #[error("subprocess failed: {0}")]
    Subprocess(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("media not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StageError>;

impl From<StageError> for ytrag_core::YtragError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::Db(e) => e.into(),
            StageError::ExternalService { service, message } => {
                ytrag_core::YtragError::ExternalService { service: service.to_string(), message }
            }
            StageError::Subprocess(msg) => ytrag_core::YtragError::Pipeline(msg),
            StageError::Timeout(secs) => {
                ytrag_core::YtragError::Timeout(format!("operation timed out after {secs}s"))
            }
            StageError::NotFound(msg) => ytrag_core::YtragError::NotFound(msg),
        }
    }
}
