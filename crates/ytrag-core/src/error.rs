use thiserror::Error;

/// Top-level error kinds shared across crates. `ytrag-api` maps each
/// variant to an HTTP status; `ytrag-worker` maps each to a task
/// failure record.
#[derive(Debug, Error)]
pub enum YtragError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("external service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    #[error("pipeline stage aborted: {0}")]
    Pipeline(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl YtragError {
    /// Short error code, mirrored into API JSON bodies and worker
    /// `error_message` prefixes for log grepping.
    pub fn code(&self) -> &'static str {
        match self {
            YtragError::NotFound(_) => "NOT_FOUND",
            YtragError::Validation(_) => "VALIDATION_ERROR",
            YtragError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            YtragError::Pipeline(_) => "PIPELINE_ERROR",
            YtragError::Timeout(_) => "TIMEOUT",
            YtragError::Config(_) => "CONFIG_ERROR",
            YtragError::Database(_) => "DATABASE_ERROR",
            YtragError::Serialization(_) => "SERIALIZATION_ERROR",
            YtragError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, YtragError>;
