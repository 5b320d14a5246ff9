use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Maps every crate-local error into an HTTP response, carrying
/// `(status, kind, message)` as an `IntoResponse` impl so every handler
/// can just `?` its way out.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.kind,
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<ytrag_core::YtragError> for ApiError {
    fn from(e: ytrag_core::YtragError) -> Self {
        let status = match &e {
            ytrag_core::YtragError::NotFound(_) => StatusCode::NOT_FOUND,
            ytrag_core::YtragError::Validation(_) => StatusCode::BAD_REQUEST,
            ytrag_core::YtragError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            ytrag_core::YtragError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ytrag_core::YtragError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ytrag_core::YtragError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ytrag_core::YtragError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ytrag_core::YtragError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ytrag_core::YtragError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            kind: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<ytrag_db::DbError> for ApiError {
    fn from(e: ytrag_db::DbError) -> Self {
        ytrag_core::YtragError::from(e).into()
    }
}

impl From<ytrag_rag::RagError> for ApiError {
    fn from(e: ytrag_rag::RagError) -> Self {
        ytrag_core::YtragError::from(e).into()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ytrag_db::DbError::from(e).into()
    }
}
