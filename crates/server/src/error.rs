use arrange::{ClusterError, NamingError, PipelineError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Label generation failed: {0}")]
    Naming(#[from] NamingError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Pipeline(PipelineError::Input(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Embedding(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Pipeline(PipelineError::Cluster(ClusterError::InvalidParameter {
                ..
            })) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(PipelineError::Cluster(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(PipelineError::Worker(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Naming(NamingError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Naming(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Pipeline(err) => err.code(),
            ServerError::Naming(NamingError::Timeout(_)) => "LABEL_TIMEOUT",
            ServerError::Naming(_) => "LABEL_FAILED",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(err: JsonRejection) -> Self {
        ServerError::BadRequest(err.body_text())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrange::SemanticError;

    #[test]
    fn pipeline_errors_map_to_client_or_gateway_status() {
        let input = ServerError::from(PipelineError::Input("empty".into()));
        assert_eq!(input.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(input.error_code(), "INVALID_INPUT");

        let upstream =
            ServerError::from(PipelineError::Embedding(SemanticError::CircuitOpen("hf".into())));
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let ragged = ServerError::from(PipelineError::Cluster(ClusterError::NonFiniteValue {
            index: 0,
        }));
        assert_eq!(ragged.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let worker = ServerError::from(PipelineError::Worker("task panicked".into()));
        assert_eq!(worker.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(worker.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn naming_errors_on_title_endpoint() {
        assert_eq!(
            ServerError::from(NamingError::Request("HTTP error 500".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServerError::from(NamingError::Timeout(std::time::Duration::from_secs(20))).error_code(),
            "LABEL_TIMEOUT"
        );
    }
}
