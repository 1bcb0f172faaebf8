use thiserror::Error;

/// Failures of the embedding collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemanticError {
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Transport-level failure or non-success HTTP status.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// The provider answered, but not with usable vectors.
    #[error("embedding inference failed: {0}")]
    Inference(String),
    #[error("circuit breaker open for provider '{0}'")]
    CircuitOpen(String),
}

impl SemanticError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SemanticError::Request(msg) => crate::resilience::is_retryable_error(msg),
            _ => false,
        }
    }
}
