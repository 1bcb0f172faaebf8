use std::time::Duration;

use thiserror::Error;

/// Failures of the label generator. The pipeline records these per cluster;
/// they never fail a whole request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("invalid naming config: {0}")]
    InvalidConfig(String),
    #[error("label request failed: {0}")]
    Request(String),
    /// The provider answered with something other than a completion.
    #[error("unexpected label response: {0}")]
    Response(String),
    #[error("label request timed out after {0:?}")]
    Timeout(Duration),
    #[error("label generator returned an empty label")]
    Empty,
}

impl NamingError {
    pub fn is_retryable(&self) -> bool {
        match self {
            NamingError::Request(msg) => semantic::resilience::is_retryable_error(msg),
            NamingError::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(NamingError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(NamingError::Request("HTTP error 429 Too Many Requests".into()).is_retryable());
        assert!(!NamingError::Request("HTTP error 401 Unauthorized".into()).is_retryable());
        assert!(!NamingError::Empty.is_retryable());
        assert!(!NamingError::Response("no choices".into()).is_retryable());
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = NamingError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "label request timed out after 250ms");
        let err = NamingError::Timeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "label request timed out after 20s");
    }
}
