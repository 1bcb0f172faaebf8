//! Resilience for calls to remote collaborators: retry with backoff and a
//! per-provider circuit breaker.
//!
//! Shared by the embedding client here and the chat-completions labeler in
//! the `naming` crate.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager, CircuitState,
};
pub use retry::{execute_with_retry_async, is_retryable_error, RetryConfig, RetryResult};
