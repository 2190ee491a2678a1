// src/errors.rs

// error handling for the burst limiter

// dependencies
use std::time::Duration;
use thiserror::Error;

/// Error type for limiter configuration issues and admission outcomes.
///
/// Configuration variants are only ever returned from construction. The
/// remaining variants are ordinary outcomes of `acquire` and `try_acquire`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("Capacity must be at least 1")]
    InvalidCapacity,
    #[error("Refill amount must be at least 1")]
    InvalidRefillAmount,
    #[error("Refill interval must be greater than zero")]
    InvalidRefillInterval,
    /// Constructed outside a tokio runtime context.
    #[error("No tokio runtime available to drive the replenisher")]
    NoRuntime,
    /// The request can never succeed: it is zero or larger than the bucket.
    #[error("Requested {requested} tokens, but the amount must be between 1 and {capacity}")]
    InvalidAmount { requested: u32, capacity: u32 },
    /// Returned by `try_acquire` only; an expected outcome, not a failure.
    #[error("Not enough tokens available")]
    InsufficientTokens,
    #[error("Timed out after {0:?} waiting for tokens")]
    Timeout(Duration),
    #[error("Limiter is closed")]
    Closed,
}

impl LimiterError {
    /// True for variants that are raised while building a limiter.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LimiterError::InvalidCapacity
                | LimiterError::InvalidRefillAmount
                | LimiterError::InvalidRefillInterval
                | LimiterError::NoRuntime
        )
    }
}
