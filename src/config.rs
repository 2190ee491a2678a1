// src/config.rs

//! Configuration types for the burst limiter

// dependencies
use crate::errors::LimiterError;
use std::time::Duration;

/// Configuration for limiter behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    pub(crate) capacity: u32,
    pub(crate) refill_amount: u32,
    pub(crate) refill_interval: Duration,
    pub(crate) prefilled: bool,
}

impl LimiterConfig {
    /// Create a new configuration holding at most `capacity` tokens and
    /// crediting one token every `refill_interval`.
    ///
    /// The bucket starts empty (cold start); see [`LimiterConfig::bursty`]
    /// for one that starts full.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_amount: 1,
            refill_interval,
            prefilled: false,
        }
    }

    /// A burst-ready limiter: starts full, refills one token per interval.
    pub fn bursty(capacity: u32, refill_interval: Duration) -> Self {
        Self::new(capacity, refill_interval).prefilled(true)
    }

    /// One request per interval with no burst allowance.
    ///
    /// The bucket starts empty, so even the first request waits for a tick.
    pub fn steady(refill_interval: Duration) -> Self {
        Self::new(1, refill_interval)
    }

    /// Builder-style: set capacity
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder-style: set tokens credited per tick
    pub fn refill_amount(mut self, refill_amount: u32) -> Self {
        self.refill_amount = refill_amount;
        self
    }

    /// Builder-style: set time between credits
    pub fn refill_interval(mut self, refill_interval: Duration) -> Self {
        self.refill_interval = refill_interval;
        self
    }

    /// Builder-style: start full (`true`) or empty (`false`)
    pub fn prefilled(mut self, prefilled: bool) -> Self {
        self.prefilled = prefilled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LimiterError> {
        if self.capacity == 0 {
            return Err(LimiterError::InvalidCapacity);
        }
        if self.refill_amount == 0 {
            return Err(LimiterError::InvalidRefillAmount);
        }
        if self.refill_interval.is_zero() {
            return Err(LimiterError::InvalidRefillInterval);
        }
        Ok(())
    }

    pub(crate) fn initial_tokens(&self) -> u32 {
        if self.prefilled { self.capacity } else { 0 }
    }
}
