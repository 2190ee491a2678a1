// src/lib.rs

//! # Burst Limiter
//!
//! A bursty token-bucket rate limiter for async tasks.
//!
//! The bucket holds up to `capacity` tokens and a background task credits
//! `refill_amount` tokens every `refill_interval`. A full bucket admits a
//! burst of requests at once; after that, requests are admitted at the
//! steady refill rate. Requests that have to wait are served strictly in
//! arrival order.
//!
//! ## Quick Example
//!
//! ```rust
//! use burst_limiter::{Limiter, LimiterConfig, WaitGroup};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), burst_limiter::LimiterError> {
//! // bursts of up to 3, then one request every 200ms
//! let config = LimiterConfig::bursty(3, Duration::from_millis(200));
//! let limiter = Arc::new(Limiter::new(config)?);
//!
//! let workers = WaitGroup::new();
//! for id in 1..=5 {
//!     let limiter = Arc::clone(&limiter);
//!     let guard = workers.guard();
//!     tokio::spawn(async move {
//!         let _guard = guard;
//!         if let Ok(grant) = limiter.acquire(1).await {
//!             println!("request {id} admitted after {:?}", grant.waited);
//!         }
//!     });
//! }
//!
//! workers.wait().await;
//! limiter.shutdown().await;
//! # Ok(())
//! # }
//! ```

// private modules
mod admission;
mod barrier;
mod clock;
mod config;
mod errors;
mod limiter;
mod replenisher;
mod token_store;

// public API exports
pub use barrier::{WaitGroup, WaitGuard};
pub use clock::{Clock, IntervalTicker, SystemClock, Ticker};
pub use config::LimiterConfig;
pub use errors::LimiterError;
pub use limiter::{Grant, Limiter, LimiterState};
