// src/clock.rs

// clock and ticker abstractions plus the tokio-backed implementation

// dependencies
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Periodic wake-up source that drives the replenisher.
///
/// `tick` resolves once per period with the instant of the tick, and resolves
/// to `None` forever after the ticker has been stopped. A limiter whose ticker
/// yields `None` closes itself and releases its waiters with `Closed`.
pub trait Ticker: Send + 'static {
    fn tick(&mut self) -> impl Future<Output = Option<Instant>> + Send;

    /// Stop ticking. Idempotent and irreversible.
    fn stop(&mut self);
}

/// Clock trait to abstract time retrieval and periodic ticking.
/// Implementors must be thread-safe (Send + Sync).
/// The limiter timestamps grants with `now` and drives its replenisher
/// from the ticker returned by `start`.
pub trait Clock: Send + Sync + 'static {
    type Ticker: Ticker;

    fn now(&self) -> Instant;

    fn start(&self, period: Duration) -> Self::Ticker;
}

/// SystemClock implementation using tokio's timer.
/// Honors a paused tokio clock, which keeps timing tests deterministic.
/// This is the default clock used by the Limiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Ticker = IntervalTicker;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn start(&self, period: Duration) -> IntervalTicker {
        IntervalTicker::new(period)
    }
}

/// Ticker backed by [`tokio::time::Interval`].
///
/// The first tick fires one full period after creation. Ticks missed while the
/// consumer was busy are skipped rather than replayed in a burst.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
    stopped: bool,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            stopped: false,
        }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> Option<Instant> {
        if self.stopped {
            return None;
        }
        Some(self.interval.tick().await)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
