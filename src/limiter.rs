// src/limiter.rs

// burst-limiter: a token bucket with a FIFO admission queue

// dependencies
use crate::admission::{AdmissionQueue, Outcome};
use crate::clock::{Clock, SystemClock};
use crate::config::LimiterConfig;
use crate::errors::LimiterError;
use crate::replenisher;
use crate::token_store::TokenStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Lifecycle of a limiter. There is no way back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterState {
    Open,
    /// Closed, but the replenisher has not yet acknowledged the stop.
    Closing,
    Closed,
}

/// A successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// Tokens debited for this request
    pub amount: u32,
    /// When the tokens were debited
    pub granted_at: Instant,
    /// Time spent queued; zero for immediate grants
    pub waited: Duration,
}

impl Grant {
    fn immediate(amount: u32, granted_at: Instant) -> Self {
        Self {
            amount,
            granted_at,
            waited: Duration::ZERO,
        }
    }
}

// balance and wait list live under one lock, so every credit, debit, grant
// and cancellation is totally ordered
#[derive(Debug)]
struct State {
    store: TokenStore,
    queue: AdmissionQueue,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct Shared<C> {
    state: Mutex<State>,
    refill_amount: u32,
    clock: C,
}

impl<C: Clock> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, State> {
        // nothing panics while holding the lock, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit one tick's worth of tokens and wake whoever can now proceed.
    /// Returns the number of queued requests granted, or `None` once closed.
    pub(crate) fn replenish(&self) -> Option<usize> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        let State { store, queue, .. } = &mut *state;
        store.credit(self.refill_amount);
        Some(queue.dispatch(store, self.clock.now()))
    }

    /// Mark the limiter closed and release every waiter with `Closed`.
    /// Returns the number released, or `None` if it was already closed.
    pub(crate) fn close(&self) -> Option<usize> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.closed = true;
        Some(state.queue.close_all())
    }
}

/// A bursty token-bucket rate limiter.
///
/// Holds at most `capacity` tokens and credits `refill_amount` tokens every
/// `refill_interval` from a background task. Requests that cannot be served
/// immediately wait in strict arrival order: a large request at the head of
/// the queue holds back smaller ones behind it.
///
/// C is the clock type, defaulting to SystemClock.
/// Share a limiter between tasks with an `Arc`; dropping it closes it.
#[derive(Debug)]
pub struct Limiter<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
    config: LimiterConfig,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl Limiter<SystemClock> {
    /// Create a limiter driven by the tokio timer.
    ///
    /// # Panics
    ///
    /// Panics if the current tokio runtime was built without the time driver
    /// (`enable_time`). Outside any runtime this returns `NoRuntime` instead.
    pub fn new(config: LimiterConfig) -> Result<Self, LimiterError> {
        Self::with_config(config, SystemClock)
    }
}

// methods for the Limiter type
impl<C: Clock> Limiter<C> {
    /// Create a limiter from a config object and a clock.
    ///
    /// Fails if the config is invalid or if there is no tokio runtime to run
    /// the replenisher on.
    ///
    /// # Panics
    ///
    /// Whatever `clock.start` panics on. For [`SystemClock`] that is a runtime
    /// built without the time driver.
    pub fn with_config(config: LimiterConfig, clock: C) -> Result<Self, LimiterError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| LimiterError::NoRuntime)?;

        let ticker = clock.start(config.refill_interval);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                store: TokenStore::new(config.capacity, config.initial_tokens()),
                queue: AdmissionQueue::new(),
                closed: false,
            }),
            refill_amount: config.refill_amount,
            clock,
        });

        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();
        replenisher::spawn(
            &runtime,
            Arc::clone(&shared),
            ticker,
            shutdown.clone(),
            stopped.clone(),
        );

        debug!(
            capacity = config.capacity,
            refill_amount = config.refill_amount,
            refill_interval = ?config.refill_interval,
            prefilled = config.prefilled,
            "limiter started"
        );

        Ok(Self {
            shared,
            config,
            shutdown,
            stopped,
        })
    }

    /// Wait until `amount` tokens are granted or the limiter closes.
    ///
    /// Dropping the returned future before it resolves cancels the request;
    /// tokens are never charged for a request nobody observed.
    pub async fn acquire(&self, amount: u32) -> Result<Grant, LimiterError> {
        self.acquire_inner(amount, None).await
    }

    /// Like [`Limiter::acquire`], but gives up with `Timeout` once `timeout`
    /// has elapsed. The deadline covers time spent in the queue.
    pub async fn acquire_timeout(&self, amount: u32, timeout: Duration) -> Result<Grant, LimiterError> {
        self.acquire_inner(amount, Some(timeout)).await
    }

    async fn acquire_inner(&self, amount: u32, timeout: Option<Duration>) -> Result<Grant, LimiterError> {
        let (id, rx, enqueued_at) = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(LimiterError::Closed);
            }
            self.check_amount(amount)?;
            let now = self.shared.clock.now();
            // only take the fast path when nobody is queued ahead of us
            if state.queue.is_empty() && state.store.try_debit(amount) {
                trace!(amount, "granted immediately");
                return Ok(Grant::immediate(amount, now));
            }
            let (id, rx) = state.queue.enqueue(amount, now);
            trace!(waiter = id, amount, queued = state.queue.len(), "request queued");
            (id, rx, now)
        };

        let mut pending = Pending {
            shared: &self.shared,
            id,
            amount,
            rx,
            settled: false,
        };
        let outcome = match timeout {
            None => pending.wait().await,
            Some(limit) => {
                let waited = time::timeout(limit, pending.wait()).await;
                match waited {
                    Ok(outcome) => outcome,
                    Err(_) => pending.expire(limit),
                }
            }
        };

        outcome.map(|granted_at| Grant {
            amount,
            granted_at,
            waited: granted_at.saturating_duration_since(enqueued_at),
        })
    }

    /// Take `amount` tokens only if they are available right now.
    ///
    /// Never queues. While other requests are waiting this reports
    /// `InsufficientTokens` rather than jumping ahead of them.
    pub fn try_acquire(&self, amount: u32) -> Result<Grant, LimiterError> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(LimiterError::Closed);
        }
        self.check_amount(amount)?;
        if !state.queue.is_empty() || !state.store.try_debit(amount) {
            return Err(LimiterError::InsufficientTokens);
        }
        Ok(Grant::immediate(amount, self.shared.clock.now()))
    }

    /// Close the limiter. Idempotent and non-blocking.
    ///
    /// Every queued request resolves with `Closed`, later calls fail with
    /// `Closed`, and the replenisher is told to stop.
    pub fn close(&self) {
        if let Some(released) = self.shared.close() {
            debug!(released, "limiter closed");
        }
        self.shutdown.cancel();
    }

    /// Close the limiter and wait for the replenisher to exit.
    pub async fn shutdown(&self) {
        self.close();
        self.stopped.cancelled().await;
    }

    /// Where the limiter is in its lifecycle. A limiter whose clock stops
    /// ticking closes itself.
    pub fn state(&self) -> LimiterState {
        if !self.shared.lock().closed {
            LimiterState::Open
        } else if self.stopped.is_cancelled() {
            LimiterState::Closed
        } else {
            LimiterState::Closing
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Tokens currently in the bucket.
    pub fn available(&self) -> u32 {
        self.shared.lock().store.tokens()
    }

    /// Requests currently queued.
    pub fn waiting(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    pub fn refill_amount(&self) -> u32 {
        self.config.refill_amount
    }

    pub fn refill_interval(&self) -> Duration {
        self.config.refill_interval
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    fn check_amount(&self, amount: u32) -> Result<(), LimiterError> {
        if amount == 0 || amount > self.config.capacity {
            return Err(LimiterError::InvalidAmount {
                requested: amount,
                capacity: self.config.capacity,
            });
        }
        Ok(())
    }
}

impl<C: Clock> Drop for Limiter<C> {
    fn drop(&mut self) {
        self.close();
    }
}

// a queued request owned by an in-flight acquire future
struct Pending<'a, C: Clock> {
    shared: &'a Shared<C>,
    id: u64,
    amount: u32,
    rx: oneshot::Receiver<Outcome>,
    settled: bool,
}

impl<C: Clock> Pending<'_, C> {
    async fn wait(&mut self) -> Outcome {
        // the sender only disappears without a message if the limiter is gone
        let outcome = (&mut self.rx).await.unwrap_or(Err(LimiterError::Closed));
        self.settled = true;
        outcome
    }

    // deadline hit: either we pull ourselves out of the queue, or a grant
    // (or close) already got there and we report that instead
    fn expire(&mut self, limit: Duration) -> Outcome {
        self.settled = true;
        let mut state = self.shared.lock();
        if state.queue.remove(self.id).is_some() {
            let State { store, queue, .. } = &mut *state;
            queue.dispatch(store, self.shared.clock.now());
            debug!(waiter = self.id, ?limit, "acquire timed out");
            return Err(LimiterError::Timeout(limit));
        }
        drop(state);
        self.rx
            .try_recv()
            .unwrap_or(Err(LimiterError::Timeout(limit)))
    }
}

impl<C: Clock> Drop for Pending<'_, C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.lock();
        let State { store, queue, closed } = &mut *state;
        if queue.remove(self.id).is_none() {
            // granted but never observed: hand the tokens back
            match self.rx.try_recv() {
                Ok(Ok(_)) if !*closed => {
                    store.credit(self.amount);
                }
                _ => return,
            }
        }
        let granted = queue.dispatch(store, self.shared.clock.now());
        debug!(waiter = self.id, granted, "queued acquire cancelled");
    }
}
