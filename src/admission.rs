// src/admission.rs

// FIFO wait list and head-of-line dispatch

// dependencies
use crate::errors::LimiterError;
use crate::token_store::TokenStore;
use std::collections::VecDeque;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::trace;

/// What a waiter eventually receives: the grant instant or the reason it was
/// released without tokens.
pub(crate) type Outcome = Result<Instant, LimiterError>;

/// A pending acquire request.
#[derive(Debug)]
pub(crate) struct Waiter {
    id: u64,
    amount: u32,
    enqueued_at: Instant,
    slot: oneshot::Sender<Outcome>,
}

/// Waiters in arrival order.
///
/// Membership is the cancellation state: a waiter that is no longer in the
/// queue has either been granted, released on close, or cancelled, and all
/// three happen under the limiter's lock. That makes grant and removal
/// mutually exclusive for any single waiter.
#[derive(Debug, Default)]
pub(crate) struct AdmissionQueue {
    waiters: VecDeque<Waiter>,
    next_id: u64,
}

impl AdmissionQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a waiter at the tail and hand back its id and notification slot.
    pub(crate) fn enqueue(&mut self, amount: u32, now: Instant) -> (u64, oneshot::Receiver<Outcome>) {
        let id = self.next_id;
        self.next_id += 1;
        let (slot, rx) = oneshot::channel();
        self.waiters.push_back(Waiter {
            id,
            amount,
            enqueued_at: now,
            slot,
        });
        (id, rx)
    }

    /// Remove a waiter that gave up. `None` means it already left the queue.
    pub(crate) fn remove(&mut self, id: u64) -> Option<Waiter> {
        let index = self.waiters.iter().position(|waiter| waiter.id == id)?;
        self.waiters.remove(index)
    }

    /// Grant tokens from the head of the queue until the head cannot be
    /// satisfied. A smaller request further back never overtakes a larger
    /// one in front of it.
    pub(crate) fn dispatch(&mut self, store: &mut TokenStore, now: Instant) -> usize {
        let mut granted = 0;
        loop {
            let Some(head) = self.waiters.front() else {
                break;
            };
            if !store.try_debit(head.amount) {
                break;
            }
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.slot.send(Ok(now)).is_err() {
                // receiver is gone, nobody will consume these tokens
                store.credit(waiter.amount);
                continue;
            }
            trace!(
                waiter = waiter.id,
                amount = waiter.amount,
                waited_ms = now.saturating_duration_since(waiter.enqueued_at).as_millis() as u64,
                "granted queued request"
            );
            granted += 1;
        }
        granted
    }

    /// Release every waiter with `Closed`. Returns how many were released.
    pub(crate) fn close_all(&mut self) -> usize {
        let released = self.waiters.len();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.slot.send(Err(LimiterError::Closed));
        }
        released
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
