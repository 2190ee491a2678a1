// src/barrier.rs

// counting rendezvous used to drain outstanding work before closing a limiter

// dependencies
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// Waits for a set of tasks to finish.
///
/// Call [`WaitGroup::add`] before starting work, [`WaitGroup::done`] (or drop
/// a [`WaitGuard`]) when each piece finishes, and [`WaitGroup::wait`] to block
/// until the count is back at zero. Clones share the same counter.
#[derive(Debug, Clone)]
pub struct WaitGroup {
    count: Arc<watch::Sender<usize>>,
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitGroup {
    pub fn new() -> Self {
        Self {
            count: Arc::new(watch::Sender::new(0)),
        }
    }

    pub fn add(&self, n: usize) {
        self.count.send_modify(|count| *count += n);
    }

    /// Mark one unit of work as finished. A `done` without a matching `add`
    /// is ignored.
    pub fn done(&self) {
        self.count.send_modify(|count| match count.checked_sub(1) {
            Some(next) => *count = next,
            None => warn!("WaitGroup::done called with no outstanding work"),
        });
    }

    /// Register one unit of work that finishes when the guard is dropped.
    pub fn guard(&self) -> WaitGuard {
        self.add(1);
        WaitGuard { group: self.clone() }
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolve once the count reaches zero.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // the sender lives in self, so this cannot fail
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

/// Calls [`WaitGroup::done`] on drop.
#[derive(Debug)]
pub struct WaitGuard {
    group: WaitGroup,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}
