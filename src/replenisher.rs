// src/replenisher.rs

// background task that credits the bucket on every clock tick

// dependencies
use crate::clock::{Clock, Ticker};
use crate::limiter::Shared;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Spawn the replenisher onto `runtime`.
///
/// The task runs until `shutdown` is cancelled, the ticker runs dry, or the
/// limiter reports itself closed. A ticker that runs dry closes the limiter.
/// On the way out it stops the ticker and cancels `stopped`, which is how the
/// limiter learns the task is gone.
pub(crate) fn spawn<C: Clock>(
    runtime: &Handle,
    shared: Arc<Shared<C>>,
    ticker: C::Ticker,
    shutdown: CancellationToken,
    stopped: CancellationToken,
) {
    runtime.spawn(async move {
        // fires even if the task is dropped by a shutting-down runtime
        let _stopped = stopped.drop_guard();
        run(shared, ticker, shutdown).await;
    });
}

async fn run<C: Clock>(shared: Arc<Shared<C>>, mut ticker: C::Ticker, shutdown: CancellationToken) {
    loop {
        let tick = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            tick = ticker.tick() => tick,
        };
        let Some(at) = tick else {
            // no more refills will come, so nobody queued could ever be served
            if let Some(released) = shared.close() {
                debug!(released, "clock stopped, limiter closed");
            }
            break;
        };
        match shared.replenish() {
            Some(granted) => trace!(?at, granted, "refilled bucket"),
            None => break,
        }
    }
    ticker.stop();
    debug!("replenisher stopped");
}
