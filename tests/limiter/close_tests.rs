// tests/limiter/close_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::manual_clock::ManualClock;
    use crate::fixtures::settle;
    use burst_limiter::{Limiter, LimiterConfig, LimiterError, LimiterState};
    use std::sync::Arc;
    use std::time::Duration;

    fn manual_limiter(capacity: u32, prefilled: bool) -> (Limiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(capacity, Duration::from_millis(200)).prefilled(prefilled);
        let limiter = Limiter::with_config(config, clock.clone()).unwrap();
        (limiter, clock)
    }

    #[tokio::test]
    async fn manual_ticks_refill_the_bucket() {
        let (limiter, clock) = manual_limiter(2, false);
        clock.tick();
        settle().await;
        assert_eq!(limiter.available(), 1);
        clock.tick();
        clock.tick();
        settle().await;
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test]
    async fn close_releases_every_waiter() {
        let (limiter, _clock) = manual_limiter(2, false);
        let limiter = Arc::new(limiter);

        let waiters: Vec<_> = [1, 2, 1]
            .into_iter()
            .map(|amount| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire(amount).await })
            })
            .collect();
        settle().await;
        assert_eq!(limiter.waiting(), 3);

        limiter.close();
        assert_eq!(limiter.waiting(), 0);
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Err(LimiterError::Closed));
        }
    }

    #[tokio::test]
    async fn close_overrides_waiter_deadlines() {
        let (limiter, _clock) = manual_limiter(1, false);
        let limiter = Arc::new(limiter);

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire_timeout(1, Duration::from_secs(60)).await })
        };
        settle().await;

        limiter.close();
        assert_eq!(waiter.await.unwrap(), Err(LimiterError::Closed));
    }

    // Closed terminality: every later call fails, even with tokens left
    #[tokio::test]
    async fn calls_after_close_fail() {
        let (limiter, _clock) = manual_limiter(3, true);
        limiter.close();
        limiter.close();

        assert!(limiter.is_closed());
        assert_eq!(limiter.acquire(1).await, Err(LimiterError::Closed));
        assert_eq!(
            limiter.acquire_timeout(1, Duration::from_millis(10)).await,
            Err(LimiterError::Closed)
        );
        assert_eq!(limiter.try_acquire(1), Err(LimiterError::Closed));

        // out-of-range amounts report the closed limiter too
        assert_eq!(limiter.acquire(4).await, Err(LimiterError::Closed));
        assert_eq!(limiter.acquire(0).await, Err(LimiterError::Closed));
        assert_eq!(limiter.try_acquire(4), Err(LimiterError::Closed));
        assert_eq!(limiter.try_acquire(0), Err(LimiterError::Closed));
    }

    #[tokio::test]
    async fn no_credit_after_close() {
        let (limiter, clock) = manual_limiter(3, false);
        clock.tick();
        settle().await;
        assert_eq!(limiter.available(), 1);

        limiter.close();
        for _ in 0..5 {
            clock.tick();
        }
        settle().await;
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn state_moves_through_closing_to_closed() {
        let (limiter, clock) = manual_limiter(1, true);
        assert_eq!(limiter.state(), LimiterState::Open);

        limiter.close();
        // the replenisher has not been scheduled since close
        assert_eq!(limiter.state(), LimiterState::Closing);

        limiter.shutdown().await;
        assert_eq!(limiter.state(), LimiterState::Closed);
        assert!(clock.is_stopped());
    }

    #[tokio::test]
    async fn dropping_the_limiter_stops_the_clock() {
        let (limiter, clock) = manual_limiter(1, true);
        settle().await;
        assert!(!clock.is_stopped());

        drop(limiter);
        settle().await;
        assert!(clock.is_stopped());
    }

    #[tokio::test]
    async fn stopped_clock_closes_the_limiter() {
        let (limiter, clock) = manual_limiter(2, false);
        let limiter = Arc::new(limiter);

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire(1).await })
        };
        settle().await;
        assert_eq!(limiter.waiting(), 1);

        clock.stop();
        settle().await;

        assert_eq!(waiter.await.unwrap(), Err(LimiterError::Closed));
        assert_eq!(limiter.state(), LimiterState::Closed);
        assert_eq!(limiter.acquire(1).await, Err(LimiterError::Closed));
    }

    #[tokio::test]
    async fn limiter_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Limiter>();
        assert_send_sync::<Limiter<ManualClock>>();
    }
}
