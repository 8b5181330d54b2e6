use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Class of a signed venue request.
///
/// Venues cap signed requests per interval, and housekeeping (balance refreshes, catalog
/// loads, open-order sweeps after a reconnect) can easily saturate that cap. Order
/// placement and cancellation must never queue behind housekeeping, so part of every
/// window is reserved for the [`RequestClass::Trading`] class.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestClass {
    /// Order placement and cancellation - may spend the whole window, including the
    /// reserved share.
    Trading,
    /// Everything else - balances, catalogs, order queries. Limited to the unreserved
    /// share of the window.
    Account,
}

struct State {
    /// Requests permitted per window, all classes combined.
    capacity: usize,
    /// Window share only [`RequestClass::Trading`] may spend.
    trading_reserve: usize,
    /// Current window length. Grows under venue backoff, shrinks back on recovery.
    interval: Duration,
    base_interval: Duration,
    max_interval: Duration,
    window_started: Instant,
    window_used: usize,
}

impl State {
    /// Roll into a fresh window if the current one has elapsed.
    fn roll_window(&mut self, now: Instant) {
        if now.duration_since(self.window_started) >= self.interval {
            self.window_started = now;
            self.window_used = 0;
        }
    }

    fn budget(&self, class: RequestClass) -> usize {
        match class {
            RequestClass::Trading => self.capacity,
            RequestClass::Account => self.capacity.saturating_sub(self.trading_reserve),
        }
    }
}

/// Windowed venue request limiter with a reserved trading share and adaptive backoff.
///
/// A 429/418 response reported via [`RateLimiter::report_violation`] doubles the window
/// length (capped), throttling everything until [`RateLimiter::reset_backoff`] is called
/// on the next successful request.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Construct a limiter allowing `capacity` requests every `interval`, with
    /// `trading_reserve` of them withheld from [`RequestClass::Account`] requests.
    ///
    /// The reserve is clamped below the capacity - an over-sized reserve would starve
    /// account requests forever.
    pub fn new(capacity: usize, trading_reserve: usize, interval: Duration) -> Self {
        let trading_reserve = trading_reserve.min(capacity.saturating_sub(1));

        Self {
            state: Arc::new(Mutex::new(State {
                capacity,
                trading_reserve,
                interval,
                base_interval: interval,
                max_interval: interval * 16,
                window_started: Instant::now(),
                window_used: 0,
            })),
        }
    }

    /// Take one request slot for the provided class, suspending until the window has
    /// room for it.
    pub async fn acquire(&self, class: RequestClass) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                state.roll_window(now);

                if state.window_used < state.budget(class) {
                    state.window_used += 1;
                    return;
                }

                // Window exhausted for this class - sleep out its remainder
                state
                    .interval
                    .saturating_sub(now.duration_since(state.window_started))
            };

            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Report a venue 429/418 response - the window doubles until recovery.
    pub async fn report_violation(&self) {
        let mut state = self.state.lock().await;
        state.interval = std::cmp::min(state.interval * 2, state.max_interval);
    }

    /// Restore the base window length after a successful request.
    pub async fn reset_backoff(&self) {
        let mut state = self.state.lock().await;
        state.interval = state.base_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_catalog_sweep_cannot_starve_order_placement() {
        // 3 requests per window, 1 withheld for trading
        let limiter = RateLimiter::new(3, 1, Duration::from_millis(50));

        // A reconnect-time open-orders sweep burns the unreserved share...
        limiter.acquire(RequestClass::Account).await;
        limiter.acquire(RequestClass::Account).await;

        // ...so further housekeeping has to wait for the next window
        let started = Instant::now();
        let background = limiter.clone();
        let blocked_sweep = tokio::spawn(async move {
            background.acquire(RequestClass::Account).await;
            Instant::now()
        });

        // while an order placement still clears through the reserved slot immediately
        limiter.acquire(RequestClass::Trading).await;
        assert!(started.elapsed() < Duration::from_millis(40));

        let sweep_resumed = blocked_sweep.await.unwrap();
        assert!(sweep_resumed.duration_since(started) >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_window_replenishes_after_interval() {
        let limiter = RateLimiter::new(2, 0, Duration::from_millis(40));

        limiter.acquire(RequestClass::Trading).await;
        limiter.acquire(RequestClass::Trading).await;

        // Third order operation waits out the window remainder
        let started = Instant::now();
        limiter.acquire(RequestClass::Trading).await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_venue_backoff_doubles_window_then_resets() {
        let limiter = RateLimiter::new(1, 0, Duration::from_millis(30));
        limiter.acquire(RequestClass::Trading).await;

        // Venue answered 429 - the next slot opens a doubled window later
        limiter.report_violation().await;
        let started = Instant::now();
        limiter.acquire(RequestClass::Trading).await;
        assert!(started.elapsed() >= Duration::from_millis(55));

        // Recovery restores the base cadence
        limiter.reset_backoff().await;
        let started = Instant::now();
        limiter.acquire(RequestClass::Trading).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
