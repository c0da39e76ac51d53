//! Per-engine request spacing with optional random jitter.
//!
//! Consecutive requests to the same engine are kept at least `delay`
//! apart, where `delay` is drawn from `[min_delay, max_delay]` when random
//! delays are enabled. Concurrent callers reserve their slot under the lock
//! and sleep outside it, so one engine's wait never blocks another engine.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Spaces out requests per engine.
#[derive(Debug)]
pub struct RequestThrottler {
    min_delay: Duration,
    max_delay: Duration,
    random_delays: bool,
    engine_delays: HashMap<String, (Duration, Duration)>,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl RequestThrottler {
    /// Creates a throttler with a global delay range.
    ///
    /// A range with `min > max` is normalized by swapping the bounds.
    pub fn new(min_delay: Duration, max_delay: Duration, random_delays: bool) -> Self {
        let (min_delay, max_delay) = ordered(min_delay, max_delay);
        Self {
            min_delay,
            max_delay,
            random_delays,
            engine_delays: HashMap::new(),
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// A throttler that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, false)
    }

    /// Overrides the delay range for one engine.
    pub fn with_engine_delay(mut self, engine: impl Into<String>, min: Duration, max: Duration) -> Self {
        self.engine_delays.insert(engine.into(), ordered(min, max));
        self
    }

    /// Returns the delay that would be applied for the engine's next request,
    /// without waiting.
    pub fn get_delay(&self, engine: &str) -> Duration {
        let (min, max) = self.delay_range(engine);
        if self.random_delays && max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        }
    }

    /// Waits until the engine may be queried again, then records the request.
    pub async fn throttle(&self, engine: &str) {
        let delay = self.get_delay(engine);
        let scheduled = {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();
            let scheduled = match last.get(engine) {
                Some(&previous) => (previous + delay).max(now),
                None => now,
            };
            last.insert(engine.to_string(), scheduled);
            scheduled
        };

        let wait = scheduled.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!("Throttling {} for {:?}", engine, wait);
            tokio::time::sleep_until(scheduled).await;
        }
    }

    /// Forgets the last request time of one engine, or of all engines.
    pub async fn reset(&self, engine: Option<&str>) {
        let mut last = self.last_request.lock().await;
        match engine {
            Some(engine) => {
                last.remove(engine);
            }
            None => last.clear(),
        }
    }

    fn delay_range(&self, engine: &str) -> (Duration, Duration) {
        self.engine_delays
            .get(engine)
            .copied()
            .unwrap_or((self.min_delay, self.max_delay))
    }
}

impl Default for RequestThrottler {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(2), true)
    }
}

fn ordered(a: Duration, b: Duration) -> (Duration, Duration) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
