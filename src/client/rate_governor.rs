//! Per-source call spacing shared across every concurrent search.
//!
//! External providers rate-limit the whole application, not one query, so
//! the last-dispatch timestamp for each source is process-wide state. A
//! caller holds no permit and receives no token; `acquire` simply refuses
//! to return until this source's minimum interval has elapsed, then
//! records the new dispatch time in the same critical section.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Minimum-interval throttle keyed by source name.
///
/// Injected into the aggregator at construction so tests can share,
/// reset, or replace it.
#[derive(Debug)]
pub struct RateGovernor {
    intervals: HashMap<String, Duration>,
    default_interval: Duration,
    last_dispatch: Mutex<HashMap<String, Instant>>,
}

impl RateGovernor {
    #[must_use]
    pub fn new(default_interval: Duration) -> Self {
        Self {
            intervals: HashMap::new(),
            default_interval,
            last_dispatch: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a source-specific minimum interval. Called once per
    /// adapter while the aggregator is being built.
    pub fn register(&mut self, source: &str, min_interval: Duration) {
        self.intervals.insert(source.to_string(), min_interval);
    }

    /// The interval enforced for a source.
    #[must_use]
    pub fn interval_for(&self, source: &str) -> Duration {
        self.intervals
            .get(source)
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// Blocks until a call to `source` is permitted, then records the
    /// dispatch timestamp.
    ///
    /// The check and the timestamp write happen under one lock, so no two
    /// calls to the same source can ever be spaced closer than its
    /// interval, regardless of how many searches run concurrently. A task
    /// that finds the slot taken sleeps outside the lock and re-checks:
    /// another task may legitimately win the slot in between.
    pub async fn acquire(&self, source: &str) {
        let interval = self.interval_for(source);
        loop {
            let wait = {
                let mut last = self.last_dispatch.lock().await;
                let now = Instant::now();
                match last.get(source) {
                    Some(previous) => {
                        let elapsed = now.duration_since(*previous);
                        if elapsed >= interval {
                            last.insert(source.to_string(), now);
                            None
                        } else {
                            Some(interval - elapsed)
                        }
                    }
                    None => {
                        last.insert(source.to_string(), now);
                        None
                    }
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    trace!(source, ?delay, "rate governor holding dispatch");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Forgets all dispatch history. Test hook.
    pub async fn reset(&self) {
        self.last_dispatch.lock().await.clear();
    }
}
