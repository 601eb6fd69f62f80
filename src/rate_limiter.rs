//! Minimum-spacing rate limiting for external calls.
//!
//! This module provides the [`RateLimiter`] struct which enforces a minimum
//! delay between consecutive calls that share a lane. The crawler uses a
//! single lane through [`RateLimiter::wait`] and [`RateLimiter::complete`];
//! the artifact pass uses one lane per download domain through
//! [`RateLimiter::acquire`].
//!
//! The first call on a lane proceeds immediately. Every later call sleeps
//! until the configured delay has elapsed since the previous call on the same
//! lane, whether that call succeeded or failed. On the sequential lane the
//! delay is measured from [`RateLimiter::complete`], i.e. from the end of the
//! previous call.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use citegraph_core::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_secs(1));
//!
//! // First lookup proceeds immediately, the second waits one second.
//! limiter.wait().await;
//! limiter.wait().await;
//!
//! // Downloads are spaced per domain.
//! limiter.acquire("https://arxiv.org/pdf/2301.01234v1.pdf").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Lane used by [`RateLimiter::wait`].
const SEQUENTIAL_LANE: &str = "metadata-lookup";

/// Warning threshold for cumulative delay per lane.
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(300);

/// Lane-based minimum-spacing rate limiter.
///
/// Designed to be wrapped in `Arc` and shared between the crawler and the
/// artifact tasks. `DashMap` holds per-lane state; a `tokio::sync::Mutex`
/// per lane makes the check-sleep-update sequence atomic.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between consecutive calls on the same lane.
    delay: Duration,

    /// Whether rate limiting is disabled (delay of zero).
    disabled: bool,

    /// Per-lane state. Values are `Arc` so the map shard lock is released
    /// before awaiting on the inner mutex.
    lanes: DashMap<String, Arc<LaneState>>,
}

#[derive(Debug)]
struct LaneState {
    /// `None` until the first call on this lane.
    last_call: Mutex<Option<Instant>>,

    /// Cumulative delay applied on this lane, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl LaneState {
    fn new() -> Self {
        Self {
            last_call: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a rate limiter with the given minimum spacing.
    ///
    /// A zero delay yields a disabled limiter.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = delay.as_millis()))]
    pub fn new(delay: Duration) -> Self {
        if delay.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            delay,
            disabled: false,
            lanes: DashMap::new(),
        }
    }

    /// Creates a rate limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            delay: Duration::ZERO,
            disabled: true,
            lanes: DashMap::new(),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the minimum spacing between calls on a lane.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Blocks until the next sequential metadata call may proceed.
    pub async fn wait(&self) {
        self.acquire_lane(SEQUENTIAL_LANE).await;
    }

    /// Marks the end of a sequential metadata call.
    ///
    /// The next [`wait`](Self::wait) measures the delay from this point, so a
    /// call slower than the delay is still followed by the full spacing.
    pub async fn complete(&self) {
        if self.disabled {
            return;
        }
        let state = self.lane_state(SEQUENTIAL_LANE);
        *state.last_call.lock().await = Some(Instant::now());
    }

    /// Blocks until a request to `url`'s domain may proceed.
    #[instrument(skip(self), fields(domain))]
    pub async fn acquire(&self, url: &str) {
        let domain = extract_domain(url);
        tracing::Span::current().record("domain", domain.as_str());
        self.acquire_lane(&domain).await;
    }

    async fn acquire_lane(&self, lane: &str) {
        if self.disabled {
            return;
        }

        let state = self.lane_state(lane);
        let mut last_call = state.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let delay = self.delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    lane,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying rate limit delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(delay) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        lane,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "rate limiting has added significant wall-clock time to this run"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        } else {
            debug!(lane, "first call on lane - no delay");
        }

        *last_call = Some(Instant::now());
    }

    fn lane_state(&self, lane: &str) -> Arc<LaneState> {
        self.lanes
            .entry(lane.to_string())
            .or_insert_with(|| Arc::new(LaneState::new()))
            .clone()
    }
}

/// Extracts the lowercase host from a URL.
///
/// Returns "unknown" for malformed URLs so that they still share one lane.
///
/// # Examples
///
/// ```
/// use citegraph_core::rate_limiter::extract_domain;
///
/// assert_eq!(extract_domain("https://arxiv.org/pdf/1"), "arxiv.org");
/// assert_eq!(extract_domain("http://Export.ARXIV.org/api"), "export.arxiv.org");
/// assert_eq!(extract_domain("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
