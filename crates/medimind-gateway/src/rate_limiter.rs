//! Fixed-window rate limiter with minimum call spacing.
//!
//! A window of length `W` admits at most `N` calls, and consecutive
//! admissions are at least `S = W / N` apart. Admission never fails; it
//! only delays. The counters live behind one async mutex that is held
//! across the delay, so concurrent admitters queue up in FIFO order and
//! can never both act on a stale count.

use std::time::Duration;

use medimind_core::{Error, Result};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Window length and call budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_calls: u32,
}

impl RateLimitConfig {
    /// `max_calls` per 60-second window.
    pub fn per_minute(max_calls: u32) -> Self {
        Self {
            window: Duration::from_secs(60),
            max_calls,
        }
    }
}

/// Proof of one admission.
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    /// 1-based admission counter over the limiter's lifetime.
    pub sequence: u64,
    pub admitted_at: Instant,
    /// Time spent between requesting and receiving the permit.
    pub waited: Duration,
}

struct LimiterState {
    window_start: Instant,
    count_in_window: u32,
    last_call_time: Option<Instant>,
    admitted: u64,
}

impl LimiterState {
    fn reset_window(&mut self, now: Instant) {
        self.window_start = now;
        self.count_in_window = 0;
    }
}

/// Rate limiter shared by every caller of one gateway.
pub struct RateLimiter {
    config: RateLimitConfig,
    spacing: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter. A zero call budget or zero-length window is a
    /// configuration error.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        if config.max_calls == 0 {
            return Err(Error::Config(
                "rate limit max_calls must be at least 1".into(),
            ));
        }
        if config.window.is_zero() {
            return Err(Error::Config("rate limit window must be non-zero".into()));
        }

        Ok(Self {
            spacing: config.window / config.max_calls,
            config,
            state: Mutex::new(LimiterState {
                window_start: Instant::now(),
                count_in_window: 0,
                last_call_time: None,
                admitted: 0,
            }),
        })
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Minimum gap between consecutive admissions.
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Total admissions so far.
    pub async fn admitted(&self) -> u64 {
        self.state.lock().await.admitted
    }

    /// Wait until the next outbound call may proceed, then record it.
    pub async fn admit(&self) -> Permit {
        let requested_at = Instant::now();
        let mut state = self.state.lock().await;
        let mut now = Instant::now();

        if now.saturating_duration_since(state.window_start) >= self.config.window {
            state.reset_window(now);
        }

        if state.count_in_window >= self.config.max_calls {
            let elapsed = now.saturating_duration_since(state.window_start);
            let wait = self.config.window.saturating_sub(elapsed);
            info!(
                "Rate limit reached ({} calls per {:?}). Waiting {:.1}s",
                self.config.max_calls,
                self.config.window,
                wait.as_secs_f64()
            );
            sleep(wait).await;
            now = Instant::now();
            state.reset_window(now);
        }

        if let Some(last) = state.last_call_time {
            let gap = now.saturating_duration_since(last);
            if gap < self.spacing {
                let wait = self.spacing - gap;
                debug!("Spacing calls: waiting {}ms", wait.as_millis());
                sleep(wait).await;
                now = Instant::now();
            }
        }

        state.last_call_time = Some(now);
        state.count_in_window += 1;
        state.admitted += 1;

        Permit {
            sequence: state.admitted,
            admitted_at: now,
            waited: now.saturating_duration_since(requested_at),
        }
    }
}
