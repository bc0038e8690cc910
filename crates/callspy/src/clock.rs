//! Clocks for Invocation Timestamps
//!
//! Every [`crate::InvocationRecord`] is stamped by the spy's clock when the
//! wrapped target returns. [`SystemClock`] reads wall time; [`FakeClock`]
//! lets tests pin or advance time so recorded timestamps are deterministic.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Source of "now" for invocation records
pub trait Clock: Send + Sync + Debug {
    /// Current time as seen by the spy
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// Time string could not be parsed
    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

/// Fake clock for deterministic timestamps
///
/// Time only moves when the test moves it. Values past the range chrono can
/// represent are clamped to its minimum or maximum instant.
#[derive(Debug, Default)]
pub struct FakeClock {
    /// Fake time in milliseconds since Unix epoch
    current_ms: AtomicI64,
}

impl FakeClock {
    /// Clock pinned at `time_ms` milliseconds since the Unix epoch
    #[must_use]
    pub const fn fixed(time_ms: i64) -> Self {
        Self {
            current_ms: AtomicI64::new(time_ms),
        }
    }

    /// Clock pinned at an RFC 3339 time such as `2024-01-15T10:00:00Z`
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTime`] if the string doesn't parse.
    pub fn fixed_iso(iso: &str) -> Result<Self, ClockError> {
        DateTime::parse_from_rfc3339(iso.trim())
            .map(|time| Self::fixed(time.timestamp_millis()))
            .map_err(|err| ClockError::InvalidTime(format!("{iso}: {err}")))
    }

    /// Current fake time in milliseconds
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Move the clock to `time_ms`
    pub fn set_fixed_time(&self, time_ms: i64) {
        self.current_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Advance fake time, saturating at the end of `i64` milliseconds
    pub fn fast_forward(&self, duration: Duration) {
        let step = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        let _ = self
            .current_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(step))
            });
    }

    /// Advance fake time by milliseconds
    pub fn fast_forward_ms(&self, ms: u64) {
        self.fast_forward(Duration::from_millis(ms));
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms();
        DateTime::from_timestamp_millis(ms).unwrap_or(if ms < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }
}
