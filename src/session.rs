use crate::error::{TelemetryError, TelemetryResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation signal checked at the top of every loop iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    raised: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` only for the call that raised it.
    pub fn cancel(&self) -> bool {
        !self.raised.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Wall-clock anchor for a loop's session bound.
#[derive(Clone, Copy, Debug)]
pub struct SessionClock {
    pub started_at: Instant,
    pub started_wall: DateTime<Local>,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            started_wall: Local::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Wall time of a monotonic instant, anchored at the session start.
    /// Never goes backwards when the system clock is stepped.
    pub fn wall_at(&self, now: Instant) -> TelemetryResult<DateTime<Local>> {
        let offset = chrono::Duration::from_std(self.elapsed_at(now))
            .map_err(|e| TelemetryError::Internal(format!("session offset out of range: {}", e)))?;
        Ok(self.started_wall + offset)
    }

    pub fn deadline_passed(&self, limit: Duration) -> bool {
        self.elapsed() >= limit
    }
}

/// Flush cadence timer, kept apart from the acceptance gate.
#[derive(Clone, Copy, Debug)]
pub struct FlushTimer {
    interval: Duration,
    last_flush: Instant,
}

impl FlushTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_flush: now,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) > self.interval
    }

    pub fn reset(&mut self, now: Instant) {
        self.last_flush = now;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Logging session ran its full length
    SessionDeadline,
    /// Display loop ended and was configured to end the session
    DisplayFinished,
    /// Operator requested stop
    Interrupted,
    SamplerFailed,
    DisplayFailed,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SamplerReport {
    pub polls: u64,
    pub accepted: u64,
    pub flushes: u64,
    pub rows_written: u64,
    pub elapsed_secs: f64,
    pub cancelled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DisplayReport {
    pub renders: u64,
    pub render_failures: u64,
    pub last_message: Option<String>,
    pub elapsed_secs: f64,
    pub cancelled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionReport {
    pub stop_reason: StopReason,
    pub sampler: SamplerReport,
    pub display: DisplayReport,
}

impl SessionReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
