//! Runtime control of the tick runner.
//!
//! [`RunControl`] is shared between the runner and whoever drives it (a
//! signal handler, a test, an embedding host). Pause, stop, and tick-speed
//! changes take effect between ticks, never in the middle of one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::TickConfig;

/// Reason the runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// A stop was requested.
    Stopped,
    /// The host reported it has nothing left to do.
    HostFinished,
}

/// Shared control state for the tick runner.
#[derive(Debug)]
pub struct RunControl {
    /// Whether the runner is paused.
    paused: AtomicBool,

    /// Wakes the runner when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Milliseconds between ticks (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Wall-clock time the control was created.
    started_at: DateTime<Utc>,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<RunEndReason>>,
}

impl RunControl {
    /// Create control state from tick configuration.
    pub fn new(config: &TickConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(config.tick_interval_ms),
            max_ticks: config.max_ticks,
            started_at: Utc::now(),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the runner is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause before the next tick.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume and wake the runner.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the runner is no longer paused.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop before the next tick.
    ///
    /// A paused runner is woken so it can observe the request.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why the run ended.
    pub async fn set_end_reason(&self, reason: RunEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// Why the run ended, if it has.
    pub async fn end_reason(&self) -> Option<RunEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Milliseconds between ticks.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the tick interval. Returns the previous interval.
    pub fn set_tick_interval_ms(&self, ms: u64) -> u64 {
        self.tick_interval_ms.swap(ms, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `tick` reaches the configured limit.
    pub const fn tick_limit_reached(&self, tick: u64) -> bool {
        self.max_ticks > 0 && tick >= self.max_ticks
    }

    /// The configured tick limit (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Seconds since the control was created.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn control(max_ticks: u64) -> RunControl {
        RunControl::new(&TickConfig {
            max_ticks,
            tick_interval_ms: 0,
            ..TickConfig::default()
        })
    }

    #[test]
    fn tick_limit_zero_is_unlimited() {
        assert!(!control(0).tick_limit_reached(u64::MAX));
        assert!(control(3).tick_limit_reached(3));
        assert!(!control(3).tick_limit_reached(2));
    }

    #[test]
    fn interval_swap_returns_previous() {
        let control = control(0);
        assert_eq!(control.set_tick_interval_ms(25), 0);
        assert_eq!(control.tick_interval_ms(), 25);
    }

    #[tokio::test]
    async fn stop_wakes_paused_runner() {
        let control = Arc::new(control(0));
        control.pause();
        let waiter = Arc::clone(&control);
        let handle = tokio::spawn(async move { waiter.wait_if_paused().await });
        control.request_stop();
        assert!(handle.await.is_ok());
        assert!(control.is_stop_requested());
        assert!(!control.is_paused());
    }
}
