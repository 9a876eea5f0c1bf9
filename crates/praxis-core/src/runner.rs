//! Async tick loop with run controls.
//!
//! [`run_ticks`] wraps [`TickDriver::run_tick`] with pacing, pause/resume,
//! a stop switch, and a tick limit. Ticks are paced by a
//! [`tokio::time::Interval`] that is rebuilt whenever the interval changes.
//! The host stays on the calling task: nothing here requires it to be
//! `Send`.

use std::sync::Arc;

use tokio::time::{Duration, Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::control::{RunControl, RunEndReason};
use crate::tick::{StageHost, TickDriver, TickError, TickSummary};

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks executed by this run.
    pub total_ticks: u64,
}

/// Called after each completed tick.
pub trait TickCallback<H: ?Sized> {
    /// Observe a completed tick.
    fn on_tick(&mut self, summary: &TickSummary, host: &H);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl<H: ?Sized> TickCallback<H> for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _host: &H) {}
}

/// Drive `host` tick by tick until a stop condition is met.
///
/// Stop and pause are checked before every tick, the tick limit and
/// [`StageHost::is_finished`] after every tick.
///
/// # Errors
///
/// Returns [`RunnerError::Tick`] if a tick fails.
pub async fn run_ticks<H: StageHost + ?Sized>(
    driver: &mut TickDriver,
    host: &mut H,
    control: &Arc<RunControl>,
    callback: &mut dyn TickCallback<H>,
) -> Result<RunResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let mut pacing: Option<(u64, Interval)> = None;

    info!(
        max_ticks = control.max_ticks(),
        tick_interval_ms = control.tick_interval_ms(),
        stages = driver.clock().schedule().len(),
        "Tick runner starting"
    );

    loop {
        if control.is_paused() {
            info!("Runner paused, waiting for resume...");
            control.wait_if_paused().await;
            info!("Runner resumed");
        }

        if control.is_stop_requested() {
            info!("Stop requested");
            return finish(control, RunEndReason::Stopped, last_summary, total_ticks).await;
        }

        let summary = driver.run_tick(host)?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, host);

        if host.is_finished() {
            info!(tick = summary.tick, "Host finished");
            return finish(control, RunEndReason::HostFinished, Some(summary), total_ticks).await;
        }

        if control.tick_limit_reached(summary.tick) {
            info!(tick = summary.tick, max_ticks = control.max_ticks(), "Tick limit reached");
            return finish(control, RunEndReason::MaxTicksReached, Some(summary), total_ticks).await;
        }

        last_summary = Some(summary);

        let interval_ms = control.tick_interval_ms();
        if interval_ms == 0 {
            pacing = None;
            continue;
        }
        if pacing.as_ref().is_none_or(|(ms, _)| *ms != interval_ms) {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.reset();
            pacing = Some((interval_ms, ticker));
        }
        if let Some((_, ticker)) = pacing.as_mut() {
            ticker.tick().await;
        }
    }
}

async fn finish(
    control: &RunControl,
    end_reason: RunEndReason,
    final_summary: Option<TickSummary>,
    total_ticks: u64,
) -> Result<RunResult, RunnerError> {
    control.set_end_reason(end_reason).await;
    Ok(RunResult {
        end_reason,
        final_summary,
        total_ticks,
    })
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Run ended"
    );
    if result.final_summary.is_none() {
        warn!("Run ended with no ticks executed");
    }
}
