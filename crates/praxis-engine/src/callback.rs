//! Tick callback that logs build progress.
//!
//! Every `every` ticks the callback renders the task forest at debug level
//! and logs where the player stands and how far a break has come.

use praxis_core::runner::TickCallback;
use praxis_core::tick::TickSummary;
use tracing::{debug, enabled, Level};

use crate::agent::BuildHost;

/// Logs the task forest periodically.
#[derive(Debug)]
pub struct ProgressCallback {
    every: u64,
}

impl ProgressCallback {
    /// Log every `every` ticks; zero disables logging.
    pub const fn new(every: u64) -> Self {
        Self { every }
    }
}

impl TickCallback<BuildHost> for ProgressCallback {
    fn on_tick(&mut self, summary: &TickSummary, host: &BuildHost) {
        if summary.tick.checked_rem(self.every) != Some(0) || !enabled!(Level::DEBUG) {
            return;
        }
        let player = host.agent().world().player();
        debug!(
            tick = summary.tick,
            opened = summary.opened,
            tasks = host.forest().size(),
            feet = ?player.feet,
            break_ticks_left = ?host.agent().interact.resource().break_ticks_left(),
            slot = host.agent().world().selected_slot(),
            stored = host.agent().inventory.resource().storage().len(),
            "build progress\n{}",
            host.forest().render()
        );
    }
}
