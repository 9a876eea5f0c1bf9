//! The tick driver: walks the stage clock and dispatches every stage.
//!
//! Each stage runs as one ordered plan built by
//! [`PriorityLedger::plan`]: managers open from highest to lowest priority,
//! the host's stage handler runs, managers close from lowest to highest
//! priority, and on the terminal stage every manager resets last.

use tracing::{debug, trace};

use crate::clock::{ScheduleError, StageClock, StagePosition};
use crate::manager::ManagerHooks;
use crate::priority::{Phase, PriorityLedger};

/// Error type returned by a host's stage handler.
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while driving ticks.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The stage clock failed to advance.
    #[error("stage clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ScheduleError,
    },

    /// The host's stage handler failed.
    #[error("host failed in tick {tick} stage {stage}: {source}")]
    Host {
        /// Tick in which the handler failed.
        tick: u64,
        /// Name of the stage.
        stage: String,
        /// The handler's error.
        source: HostError,
    },
}

/// The host side of the stage loop.
///
/// The host owns the managers and the behaviors that talk to them. The
/// driver borrows one manager at a time, so `manager(i)` must keep
/// returning the same manager for the same index.
pub trait StageHost {
    /// Number of managers.
    fn manager_count(&self) -> usize;

    /// The manager at `index`.
    fn manager(&mut self, index: usize) -> Option<&mut dyn ManagerHooks>;

    /// Run the host's own work for `position`, between manager openings
    /// and closings.
    ///
    /// # Errors
    ///
    /// Any error aborts the tick once the stage's closings have run.
    fn on_stage(&mut self, position: StagePosition) -> Result<(), HostError>;

    /// Whether the host has nothing left to do.
    fn is_finished(&self) -> bool {
        false
    }
}

/// What happened during one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    /// The stage that ran.
    pub position: StagePosition,
    /// Managers that opened.
    pub opened: usize,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number.
    pub tick: u64,
    /// Stages run.
    pub stages: usize,
    /// Manager openings across every stage.
    pub opened: usize,
}

/// Drives a [`StageHost`] one stage at a time.
#[derive(Debug)]
pub struct TickDriver {
    /// The stage clock.
    clock: StageClock,
}

impl TickDriver {
    /// Create a driver positioned before the first tick.
    pub const fn new(clock: StageClock) -> Self {
        Self { clock }
    }

    /// The stage clock.
    pub const fn clock(&self) -> &StageClock {
        &self.clock
    }

    /// Advance to the next stage and dispatch it.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Clock`] if the tick counter overflows, or
    /// [`TickError::Host`] if the host's handler fails.
    pub fn run_stage<H: StageHost + ?Sized>(&mut self, host: &mut H) -> Result<StageReport, TickError> {
        let position = self.clock.advance()?;
        let schedule = self.clock.schedule();
        let terminal = schedule.is_terminal(position.stage);

        let count = host.manager_count();
        let priorities: Vec<u32> = (0..count)
            .map(|index| host.manager(index).map_or(0, |m| m.priority()))
            .collect();
        let plan = PriorityLedger::new(priorities.iter().copied()).plan(&priorities, terminal);

        let mut opened = 0_usize;
        let mut host_result = Ok(());
        for phase in plan {
            match phase {
                Phase::Open(index) => {
                    if let Some(manager) = host.manager(index)
                        && manager.open(position.stage)
                    {
                        trace!(manager = manager.name(), stage = schedule.name(position.stage), "opened");
                        opened = opened.saturating_add(1);
                    }
                }
                Phase::Host => host_result = host.on_stage(position),
                Phase::Close(index) => {
                    if let Some(manager) = host.manager(index) {
                        manager.close(position.stage);
                    }
                }
                Phase::Reset(index) => {
                    if let Some(manager) = host.manager(index) {
                        manager.end_tick();
                    }
                }
            }
        }

        host_result.map_err(|source| TickError::Host {
            tick: position.tick,
            stage: schedule.name(position.stage).to_owned(),
            source,
        })?;
        Ok(StageReport { position, opened })
    }

    /// Run every stage of the next tick.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`run_stage`](Self::run_stage).
    pub fn run_tick<H: StageHost + ?Sized>(&mut self, host: &mut H) -> Result<TickSummary, TickError> {
        let mut stages = 0_usize;
        let mut opened = 0_usize;
        loop {
            let report = self.run_stage(host)?;
            stages = stages.saturating_add(1);
            opened = opened.saturating_add(report.opened);
            if self.clock.at_tick_end() {
                let summary = TickSummary {
                    tick: report.position.tick,
                    stages,
                    opened,
                };
                debug!(tick = summary.tick, stages, opened, "tick complete");
                return Ok(summary);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use praxis_types::Stage;

    use super::*;
    use crate::clock::StageSchedule;

    /// Records every hook call into a shared journal.
    struct Probe {
        name: &'static str,
        priority: u32,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl ManagerHooks for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn open(&mut self, stage: Stage) -> bool {
            self.journal
                .lock()
                .unwrap()
                .push(format!("open {} {}", self.name, stage.index()));
            true
        }

        fn close(&mut self, stage: Stage) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("close {} {}", self.name, stage.index()));
        }

        fn end_tick(&mut self) {
            self.journal.lock().unwrap().push(format!("reset {}", self.name));
        }
    }

    struct Host {
        probes: Vec<Probe>,
        journal: Arc<Mutex<Vec<String>>>,
        fail_at: Option<usize>,
        absent: Option<usize>,
    }

    impl Host {
        fn new(priorities: &[(&'static str, u32)]) -> Self {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let probes = priorities
                .iter()
                .map(|&(name, priority)| Probe {
                    name,
                    priority,
                    journal: Arc::clone(&journal),
                })
                .collect();
            Self {
                probes,
                journal,
                fail_at: None,
                absent: None,
            }
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.journal.lock().unwrap())
        }
    }

    impl StageHost for Host {
        fn manager_count(&self) -> usize {
            self.probes.len()
        }

        fn manager(&mut self, index: usize) -> Option<&mut dyn ManagerHooks> {
            if self.absent == Some(index) {
                return None;
            }
            self.probes
                .get_mut(index)
                .map(|p| p as &mut dyn ManagerHooks)
        }

        fn on_stage(&mut self, position: StagePosition) -> Result<(), HostError> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("host {}", position.stage.index()));
            if self.fail_at == Some(position.stage.index()) {
                return Err("boom".into());
            }
            Ok(())
        }
    }

    fn driver(names: &[&str]) -> TickDriver {
        TickDriver::new(StageClock::new(StageSchedule::new(names.iter().copied()).unwrap()))
    }

    #[test]
    fn stage_dispatch_order() {
        let mut host = Host::new(&[("a", 1), ("b", 2), ("c", 3)]);
        let mut driver = driver(&["s0", "s1"]);

        let report = driver.run_stage(&mut host).unwrap();
        assert_eq!(report.opened, 3);
        assert_eq!(
            host.take(),
            vec![
                "open c 0", "open b 0", "open a 0", "host 0", "close a 0", "close b 0",
                "close c 0",
            ]
        );
    }

    #[test]
    fn absent_manager_keeps_the_others_on_their_own_slots() {
        let mut host = Host::new(&[("a", 1), ("b", 2), ("c", 3)]);
        host.absent = Some(0);
        let mut driver = driver(&["s0", "s1"]);

        let report = driver.run_stage(&mut host).unwrap();
        assert_eq!(report.opened, 2);
        assert_eq!(
            host.take(),
            vec!["open c 0", "open b 0", "host 0", "close b 0", "close c 0"]
        );
    }

    #[test]
    fn terminal_stage_resets_after_closings() {
        let mut host = Host::new(&[("a", 0), ("b", 1)]);
        let mut driver = driver(&["only"]);

        let summary = driver.run_tick(&mut host).unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.stages, 1);
        let journal = host.take();
        assert_eq!(
            journal.get(3..5).unwrap(),
            &["close a 0".to_owned(), "close b 0".to_owned()]
        );
        assert_eq!(journal.len(), 7);
        assert!(journal.iter().skip(5).all(|line| line.starts_with("reset")));
    }

    #[test]
    fn run_tick_covers_every_stage() {
        let mut host = Host::new(&[("a", 0)]);
        let mut driver = driver(&["s0", "s1", "s2"]);

        let first = driver.run_tick(&mut host).unwrap();
        let second = driver.run_tick(&mut host).unwrap();
        assert_eq!(first.stages, 3);
        assert_eq!(first.opened, 3);
        assert_eq!(second.tick, 2);
    }

    #[test]
    fn host_failure_still_closes_managers() {
        let mut host = Host::new(&[("a", 0)]);
        host.fail_at = Some(0);
        let mut driver = driver(&["s0", "s1"]);

        let result = driver.run_stage(&mut host);
        assert!(matches!(result, Err(TickError::Host { tick: 1, .. })));
        assert_eq!(host.take().last().unwrap(), "close a 0");
    }
}
