//! Stage schedule and stage clock.
//!
//! The host divides every tick into the same ordered sequence of named
//! stages. The [`StageSchedule`] is that sequence; the [`StageClock`] walks
//! it, yielding one [`StagePosition`] per stage and advancing the tick
//! counter each time the sequence wraps around.
//!
//! # Design Principles
//!
//! - The last stage of the schedule is the terminal stage. Per-tick resets
//!   happen there and nowhere else.
//! - The tick counter uses checked arithmetic (no silent overflow).

use praxis_types::{MAX_STAGES, Stage, StageMask};

use crate::config::TickConfig;

/// Errors that can occur while building a schedule or advancing the clock.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// The schedule configuration is unusable.
    #[error("invalid stage schedule: {reason}")]
    InvalidSchedule {
        /// Explanation of what is wrong with the schedule.
        reason: String,
    },

    /// A stage name does not appear in the schedule.
    #[error("unknown stage: {name}")]
    UnknownStage {
        /// The name that failed to resolve.
        name: String,
    },
}

/// The fixed, ordered sequence of named stages that makes up one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSchedule {
    /// Stage names in emission order.
    names: Vec<String>,

    /// First stage of every tick.
    first: Stage,

    /// Last stage of every tick.
    terminal: Stage,
}

impl StageSchedule {
    /// Build a schedule from stage names in emission order.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidSchedule`] if the list is empty, longer
    /// than [`MAX_STAGES`], or contains a duplicate name.
    pub fn new<I, S>(names: I) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ScheduleError::InvalidSchedule {
                reason: "at least one stage must be configured".to_owned(),
            });
        }
        if names.len() > MAX_STAGES {
            return Err(ScheduleError::InvalidSchedule {
                reason: format!("at most {MAX_STAGES} stages are supported, got {}", names.len()),
            });
        }
        for (i, name) in names.iter().enumerate() {
            if names.iter().skip(i.saturating_add(1)).any(|other| other == name) {
                return Err(ScheduleError::InvalidSchedule {
                    reason: format!("stage '{name}' appears more than once"),
                });
            }
        }
        let invalid = || ScheduleError::InvalidSchedule {
            reason: "stage index out of range".to_owned(),
        };
        let first = Stage::from_index(0).ok_or_else(invalid)?;
        let terminal = names
            .len()
            .checked_sub(1)
            .and_then(Stage::from_index)
            .ok_or_else(invalid)?;
        Ok(Self {
            names,
            first,
            terminal,
        })
    }

    /// Build the schedule described by a tick configuration.
    ///
    /// # Errors
    ///
    /// See [`StageSchedule::new`].
    pub fn from_config(config: &TickConfig) -> Result<Self, ScheduleError> {
        Self::new(config.stages.iter().cloned())
    }

    /// Number of stages per tick.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: a schedule has at least one stage.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The first stage of every tick.
    pub const fn first(&self) -> Stage {
        self.first
    }

    /// The last stage of every tick, where per-tick resets happen.
    pub const fn terminal(&self) -> Stage {
        self.terminal
    }

    /// Whether `stage` is the terminal stage.
    pub fn is_terminal(&self, stage: Stage) -> bool {
        stage == self.terminal()
    }

    /// All stages in emission order.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        (0..self.names.len()).filter_map(Stage::from_index)
    }

    /// The set of every stage in the schedule.
    pub const fn all(&self) -> StageMask {
        StageMask::up_to(self.terminal())
    }

    /// The stage after `stage` within the same tick, if any.
    pub fn next(&self, stage: Stage) -> Option<Stage> {
        let next = stage.index().checked_add(1)?;
        if next < self.names.len() {
            Stage::from_index(next)
        } else {
            None
        }
    }

    /// Name of a stage.
    pub fn name(&self, stage: Stage) -> &str {
        self.names.get(stage.index()).map_or("?", String::as_str)
    }

    /// Resolve a stage name.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::UnknownStage`] if no stage has that name.
    pub fn stage(&self, name: &str) -> Result<Stage, ScheduleError> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(Stage::from_index)
            .ok_or_else(|| ScheduleError::UnknownStage {
                name: name.to_owned(),
            })
    }

    /// Resolve a list of stage names into a set.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::UnknownStage`] for the first name that does not
    /// resolve.
    pub fn mask<S: AsRef<str>>(&self, names: &[S]) -> Result<StageMask, ScheduleError> {
        names.iter().try_fold(StageMask::EMPTY, |mask, name| {
            Ok(mask.with(self.stage(name.as_ref())?))
        })
    }
}

/// Where the clock currently is: a tick number and a stage within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StagePosition {
    /// Tick number, starting at 1 for the first tick.
    pub tick: u64,
    /// Stage within the tick.
    pub stage: Stage,
}

/// Walks a [`StageSchedule`] one stage at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageClock {
    /// The schedule being walked.
    schedule: StageSchedule,

    /// Current tick number (0 before the first stage is emitted).
    tick: u64,

    /// Stage most recently emitted, `None` before the first.
    current: Option<Stage>,
}

impl StageClock {
    /// Create a clock positioned before the first stage of tick 1.
    pub const fn new(schedule: StageSchedule) -> Self {
        Self {
            schedule,
            tick: 0,
            current: None,
        }
    }

    /// Advance to the next stage, rolling into a new tick after the terminal
    /// stage.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<StagePosition, ScheduleError> {
        let next = match self.current.and_then(|stage| self.schedule.next(stage)) {
            Some(stage) => stage,
            None => {
                self.tick = self.tick.checked_add(1).ok_or(ScheduleError::TickOverflow)?;
                self.schedule.first()
            }
        };
        self.current = Some(next);
        Ok(StagePosition {
            tick: self.tick,
            stage: next,
        })
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Stage most recently emitted.
    pub const fn current(&self) -> Option<Stage> {
        self.current
    }

    /// Whether the clock sits on the terminal stage (so the next call to
    /// [`advance`](Self::advance) starts a new tick).
    pub fn at_tick_end(&self) -> bool {
        self.current
            .is_none_or(|stage| self.schedule.is_terminal(stage))
    }

    /// The schedule being walked.
    pub const fn schedule(&self) -> &StageSchedule {
        &self.schedule
    }
}
