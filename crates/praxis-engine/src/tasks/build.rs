//! The build loop.
//!
//! Each round simulates every target that is not yet satisfied, picks the
//! best actionable result, and hands it to one child task:
//!
//! | Result                      | Child                          |
//! |-----------------------------|--------------------------------|
//! | break                       | [`ActTask`] breaking the block |
//! | interact                    | [`ActTask`] clicking           |
//! | wrong item (named)          | [`FetchTask`]                  |
//! | out of reach, player on top | [`ApproachTask`]               |
//! | not visible                 | [`ApproachTask`] closer        |
//!
//! The pass runs to completion inside the stage that starts the round, so
//! no manager changes the world while its units read it. When the child
//! finishes the next round starts from the changed world.

use std::collections::{BTreeMap, BTreeSet};

use praxis_core::task::{Step, Task, TaskCx, TaskError, TaskHandle};
use praxis_sim::result::Goal;
use praxis_sim::{SimResult, WorldView};
use praxis_types::{BlockPos, TargetState};
use serde::Serialize;
use tracing::{debug, info};

use super::{ActTask, ApproachTask, FetchTask};
use crate::agent::Agent;
use crate::resources::Interaction;

/// Rounds a build may take before it gives up.
pub const MAX_PASSES: u32 = 400;

/// Radius used to approach a position none of whose faces can be seen.
pub const NOT_VISIBLE_RADIUS: u32 = 2;

/// Counters describing how a build went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Simulation passes run.
    pub passes: u32,
    /// Blocks broken.
    pub broken: u32,
    /// Clicks that changed a block.
    pub placed: u32,
    /// Items moved into the hotbar.
    pub fetched: u32,
    /// Walks taken.
    pub approaches: u32,
    /// Interactions that ran out of time.
    pub retries: u32,
}

#[derive(Debug)]
enum Phase {
    Plan,
    Acting {
        handle: TaskHandle<bool>,
        breaking: bool,
    },
    Fetching(TaskHandle<u8>),
    Approaching(TaskHandle<BlockPos>),
}

/// Bring every position of `targets` to its target state.
///
/// Completes with a [`BuildReport`] once a pass finds nothing left to do.
#[derive(Debug)]
pub struct BuildTask {
    targets: BTreeMap<BlockPos, TargetState>,
    phase: Phase,
    report: BuildReport,
}

impl BuildTask {
    /// A build of `targets`.
    pub const fn new(targets: BTreeMap<BlockPos, TargetState>) -> Self {
        Self {
            targets,
            phase: Phase::Plan,
            report: BuildReport {
                passes: 0,
                broken: 0,
                placed: 0,
                fetched: 0,
                approaches: 0,
                retries: 0,
            },
        }
    }

    /// Positions the build will fill, which a walk must not enter.
    fn fill_cells(&self) -> BTreeSet<BlockPos> {
        self.targets
            .iter()
            .filter(|(_, target)| !matches!(target, TargetState::Empty))
            .map(|(pos, _)| *pos)
            .collect()
    }

    fn plan(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BuildReport>, TaskError> {
        let agent = cx.env();
        let remaining: BTreeMap<BlockPos, TargetState> = self
            .targets
            .iter()
            .filter(|(pos, target)| !target.is_satisfied_by(&agent.world().block_state(**pos)))
            .map(|(pos, target)| (*pos, target.clone()))
            .collect();

        if remaining.is_empty() {
            info!(
                passes = self.report.passes,
                broken = self.report.broken,
                placed = self.report.placed,
                "every target reached"
            );
            return Ok(Step::Done(self.report.clone()));
        }
        if self.report.passes >= MAX_PASSES {
            return Err(TaskError::failed(format!(
                "{} positions still unfinished after {MAX_PASSES} passes",
                remaining.len()
            )));
        }
        self.report.passes = self.report.passes.saturating_add(1);
        debug!(pass = self.report.passes, remaining = remaining.len(), "simulating");

        let view = agent.world().player().viewpoint();
        let results = agent
            .simulator()
            .pass_blocking(agent.runtime(), remaining, view)
            .map_err(|e| TaskError::failed(format!("simulation pass failed: {e}")))?;
        self.act_on(cx, &results)
    }

    fn act_on(
        &mut self,
        cx: &mut TaskCx<'_, Agent>,
        results: &[SimResult],
    ) -> Result<Step<BuildReport>, TaskError> {
        let Some(best) = cx.env().simulator().best_actionable(results) else {
            return self.walk_for(cx, results);
        };
        let inner = best.innermost();
        debug!(kind = inner.kind(), pos = %inner.pos(), origin = %best.pos(), "acting on best result");

        match inner {
            SimResult::Break(action) => {
                let handle = cx.spawn_child(ActTask::new(Interaction::breaking(action)), true)?;
                self.phase = Phase::Acting {
                    handle,
                    breaking: true,
                };
            }
            SimResult::Interact(action) => {
                let handle =
                    cx.spawn_child(ActTask::new(Interaction::Use(action.clone())), true)?;
                self.phase = Phase::Acting {
                    handle,
                    breaking: false,
                };
            }
            SimResult::WrongItem {
                item: Some(item), ..
            } => {
                let handle = cx.spawn_child(FetchTask::new(item.clone()), true)?;
                self.phase = Phase::Fetching(handle);
            }
            SimResult::WrongItem { item: None, pos } => {
                return Err(TaskError::failed(format!(
                    "no tool in the hotbar can break the block at {pos}"
                )));
            }
            SimResult::NotVisible { pos } => {
                let goal = Goal::Near {
                    pos: *pos,
                    radius: NOT_VISIBLE_RADIUS,
                };
                self.approach(cx, goal)?;
            }
            other => match other.goal() {
                Some(goal) => self.approach(cx, goal)?,
                None => {
                    return Err(TaskError::failed(format!(
                        "cannot act on {} at {}",
                        other.kind(),
                        other.pos()
                    )));
                }
            },
        }
        Ok(Step::Pending)
    }

    /// Nothing is actionable: walk towards the first result that says
    /// where to go.
    fn walk_for(
        &mut self,
        cx: &mut TaskCx<'_, Agent>,
        results: &[SimResult],
    ) -> Result<Step<BuildReport>, TaskError> {
        if let Some(goal) = results.iter().find_map(SimResult::goal) {
            self.approach(cx, goal)?;
            return Ok(Step::Pending);
        }
        let best = results
            .first()
            .map_or_else(|| "no result".to_owned(), |r| format!("{} at {}", r.kind(), r.pos()));
        Err(TaskError::failed(format!("nothing actionable, best was {best}")))
    }

    fn approach(&mut self, cx: &mut TaskCx<'_, Agent>, goal: Goal) -> Result<(), TaskError> {
        let handle = cx.spawn_child(ApproachTask::new(goal, self.fill_cells()), true)?;
        self.phase = Phase::Approaching(handle);
        Ok(())
    }

    fn settle(&mut self, cx: &mut TaskCx<'_, Agent>, finished: Phase) {
        match finished {
            Phase::Acting { handle, breaking } => {
                match (cx.forest().output(handle).copied(), breaking) {
                    (Some(true), true) => self.report.broken = self.report.broken.saturating_add(1),
                    (Some(true), false) => self.report.placed = self.report.placed.saturating_add(1),
                    _ => self.report.retries = self.report.retries.saturating_add(1),
                }
            }
            Phase::Fetching(handle) => {
                if cx.forest().output(handle).is_some() {
                    self.report.fetched = self.report.fetched.saturating_add(1);
                }
            }
            Phase::Approaching(_) => {
                self.report.approaches = self.report.approaches.saturating_add(1);
            }
            Phase::Plan => {}
        }
    }
}

impl Task<Agent> for BuildTask {
    type Output = BuildReport;

    fn on_start(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BuildReport>, TaskError> {
        info!(positions = self.targets.len(), "build started");
        self.plan(cx)
    }

    fn on_stage(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BuildReport>, TaskError> {
        match std::mem::replace(&mut self.phase, Phase::Plan) {
            Phase::Plan => self.plan(cx),
            finished => {
                self.settle(cx, finished);
                self.plan(cx)
            }
        }
    }

    fn on_cancel(&mut self, _env: &mut Agent) {
        self.phase = Phase::Plan;
    }
}
