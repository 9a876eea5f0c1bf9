//! Carry out one interaction.

use praxis_core::request::Request;
use praxis_core::task::{Step, Task, TaskCx, TaskError};
use praxis_sim::WorldView;
use tracing::{debug, warn};

use super::Pursuit;
use crate::agent::Agent;
use crate::resources::Interaction;

/// Ticks an interaction may take before the attempt is given up.
pub const ACT_TIMEOUT_TICKS: u64 = 100;

/// What the task is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Aim,
    Select,
    Act,
}

/// Look at the block, select the slot, then break or click.
///
/// Completes with whether the position reached the interaction's outcome.
/// An attempt that runs out of time completes with `false` so that the
/// caller can simulate again from the changed world.
#[derive(Debug)]
pub struct ActTask {
    interaction: Interaction,
    phase: Phase,
    aim: Pursuit,
    select: Pursuit,
    act: Pursuit,
}

impl ActTask {
    /// A task carrying out `interaction`.
    pub fn new(interaction: Interaction) -> Self {
        Self {
            interaction,
            phase: Phase::Aim,
            aim: Pursuit::default(),
            select: Pursuit::default(),
            act: Pursuit::default(),
        }
    }

    fn reached(&self, agent: &Agent) -> bool {
        agent.world().block_state(self.interaction.pos()) == self.interaction.outcome()
    }
}

impl Task<Agent> for ActTask {
    type Output = bool;

    fn on_start(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<bool>, TaskError> {
        if self.reached(cx.env()) {
            return Ok(Step::Done(true));
        }
        self.on_stage(cx)
    }

    fn on_stage(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<bool>, TaskError> {
        let me = cx.me();
        let age = cx.forest().age(me)?;
        let agent = cx.env();
        let owner = agent.owner();

        loop {
            match self.phase {
                Phase::Aim => {
                    let rotation = self.interaction.rotation();
                    if !self
                        .aim
                        .drive(&mut agent.rotation, || Request::new(owner, rotation))
                    {
                        break;
                    }
                    self.phase = Phase::Select;
                }
                Phase::Select => {
                    let slot = self.interaction.slot();
                    if !self
                        .select
                        .drive(&mut agent.hotbar, || Request::new(owner, slot))
                    {
                        break;
                    }
                    self.phase = Phase::Act;
                }
                Phase::Act => {
                    let interaction = &self.interaction;
                    let done = self
                        .act
                        .drive(&mut agent.interact, || Request::new(owner, interaction.clone()));
                    if done || self.reached(agent) {
                        debug!(pos = %self.interaction.pos(), age, "interaction done");
                        return Ok(Step::Done(true));
                    }
                    break;
                }
            }
        }

        if age >= ACT_TIMEOUT_TICKS {
            warn!(
                pos = %self.interaction.pos(),
                phase = ?self.phase,
                age,
                "interaction timed out"
            );
            return Ok(Step::Done(false));
        }
        Ok(Step::Pending)
    }
}
