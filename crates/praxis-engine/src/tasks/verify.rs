//! Final check of a finished build.

use std::collections::BTreeMap;

use praxis_core::task::{Step, Task, TaskCx, TaskError};
use praxis_sim::WorldView;
use praxis_types::{BlockPos, TargetState};
use tracing::info;

use super::BuildReport;
use crate::agent::Agent;

/// Confirms that every target holds its state, passing the build's report
/// through.
#[derive(Debug)]
pub struct VerifyTask {
    targets: BTreeMap<BlockPos, TargetState>,
    report: BuildReport,
}

impl VerifyTask {
    /// Verify `targets` after a build that produced `report`.
    pub const fn new(targets: BTreeMap<BlockPos, TargetState>, report: BuildReport) -> Self {
        Self { targets, report }
    }
}

impl Task<Agent> for VerifyTask {
    type Output = BuildReport;

    fn on_start(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BuildReport>, TaskError> {
        self.on_stage(cx)
    }

    fn on_stage(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BuildReport>, TaskError> {
        let world = cx.env().world();
        let wrong: Vec<String> = self
            .targets
            .iter()
            .filter(|(pos, target)| !target.is_satisfied_by(&world.block_state(**pos)))
            .map(|(pos, _)| pos.to_string())
            .collect();
        if !wrong.is_empty() {
            return Err(TaskError::failed(format!(
                "positions differ from their targets: {}",
                wrong.join(", ")
            )));
        }
        info!(positions = self.targets.len(), "every target verified");
        Ok(Step::Done(self.report.clone()))
    }
}
