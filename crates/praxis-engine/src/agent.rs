//! The agent and the host that drives it.
//!
//! [`Agent`] is the environment every task runs in: the world, the
//! simulator, and one manager per resource. [`BuildHost`] owns the agent
//! and its task forest and plugs both into the tick driver.

use std::collections::BTreeMap;
use std::sync::Arc;

use praxis_core::clock::{StagePosition, StageSchedule};
use praxis_core::config::{PraxisConfig, TaskConfig};
use praxis_core::manager::{Manager, ManagerHooks, Resource};
use praxis_core::task::{TaskError, TaskForest, TaskId, TaskState};
use praxis_core::tick::{HostError, StageHost};
use praxis_sim::Simulator;
use praxis_types::{BlockPos, Item, OwnerId, Stage, TargetState};
use tokio::runtime::Handle;
use tracing::{error, info};

use crate::error::EngineError;
use crate::resources::{HotbarResource, InteractResource, InventoryResource, RotationResource};
use crate::tasks::{BuildReport, BuildTask, VerifyTask};
use crate::world::SharedWorld;

/// Number of managers an agent owns.
const MANAGER_COUNT: usize = 4;

/// One player: its world, its simulator, and its managers.
#[derive(Debug)]
pub struct Agent {
    owner: OwnerId,
    world: SharedWorld,
    simulator: Simulator,
    runtime: Handle,
    /// Where the player looks.
    pub rotation: Manager<RotationResource>,
    /// Which hotbar slot is selected.
    pub hotbar: Manager<HotbarResource>,
    /// Stored items.
    pub inventory: Manager<InventoryResource>,
    /// Breaking and clicking.
    pub interact: Manager<InteractResource>,
}

fn build_manager<R: Resource>(
    name: &str,
    resource: R,
    config: &PraxisConfig,
    schedule: &StageSchedule,
) -> Result<Manager<R>, EngineError> {
    let manager = Manager::builder(name, resource)
        .configure(&config.manager(name), config.tick.ticks_per_second)
        .build(schedule)?;
    Ok(manager)
}

impl Agent {
    /// Build an agent acting on `world`, with `storage` as its stored
    /// items. Simulation passes run on `runtime`.
    pub fn new(
        config: &PraxisConfig,
        schedule: &StageSchedule,
        world: SharedWorld,
        storage: Vec<Item>,
        runtime: Handle,
    ) -> Result<Self, EngineError> {
        let rotation = build_manager(
            "rotation",
            RotationResource::new(world.clone(), &config.rotation),
            config,
            schedule,
        )?;
        let hotbar = build_manager(
            "hotbar",
            HotbarResource::new(world.clone(), &config.hotbar),
            config,
            schedule,
        )?;
        let inventory = build_manager(
            "inventory",
            InventoryResource::new(world.clone(), storage, &config.inventory),
            config,
            schedule,
        )?;
        let interact = build_manager(
            "interact",
            InteractResource::new(world.clone()),
            config,
            schedule,
        )?;
        let simulator = Simulator::new(Arc::new(world.clone()), config.build.clone());
        Ok(Self {
            owner: OwnerId::new(),
            world,
            simulator,
            runtime,
            rotation,
            hotbar,
            inventory,
            interact,
        })
    }

    /// Owner id used for every request this agent submits.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The world.
    pub const fn world(&self) -> &SharedWorld {
        &self.world
    }

    /// The simulator.
    pub const fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    /// Runtime that simulation passes block on.
    pub const fn runtime(&self) -> &Handle {
        &self.runtime
    }

    fn manager(&mut self, index: usize) -> Option<&mut dyn ManagerHooks> {
        match index {
            0 => Some(&mut self.rotation),
            1 => Some(&mut self.hotbar),
            2 => Some(&mut self.inventory),
            3 => Some(&mut self.interact),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Drives one agent and its task forest from the tick driver.
pub struct BuildHost {
    agent: Agent,
    forest: TaskForest<Agent>,
    terminal: Stage,
    finale: Option<TaskId>,
}

impl std::fmt::Debug for BuildHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildHost")
            .field("forest", &self.forest)
            .field("terminal", &self.terminal)
            .field("finale", &self.finale)
            .finish_non_exhaustive()
    }
}

impl BuildHost {
    /// A host with an empty forest.
    ///
    /// Failure reports are also logged as one JSON line each.
    pub fn new(agent: Agent, config: &TaskConfig, schedule: &StageSchedule) -> Self {
        let mut forest = TaskForest::new(config);
        forest.set_failure_sink(|report| match serde_json::to_string(report) {
            Ok(json) => info!(report = %json, "failure report"),
            Err(e) => error!(error = %e, report = %report, "failure report not serializable"),
        });
        Self {
            agent,
            forest,
            terminal: schedule.terminal(),
            finale: None,
        }
    }

    /// Start building `targets`, then verify the result.
    pub fn start(&mut self, targets: BTreeMap<BlockPos, TargetState>) -> Result<(), TaskError> {
        info!(positions = targets.len(), "build starting");
        let build = self.forest.spawn(BuildTask::new(targets.clone()));
        let verify = self
            .forest
            .then(build, move |report: &BuildReport| VerifyTask::new(targets, report.clone()))?;
        self.forest.finally(verify, |report: &BuildReport| {
            match serde_json::to_string(report) {
                Ok(json) => info!(report = %json, "build verified"),
                Err(e) => info!(error = %e, "build verified"),
            }
        })?;
        self.finale = Some(verify.id());
        let root = self.forest.root();
        self.forest.execute(build, root, false, &mut self.agent)
    }

    /// The agent.
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The task forest.
    pub const fn forest(&self) -> &TaskForest<Agent> {
        &self.forest
    }

    /// State of the final task, once the build has been started.
    pub fn finale_state(&self) -> Option<TaskState> {
        self.finale.and_then(|id| self.forest.state(id).ok())
    }
}

impl StageHost for BuildHost {
    fn manager_count(&self) -> usize {
        MANAGER_COUNT
    }

    fn manager(&mut self, index: usize) -> Option<&mut dyn ManagerHooks> {
        self.agent.manager(index)
    }

    fn on_stage(&mut self, position: StagePosition) -> Result<(), HostError> {
        self.forest.on_stage(position, &mut self.agent);
        if position.stage == self.terminal {
            self.forest.advance_tick();
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        !self.forest.failures().is_empty()
            || self.finale_state().is_some_and(TaskState::is_terminal)
    }
}
