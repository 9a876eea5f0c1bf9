//! The simulation entry points and the concurrent pass.
//!
//! [`Simulator::simulate`] evaluates one position on the calling thread.
//! [`Simulator::pass`] fans out one blocking unit per position on the tokio
//! runtime, at most `max_concurrency` at a time, all writing into one
//! shared [`ResultSink`]. The pass joins every unit before it returns, and
//! a unit that panicked is reported only after the rest have been joined.
//! Units are not cancellable: dropping an unfinished pass discards its
//! results, while units already running finish in the background.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, warn};

use praxis_core::config::BuildConfig;
use praxis_types::{BlockPos, BlockState, TargetState};

use crate::error::SimError;
use crate::process::ProcessorRegistry;
use crate::result::{SimResult, best_actionable};
use crate::strategy::SimContext;
use crate::world::{Viewpoint, WorldView};

/// Thread-safe collection of results shared by the units of a pass.
#[derive(Debug, Default)]
pub struct ResultSink {
    results: Mutex<Vec<SimResult>>,
}

impl ResultSink {
    /// An empty sink.
    pub const fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
        }
    }

    /// Add one result.
    pub fn push(&self, result: SimResult) {
        self.results.lock().push(result);
    }

    /// Number of results collected so far.
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// Take every result, best first.
    pub fn take_sorted(&self) -> Vec<SimResult> {
        let mut results = std::mem::take(&mut *self.results.lock());
        results.sort_by(SimResult::compare);
        results
    }
}

/// Runs simulations against one world with one configuration.
///
/// Cloning is cheap: the world, registry, and configuration are shared.
#[derive(Clone)]
pub struct Simulator {
    world: Arc<dyn WorldView>,
    registry: Arc<ProcessorRegistry>,
    config: Arc<BuildConfig>,
}

impl core::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simulator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// A simulator with the built-in pre-processors.
    pub fn new(world: Arc<dyn WorldView>, config: BuildConfig) -> Self {
        Self {
            world,
            registry: Arc::new(ProcessorRegistry::with_builtin()),
            config: Arc::new(config),
        }
    }

    /// Replace the pre-processor registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// The build configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The pre-processor registry.
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// The world the simulator reads.
    pub fn world(&self) -> &dyn WorldView {
        &*self.world
    }

    /// Simulate changing `current` at `pos` into `target`, best first.
    pub fn simulate(
        &self,
        pos: BlockPos,
        current: &BlockState,
        target: &TargetState,
        view: &Viewpoint,
    ) -> Vec<SimResult> {
        let sink = ResultSink::new();
        SimContext::new(&*self.world, view, &self.config, &self.registry, &sink)
            .simulate(pos, current, target);
        sink.take_sorted()
    }

    /// Simulate every position of `targets` concurrently, best first.
    ///
    /// The current state of each position is read from the world.
    pub async fn pass(
        &self,
        targets: BTreeMap<BlockPos, TargetState>,
        view: Viewpoint,
    ) -> Result<Vec<SimResult>, SimError> {
        let positions = targets.len();
        debug!(positions, "simulation pass started");

        let sink = Arc::new(ResultSink::new());
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut units = JoinSet::new();

        for (pos, target) in targets {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| SimError::Runtime {
                    message: e.to_string(),
                })?;
            let simulator = self.clone();
            let sink = Arc::clone(&sink);
            units.spawn_blocking(move || {
                let current = simulator.world.block_state(pos);
                SimContext::new(
                    &*simulator.world,
                    &view,
                    &simulator.config,
                    &simulator.registry,
                    &sink,
                )
                .simulate(pos, &current, &target);
                drop(permit);
            });
        }

        let mut failure = None;
        while let Some(joined) = units.join_next().await {
            if let Err(error) = joined {
                let error = unit_failure(error);
                warn!(error = %error, "simulation unit failed");
                failure.get_or_insert(error);
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }

        let results = sink.take_sorted();
        debug!(
            positions,
            results = results.len(),
            best = results.first().map(SimResult::kind),
            "simulation pass finished"
        );
        Ok(results)
    }

    /// Drive [`pass`](Self::pass) to completion on `runtime`, blocking the
    /// caller until every unit has joined.
    ///
    /// Outside any runtime this blocks the calling thread. On a worker of a
    /// multi-threaded runtime the worker hands its other tasks off for the
    /// duration of the pass.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Runtime`] when called from a current-thread
    /// runtime, which cannot block without stalling the units it waits on.
    pub fn pass_blocking(
        &self,
        runtime: &Handle,
        targets: BTreeMap<BlockPos, TargetState>,
        view: Viewpoint,
    ) -> Result<Vec<SimResult>, SimError> {
        match Handle::try_current() {
            Err(_) => runtime.block_on(self.pass(targets, view)),
            Ok(current) if matches!(current.runtime_flavor(), RuntimeFlavor::MultiThread) => {
                task::block_in_place(|| runtime.block_on(self.pass(targets, view)))
            }
            Ok(_) => Err(SimError::Runtime {
                message: "pass_blocking called from a current-thread runtime".to_owned(),
            }),
        }
    }

    /// The best result below the configured actionable rank.
    pub fn best_actionable<'r>(&self, results: &'r [SimResult]) -> Option<&'r SimResult> {
        best_actionable(results, self.config.actionable_rank)
    }
}

fn unit_failure(error: JoinError) -> SimError {
    let message = if error.is_panic() {
        let payload = error.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unit panicked".to_owned())
    } else {
        "unit was cancelled".to_owned()
    };
    SimError::UnitFailed { message }
}
