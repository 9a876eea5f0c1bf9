//! Strategies that turn one target change into results.
//!
//! [`SimContext::simulate`] runs the basic checks and then dispatches by
//! target kind: removal goes to the break strategy, a placement with a
//! profile goes to the interact strategy. A placement over a block that
//! cannot be replaced yields nothing.

mod breaking;
mod interact;

use tracing::trace;

use praxis_core::config::BuildConfig;
use praxis_types::{BlockPos, BlockState, TargetState};

use crate::check::basic_check;
use crate::dependency::{Dependency, DependencyStack};
use crate::process::ProcessorRegistry;
use crate::result::SimResult;
use crate::scan::{Hit, ScanOutcome};
use crate::select::select;
use crate::simulator::ResultSink;
use crate::world::{Viewpoint, WorldView};

/// Everything a strategy reads, plus where its results go.
pub struct SimContext<'a> {
    world: &'a dyn WorldView,
    view: &'a Viewpoint,
    config: &'a BuildConfig,
    registry: &'a ProcessorRegistry,
    sink: &'a ResultSink,
    stack: DependencyStack,
}

impl<'a> SimContext<'a> {
    /// A context with an empty dependency stack.
    pub const fn new(
        world: &'a dyn WorldView,
        view: &'a Viewpoint,
        config: &'a BuildConfig,
        registry: &'a ProcessorRegistry,
        sink: &'a ResultSink,
    ) -> Self {
        Self {
            world,
            view,
            config,
            registry,
            sink,
            stack: DependencyStack::new(config.max_dependencies),
        }
    }

    /// Number of dependencies this context runs under.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Simulate changing `current` at `pos` into `target`.
    pub fn simulate(&self, pos: BlockPos, current: &BlockState, target: &TargetState) {
        if let Some(result) = basic_check(self.world, self.config, pos, current, target) {
            self.emit(result);
            return;
        }
        match target {
            TargetState::Empty => breaking::simulate_break(self, pos, current),
            TargetState::Exact(state) => match self.registry.profile(current, state) {
                Some(profile) => interact::simulate_interact(self, pos, &profile),
                None => trace!(%pos, current = %current, target = %state, "no placement profile"),
            },
        }
    }

    /// Record a result, wrapped by every dependency on the stack.
    pub fn emit(&self, result: SimResult) {
        self.sink.push(self.stack.wrap(result));
    }

    /// Run `nested` under one more dependency. Dropped silently once the
    /// stack is full.
    pub fn with_dependency(&self, dependency: Dependency, nested: impl FnOnce(&SimContext<'a>)) {
        let Some(stack) = self.stack.push(dependency) else {
            trace!(
                origin = %dependency.origin,
                depth = self.stack.depth(),
                "dependency dropped at maximum depth"
            );
            return;
        };
        let inner = SimContext {
            world: self.world,
            view: self.view,
            config: self.config,
            registry: self.registry,
            sink: self.sink,
            stack,
        };
        nested(&inner);
    }

    /// Pick the aim point of a scan, or record why there is none.
    fn resolve_scan(&self, pos: BlockPos, outcome: &ScanOutcome) -> Option<Hit> {
        if let Some(hit) = select(self.config.point_selection, self.view.rotation, &outcome.hits) {
            return Some(*hit);
        }
        match outcome.nearest_miss_sq(self.view.eye) {
            Some(distance_sq) => self.emit(SimResult::OutOfReach {
                pos,
                distance: distance_sq.sqrt(),
            }),
            None => self.emit(SimResult::NotVisible { pos }),
        }
        None
    }
}
