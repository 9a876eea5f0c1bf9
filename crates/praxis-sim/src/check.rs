//! Checks that settle a position before any strategy runs.
//!
//! The checks run in a fixed order and the first that applies wins:
//! 1. **Loaded** -- is the chunk holding the position loaded?
//! 2. **Done** -- does the position already match the target?
//! 3. **Ignored** -- is the block on the ignore list (removal only)?
//! 4. **In world** -- is the position inside the world?
//! 5. **Breakable** -- can the block be broken at all (removal only)?

use praxis_core::config::BuildConfig;
use praxis_types::{BlockPos, BlockState, Hardness, TargetState};

use crate::result::SimResult;
use crate::world::WorldView;

/// Run the basic checks for changing `current` at `pos` into `target`.
///
/// Returns the settling result, or `None` if a strategy has to decide.
pub fn basic_check(
    world: &dyn WorldView,
    config: &BuildConfig,
    pos: BlockPos,
    current: &BlockState,
    target: &TargetState,
) -> Option<SimResult> {
    if !world.is_loaded(pos) {
        return Some(SimResult::ChunkNotLoaded { pos });
    }
    if target.is_satisfied_by(current) {
        return Some(SimResult::Done { pos });
    }
    let removing = matches!(target, TargetState::Empty);
    if removing && config.ignored_blocks.iter().any(|name| *name == current.name) {
        return Some(SimResult::Ignored { pos });
    }
    if !world.in_world(pos) {
        return Some(SimResult::OutOfWorld { pos });
    }
    if removing && !current.liquid && current.hardness == Hardness::Unbreakable {
        return Some(SimResult::Unbreakable { pos });
    }
    None
}
