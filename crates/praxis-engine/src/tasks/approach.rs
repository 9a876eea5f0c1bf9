//! Walk the player to where a result becomes actionable.
//!
//! The walk is planned as a breadth-first search over standing cells: a
//! cell is free when the feet and head cells have no outline and the cell
//! below does. Cells the build still has to fill are avoided. The player
//! moves one cell per tick along the planned path, and the path is
//! planned again if the next cell stops being free.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use praxis_core::task::{Step, Task, TaskCx, TaskError};
use praxis_sim::WorldView;
use praxis_sim::result::Goal;
use praxis_types::{BlockPos, Direction, Vec3};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::world::EYE_HEIGHT;

/// Furthest horizontal distance from the start the search explores.
pub const SEARCH_RADIUS: i32 = 24;

/// Cells the search visits before giving up.
pub const MAX_SEARCH_CELLS: usize = 4096;

/// Ticks a walk may take.
pub const APPROACH_TIMEOUT_TICKS: u64 = 200;

/// Feet position when standing in `cell`.
pub fn feet_at(cell: BlockPos) -> Vec3 {
    Vec3::new(
        f64::from(cell.x) + 0.5,
        f64::from(cell.y),
        f64::from(cell.z) + 0.5,
    )
}

/// Whether standing in `cell` satisfies `goal`.
pub fn satisfies(goal: Goal, cell: BlockPos) -> bool {
    match goal {
        Goal::Near { pos, radius } => {
            let eye = feet_at(cell) + Vec3::new(0.0, EYE_HEIGHT, 0.0);
            eye.distance(pos.center()) <= f64::from(radius)
        }
        Goal::Away { pos } => cell.down(1) != pos && cell != pos,
    }
}

/// Whether the player can stand in `cell`.
pub fn is_free(world: &dyn WorldView, avoid: &BTreeSet<BlockPos>, cell: BlockPos) -> bool {
    let head = cell.offset(Direction::Up);
    let floor = cell.down(1);
    !avoid.contains(&cell)
        && !avoid.contains(&head)
        && world.is_loaded(cell)
        && world.in_world(cell)
        && world.outline(cell).is_empty()
        && world.outline(head).is_empty()
        && !world.outline(floor).is_empty()
}

/// Shortest walk from `start` to the nearest cell satisfying `goal`.
///
/// The returned path excludes `start`. Steps go to one of the four
/// horizontal neighbours, one cell up, or one cell down.
pub fn find_path(
    world: &dyn WorldView,
    avoid: &BTreeSet<BlockPos>,
    start: BlockPos,
    goal: Goal,
) -> Option<Vec<BlockPos>> {
    if satisfies(goal, start) {
        return Some(Vec::new());
    }

    let mut prev: BTreeMap<BlockPos, BlockPos> = BTreeMap::new();
    let mut queue = VecDeque::new();
    let mut visited = 0_usize;
    queue.push_back(start);

    let mut found = None;
    while let Some(current) = queue.pop_front() {
        visited = visited.saturating_add(1);
        if visited > MAX_SEARCH_CELLS {
            break;
        }
        for direction in Direction::HORIZONTAL {
            let side = current.offset(direction);
            for next in [side, side.offset(Direction::Up), side.down(1)] {
                if next == start
                    || prev.contains_key(&next)
                    || next.x.abs_diff(start.x) > SEARCH_RADIUS.unsigned_abs()
                    || next.z.abs_diff(start.z) > SEARCH_RADIUS.unsigned_abs()
                    || !is_free(world, avoid, next)
                {
                    continue;
                }
                prev.insert(next, current);
                if satisfies(goal, next) {
                    found = Some(next);
                    break;
                }
                queue.push_back(next);
            }
            if found.is_some() {
                break;
            }
        }
        if found.is_some() {
            break;
        }
    }

    let mut cursor = found?;
    let mut path = VecDeque::new();
    while cursor != start {
        path.push_front(cursor);
        cursor = *prev.get(&cursor)?;
    }
    Some(path.into_iter().collect())
}

/// Walk until the player stands where `goal` is met.
///
/// Completes with the cell the player ends up in.
#[derive(Debug)]
pub struct ApproachTask {
    goal: Goal,
    avoid: BTreeSet<BlockPos>,
    path: VecDeque<BlockPos>,
    last_step: Option<u64>,
}

impl ApproachTask {
    /// A walk towards `goal` that never enters a cell in `avoid`.
    pub const fn new(goal: Goal, avoid: BTreeSet<BlockPos>) -> Self {
        Self {
            goal,
            avoid,
            path: VecDeque::new(),
            last_step: None,
        }
    }

    fn plan(&mut self, agent: &Agent, from: BlockPos) -> Result<(), TaskError> {
        let path = find_path(agent.world(), &self.avoid, from, self.goal)
            .ok_or_else(|| TaskError::failed(format!("no free path from {from} to {:?}", self.goal)))?;
        debug!(from = %from, steps = path.len(), "walk planned");
        self.path = path.into();
        Ok(())
    }
}

impl Task<Agent> for ApproachTask {
    type Output = BlockPos;

    fn on_start(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BlockPos>, TaskError> {
        let agent = cx.env();
        let here = agent.world().player().feet.block_pos();
        if satisfies(self.goal, here) {
            return Ok(Step::Done(here));
        }
        info!(from = %here, goal = ?self.goal, "approaching");
        self.plan(agent, here)?;
        Ok(Step::Pending)
    }

    fn on_stage(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<BlockPos>, TaskError> {
        let me = cx.me();
        let age = cx.forest().age(me)?;
        if age >= APPROACH_TIMEOUT_TICKS {
            return Err(TaskError::failed(format!("walk to {:?} timed out", self.goal)));
        }
        let Some(position) = cx.position() else {
            return Ok(Step::Pending);
        };
        if self.last_step == Some(position.tick) {
            return Ok(Step::Pending);
        }

        let agent = cx.env();
        let here = agent.world().player().feet.block_pos();
        if satisfies(self.goal, here) {
            return Ok(Step::Done(here));
        }
        if self
            .path
            .front()
            .is_none_or(|next| !is_free(agent.world(), &self.avoid, *next))
        {
            self.plan(agent, here)?;
        }
        let Some(next) = self.path.pop_front() else {
            return Ok(Step::Done(here));
        };
        agent.world().move_player(feet_at(next));
        self.last_step = Some(position.tick);
        if satisfies(self.goal, next) {
            debug!(cell = %next, "arrived");
            return Ok(Step::Done(next));
        }
        Ok(Step::Pending)
    }
}
