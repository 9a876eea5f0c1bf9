//! Break strategy.
//!
//! In order: refuse to break the block the player stands on, displace
//! fluids with a filler block first, require a tool, break from inside the
//! shape without aiming, and otherwise scan every face for an aim point.

use praxis_types::{Aabb, BlockPos, BlockState, Direction, Rotation, TargetState};

use super::SimContext;
use crate::dependency::{Dependency, DependencyReason};
use crate::result::{BreakAction, SimResult};
use crate::scan::{Hit, ScanTarget, scan_shape};

pub(super) fn simulate_break(cx: &SimContext<'_>, pos: BlockPos, current: &BlockState) {
    if cx.config.avoid_supporting && cx.world.supporting_block() == Some(pos) {
        cx.emit(SimResult::PlayerOnTop { pos });
        return;
    }

    if current.liquid {
        cx.emit(SimResult::Submerge { pos });
        if let Some(filler) = &cx.config.fluid_filler {
            let fill = TargetState::Exact(BlockState::new(filler.as_str()));
            cx.with_dependency(Dependency::new(DependencyReason::FillFluid, pos), |nested| {
                nested.simulate(pos, current, &fill);
            });
        }
        return;
    }

    let Some(tool) = cx.world.break_tool(current) else {
        cx.emit(SimResult::WrongItem { pos, item: None });
        return;
    };

    let mut boxes = cx.world.outline(pos);
    if boxes.is_empty() {
        boxes.push(Aabb::FULL_CUBE.at(pos));
    }

    let eye = cx.view.eye;
    let hit = if let Some(inside) = boxes.iter().find(|aabb| aabb.contains(eye)) {
        let center = inside.center();
        Hit {
            pos,
            point: center,
            face: Direction::Up,
            rotation: Rotation::between(eye, center),
            distance_sq: eye.distance_sq(center),
        }
    } else {
        let target = ScanTarget::new(pos, &boxes, &Direction::ALL);
        let outcome = scan_shape(cx.world, cx.view, cx.config, &target);
        let Some(hit) = cx.resolve_scan(pos, &outcome) else {
            return;
        };
        hit
    };

    let instant = tool.is_instant();
    cx.emit(SimResult::Break(BreakAction {
        pos,
        hit,
        slot: tool.slot,
        item: tool.item,
        instant,
    }));
}
