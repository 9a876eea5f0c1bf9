//! Interact strategy: clicks that place a block or change one in place.
//!
//! Every profile face is tried twice: clicking the target itself on that
//! face, and (when placing) clicking the neighbour across it on the
//! opposite face. Each click is scanned, aimed, and its outcome predicted
//! through the world view.

use praxis_types::{Aabb, BlockPos, Direction, TargetState};

use super::SimContext;
use crate::dependency::{Dependency, DependencyReason};
use crate::process::PlacementProfile;
use crate::result::{InteractAction, SimResult};
use crate::scan::{ScanTarget, scan_shape};
use crate::world::{Placement, PlacementQuery};

pub(super) fn simulate_interact(cx: &SimContext<'_>, pos: BlockPos, profile: &PlacementProfile) {
    for face in profile.face_list() {
        test_click(cx, pos, pos, face, profile);
        if profile.placing {
            test_click(cx, pos, pos.offset(face), face.opposite(), profile);
        }
    }
}

fn test_click(
    cx: &SimContext<'_>,
    target: BlockPos,
    clicked: BlockPos,
    face: Direction,
    profile: &PlacementProfile,
) {
    if !cx.world.in_world(clicked) {
        return;
    }

    let mut boxes = cx.world.outline(clicked);
    if boxes.is_empty() {
        if !cx.config.air_place {
            return;
        }
        boxes.push(Aabb::FULL_CUBE.at(clicked));
    }

    let faces = [face];
    let scan = ScanTarget::new(clicked, &boxes, &faces).restricted(profile.surface, target);
    let outcome = scan_shape(cx.world, cx.view, cx.config, &scan);
    let Some(hit) = cx.resolve_scan(target, &outcome) else {
        return;
    };

    let Some(slot) = cx.world.hotbar_slot_of(&profile.item) else {
        cx.emit(SimResult::WrongItem {
            pos: target,
            item: Some(profile.item.clone()),
        });
        return;
    };

    if !profile.placing {
        cx.emit(SimResult::Interact(Box::new(InteractAction {
            pos: target,
            hit,
            slot,
            item: profile.item.clone(),
            placing: false,
            state: profile.expected.clone(),
        })));
        return;
    }

    let query = PlacementQuery {
        target,
        clicked,
        face,
        hit: hit.point,
        item: profile.item.clone(),
        rotation: hit.rotation,
    };
    match cx.world.predict_placement(&query) {
        Placement::NoContext => cx.emit(SimResult::ScaffoldExceeded { pos: target }),
        Placement::Placed { pos: actual, .. } if actual != target => {
            cx.emit(SimResult::UnexpectedPosition {
                pos: target,
                actual,
            });
        }
        Placement::Illegal => cx.emit(SimResult::IllegalUsage { pos: target }),
        Placement::CantReplace => cx.emit(SimResult::CantReplace { pos: target }),
        Placement::Blocked { by_self: true, .. } => {
            cx.emit(SimResult::BlockedBySelf { pos: target });
        }
        Placement::Blocked { supports, .. } => {
            for support in supports {
                let dependency = Dependency::new(DependencyReason::ClearSupport, target);
                cx.with_dependency(dependency, |nested| {
                    let current = nested.world.block_state(support);
                    nested.simulate(support, &current, &TargetState::Empty);
                });
            }
            cx.emit(SimResult::BlockedByEntity { pos: target });
        }
        Placement::Placed { state, .. } => {
            if state.matches_ignoring(&profile.expected, &profile.ignored) {
                cx.emit(SimResult::Interact(Box::new(InteractAction {
                    pos: target,
                    hit,
                    slot,
                    item: profile.item.clone(),
                    placing: true,
                    state,
                })));
            } else {
                cx.emit(SimResult::NoIntegrity {
                    pos: target,
                    expected: profile.expected.clone(),
                    actual: state,
                });
            }
        }
    }
}
