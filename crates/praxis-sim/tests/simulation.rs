#![allow(clippy::unwrap_used, clippy::panic)]
//! End-to-end simulations against a small grid world.
//!
//! The player stands on the stone floor at the origin with the eye at
//! `(0.5, 2.62, 0.5)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use praxis_core::config::BuildConfig;
use praxis_sim::dependency::DependencyReason;
use praxis_sim::grid::GridWorld;
use praxis_sim::result::Goal;
use praxis_sim::{Rank, SimError, SimResult, Simulator, Viewpoint};
use praxis_types::{Aabb, BlockPos, BlockState, Direction, Item, Rotation, TargetState, Vec3};

fn eye() -> Viewpoint {
    Viewpoint::new(Vec3::new(0.5, 2.62, 0.5), Rotation::default())
}

fn stone() -> BlockState {
    BlockState::new("stone")
}

fn floor() -> GridWorld {
    let mut world = GridWorld::default();
    for x in -3..=3 {
        for z in -3..=3 {
            world.set_block(BlockPos::new(x, 0, z), stone());
        }
    }
    world.set_hotbar(0, Some(Item::new("pickaxe")));
    world.set_hotbar(1, Some(Item::new("stone")));
    world.set_hotbar(2, Some(Item::new("cobblestone")));
    world.set_hotbar(3, Some(Item::new("oak_slab")));
    world
}

fn simulator(world: GridWorld) -> Simulator {
    Simulator::new(Arc::new(world), BuildConfig::default())
}

fn run(simulator: &Simulator, pos: BlockPos, target: TargetState) -> Vec<SimResult> {
    let current = simulator.world().block_state(pos);
    simulator.simulate(pos, &current, &target, &eye())
}

// ---------------------------------------------------------------------------
// Breaking
// ---------------------------------------------------------------------------

#[test]
fn break_in_reach_uses_the_selected_tool() {
    let sim = simulator(floor());
    let pos = BlockPos::new(1, 0, 0);
    let results = run(&sim, pos, TargetState::Empty);

    let Some(SimResult::Break(action)) = sim.best_actionable(&results) else {
        panic!("expected a break, got {results:?}");
    };
    assert_eq!(action.pos, pos);
    assert_eq!(action.slot, 0);
    assert_eq!(action.item, Item::new("pickaxe"));
    assert!(!action.instant);
    assert!(matches!(action.hit.face, Direction::Up | Direction::West));
}

#[test]
fn distant_block_is_out_of_reach_with_a_goal() {
    let mut world = floor();
    let pos = BlockPos::new(10, 0, 0);
    world.set_block(pos, stone());
    let sim = simulator(world);
    let results = run(&sim, pos, TargetState::Empty);

    assert!(sim.best_actionable(&results).is_some_and(|r| r.rank() == Rank::OutOfReach));
    let out_of_reach = results
        .iter()
        .find(|r| matches!(r, SimResult::OutOfReach { .. }))
        .unwrap();
    assert!(out_of_reach.distance() > 4.5 * 4.5);
    assert_eq!(out_of_reach.goal(), Some(Goal::Near { pos, radius: 3 }));
}

#[test]
fn block_under_the_player_is_refused() {
    let mut world = floor();
    world.set_player(Some(Aabb::new(
        Vec3::new(0.2, 1.0, 0.2),
        Vec3::new(0.8, 2.8, 0.8),
    )));
    let sim = simulator(world);
    let pos = BlockPos::new(0, 0, 0);
    let results = run(&sim, pos, TargetState::Empty);

    assert_eq!(results, vec![SimResult::PlayerOnTop { pos }]);
    assert_eq!(results.first().unwrap().goal(), Some(Goal::Away { pos }));
    assert!(sim.best_actionable(&results).is_none());
}

#[test]
fn fluid_is_filled_before_it_is_broken() {
    let mut world = floor();
    let pos = BlockPos::new(1, 0, 0);
    world.set_block(pos, BlockState::fluid("water"));
    let sim = simulator(world);
    let results = run(&sim, pos, TargetState::Empty);

    assert!(results.contains(&SimResult::Submerge { pos }));
    let best = sim.best_actionable(&results).unwrap();
    let SimResult::Dependency { reason, origin, .. } = best else {
        panic!("expected a dependency, got {best:?}");
    };
    assert_eq!(*reason, DependencyReason::FillFluid);
    assert_eq!(*origin, pos);
    let SimResult::Interact(fill) = best.innermost() else {
        panic!("expected a fill placement, got {best:?}");
    };
    assert!(fill.placing);
    assert_eq!(fill.state, BlockState::new("cobblestone"));
    assert_eq!(fill.slot, 2);
}

#[test]
fn no_dependencies_without_depth() {
    let mut world = floor();
    let pos = BlockPos::new(1, 0, 0);
    world.set_block(pos, BlockState::fluid("water"));
    let config = BuildConfig {
        max_dependencies: 0,
        ..BuildConfig::default()
    };
    let sim = Simulator::new(Arc::new(world), config);
    let results = run(&sim, pos, TargetState::Empty);
    assert_eq!(results, vec![SimResult::Submerge { pos }]);
}

// ---------------------------------------------------------------------------
// Placing
// ---------------------------------------------------------------------------

#[test]
fn placement_on_the_floor() {
    let sim = simulator(floor());
    let pos = BlockPos::new(0, 1, 1);
    let results = run(&sim, pos, TargetState::Exact(stone()));

    let Some(SimResult::Interact(action)) = sim.best_actionable(&results) else {
        panic!("expected a placement, got {results:?}");
    };
    assert!(action.placing);
    assert_eq!(action.pos, pos);
    assert_eq!(action.slot, 1);
    assert_eq!(action.state, stone());
    assert_eq!(action.hit.pos, BlockPos::new(0, 0, 1));
    assert_eq!(action.hit.face, Direction::Up);
}

#[test]
fn missing_item_is_wrong_item() {
    let sim = simulator(floor());
    let pos = BlockPos::new(0, 1, 1);
    let planks = BlockState::new("oak_planks");
    let results = run(&sim, pos, TargetState::Exact(planks));

    assert_eq!(
        sim.best_actionable(&results),
        Some(&SimResult::WrongItem {
            pos,
            item: Some(Item::new("oak_planks")),
        })
    );
}

#[test]
fn entity_in_the_way_asks_to_clear_its_support() {
    let mut world = floor();
    world.add_entity(Aabb::new(
        Vec3::new(0.2, 1.0, 1.2),
        Vec3::new(0.8, 2.8, 1.8),
    ));
    let sim = simulator(world);
    let pos = BlockPos::new(0, 1, 1);
    let results = run(&sim, pos, TargetState::Exact(stone()));

    assert!(results.contains(&SimResult::BlockedByEntity { pos }));
    let clear = results
        .iter()
        .find(|r| matches!(r, SimResult::Dependency { reason: DependencyReason::ClearSupport, .. }))
        .unwrap();
    assert_eq!(clear.pos(), pos);
    let SimResult::Break(action) = clear.innermost() else {
        panic!("expected the support to be broken, got {clear:?}");
    };
    assert_eq!(action.pos, BlockPos::new(0, 0, 1));
}

#[test]
fn top_slab_needs_a_side_click() {
    let mut world = floor();
    let pos = BlockPos::new(0, 1, 1);
    let top = BlockState::new("oak_slab").with("type", "top");

    let floor_only = simulator(world.clone());
    let results = run(&floor_only, pos, TargetState::Exact(top.clone()));
    assert!(floor_only.best_actionable(&results).is_none());
    assert!(results.contains(&SimResult::NotVisible { pos }));

    world.set_block(BlockPos::new(1, 1, 1), stone());
    let with_wall = simulator(world);
    let results = run(&with_wall, pos, TargetState::Exact(top.clone()));
    let Some(SimResult::Interact(action)) = with_wall.best_actionable(&results) else {
        panic!("expected a placement, got {results:?}");
    };
    assert_eq!(action.state, top);
    assert_eq!(action.hit.face, Direction::West);
    assert!(action.hit.point.y > 1.5);
}

#[test]
fn completing_a_double_slab_clicks_the_open_face() {
    let mut world = floor();
    let pos = BlockPos::new(0, 1, 1);
    world.set_block(pos, BlockState::new("oak_slab").with("type", "bottom"));
    let sim = simulator(world);
    let double = BlockState::new("oak_slab").with("type", "double");
    let results = run(&sim, pos, TargetState::Exact(double.clone()));

    let Some(SimResult::Interact(action)) = sim.best_actionable(&results) else {
        panic!("expected a click, got {results:?}");
    };
    assert!(!action.placing);
    assert_eq!(action.state, double);
    assert_eq!(action.hit.pos, pos);
    assert_eq!(action.hit.face, Direction::Up);
    assert_eq!(action.slot, 3);
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

fn mixed_targets() -> BTreeMap<BlockPos, TargetState> {
    let mut targets = BTreeMap::new();
    targets.insert(BlockPos::new(1, 0, 0), TargetState::Empty);
    targets.insert(BlockPos::new(-1, 0, -1), TargetState::Empty);
    targets.insert(BlockPos::new(0, 1, 1), TargetState::Exact(stone()));
    targets.insert(BlockPos::new(1, 1, -1), TargetState::Exact(stone()));
    targets.insert(BlockPos::new(3, 0, 3), TargetState::Exact(stone()));
    targets
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pass_picks_the_same_best_every_time() {
    let sim = simulator(floor());
    let first = sim.pass(mixed_targets(), eye()).await.unwrap();
    let best = sim.best_actionable(&first).cloned().unwrap();

    for _ in 0..10 {
        let again = sim.pass(mixed_targets(), eye()).await.unwrap();
        assert_eq!(again.len(), first.len());
        assert_eq!(sim.best_actionable(&again), Some(&best));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pass_with_single_unit_concurrency() {
    let config = BuildConfig {
        max_concurrency: 1,
        ..BuildConfig::default()
    };
    let sim = Simulator::new(Arc::new(floor()), config);
    let results = sim.pass(mixed_targets(), eye()).await.unwrap();
    assert!(results.contains(&SimResult::Done {
        pos: BlockPos::new(3, 0, 3)
    }));
}

#[tokio::test]
async fn pass_blocking_on_a_current_thread_runtime_is_an_error() {
    let sim = simulator(floor());
    let handle = tokio::runtime::Handle::current();
    let result = sim.pass_blocking(&handle, mixed_targets(), eye());
    assert!(matches!(result, Err(SimError::Runtime { .. })));
}
