//! The demo world shared by the resources, the tasks, and the simulator.
//!
//! [`SharedWorld`] wraps a [`GridWorld`] plus the player's position and
//! look direction behind one lock. Resources write through it when they
//! apply a request; the simulator reads it through [`WorldView`] from its
//! blocking units.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use praxis_sim::grid::{GridWorld, ToolRule};
use praxis_sim::world::{BreakTool, Placement, PlacementQuery, RayHit, Viewpoint, WorldView};
use praxis_types::{Aabb, BlockPos, BlockState, Hardness, Item, Rotation, TargetState, Vec3};

/// Height of the eye above the feet.
pub const EYE_HEIGHT: f64 = 1.62;

/// Number of hotbar slots.
pub const HOTBAR_SLOTS: u8 = 9;

const HALF_WIDTH: f64 = 0.3;
const HEIGHT: f64 = 1.8;

/// Where the player stands and looks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    /// Centre of the feet.
    pub feet: Vec3,
    /// Look direction.
    pub rotation: Rotation,
}

impl Player {
    /// Eye position.
    pub fn eye(&self) -> Vec3 {
        self.feet + Vec3::new(0.0, EYE_HEIGHT, 0.0)
    }

    /// Collision box.
    pub fn hitbox(&self) -> Aabb {
        Aabb::new(
            self.feet - Vec3::new(HALF_WIDTH, 0.0, HALF_WIDTH),
            self.feet + Vec3::new(HALF_WIDTH, HEIGHT, HALF_WIDTH),
        )
    }

    /// The viewpoint a simulation pass runs from.
    pub fn viewpoint(&self) -> Viewpoint {
        Viewpoint::new(self.eye(), self.rotation)
    }
}

#[derive(Debug)]
struct WorldState {
    grid: GridWorld,
    player: Player,
}

/// Cloneable handle to the one demo world.
#[derive(Debug, Clone)]
pub struct SharedWorld {
    inner: Arc<RwLock<WorldState>>,
}

impl SharedWorld {
    /// Wrap `grid` with the player standing at `feet`.
    pub fn new(mut grid: GridWorld, feet: Vec3) -> Self {
        let player = Player {
            feet,
            rotation: Rotation::default(),
        };
        grid.set_player(Some(player.hitbox()));
        Self {
            inner: Arc::new(RwLock::new(WorldState { grid, player })),
        }
    }

    /// The player.
    pub fn player(&self) -> Player {
        self.inner.read().player
    }

    /// Turn the player.
    pub fn set_rotation(&self, rotation: Rotation) {
        self.inner.write().player.rotation = rotation;
    }

    /// Move the player's feet to `feet`.
    pub fn move_player(&self, feet: Vec3) {
        let mut state = self.inner.write();
        state.player.feet = feet;
        let hitbox = state.player.hitbox();
        state.grid.set_player(Some(hitbox));
    }

    /// Put `state` at `pos`.
    pub fn set_block(&self, pos: BlockPos, state: BlockState) {
        self.inner.write().grid.set_block(pos, state);
    }

    /// Select a hotbar slot.
    pub fn select_slot(&self, slot: u8) {
        self.inner.write().grid.select_slot(slot);
    }

    /// The selected hotbar slot.
    pub fn selected_slot(&self) -> u8 {
        self.inner.read().grid.selected_slot()
    }

    /// The item in hotbar `slot`.
    pub fn hotbar_item(&self, slot: u8) -> Option<Item> {
        self.inner.read().grid.hotbar_item(slot).cloned()
    }

    /// Replace the item in hotbar `slot`, returning the previous one.
    pub fn swap_hotbar(&self, slot: u8, item: Option<Item>) -> Option<Item> {
        let mut state = self.inner.write();
        let previous = state.grid.hotbar_item(slot).cloned();
        state.grid.set_hotbar(slot, item);
        previous
    }

    /// The first hotbar slot holding nothing.
    pub fn empty_hotbar_slot(&self) -> Option<u8> {
        let state = self.inner.read();
        (0..HOTBAR_SLOTS).find(|slot| state.grid.hotbar_item(*slot).is_none())
    }
}

impl WorldView for SharedWorld {
    fn block_state(&self, pos: BlockPos) -> BlockState {
        self.inner.read().grid.block_state(pos)
    }

    fn is_loaded(&self, pos: BlockPos) -> bool {
        self.inner.read().grid.is_loaded(pos)
    }

    fn in_world(&self, pos: BlockPos) -> bool {
        self.inner.read().grid.in_world(pos)
    }

    fn outline(&self, pos: BlockPos) -> Vec<Aabb> {
        self.inner.read().grid.outline(pos)
    }

    fn ray_cast(&self, eye: Vec3, rotation: Rotation, reach: f64) -> Option<RayHit> {
        self.inner.read().grid.ray_cast(eye, rotation, reach)
    }

    fn hotbar_slot_of(&self, item: &Item) -> Option<u8> {
        self.inner.read().grid.hotbar_slot_of(item)
    }

    fn break_tool(&self, state: &BlockState) -> Option<BreakTool> {
        self.inner.read().grid.break_tool(state)
    }

    fn predict_placement(&self, query: &PlacementQuery) -> Placement {
        self.inner.read().grid.predict_placement(query)
    }

    fn supporting_block(&self) -> Option<BlockPos> {
        self.inner.read().grid.supporting_block()
    }
}

// ---------------------------------------------------------------------------
// Demo site
// ---------------------------------------------------------------------------

/// Half the side length of the stone floor.
const FLOOR_RADIUS: i32 = 6;

/// Cells where loose dirt may be scattered. None of them lies on the walk
/// towards the far pillar.
const DIRT_CANDIDATES: [(i32, i32); 6] = [(-2, -1), (-1, -2), (2, -1), (1, -2), (-2, 0), (2, 0)];

/// Loose dirt blocks scattered per site.
const DIRT_COUNT: usize = 3;

/// A generated build site.
#[derive(Debug, Clone)]
pub struct DemoSite {
    /// The world, with the player standing at the origin.
    pub world: SharedWorld,
    /// Every position the build has to change, with its target.
    pub targets: BTreeMap<BlockPos, TargetState>,
    /// Items stored outside the hotbar.
    pub storage: Vec<Item>,
}

/// Generate the demo site from `seed`.
///
/// A stone floor with one flooded cell and a few loose dirt blocks. The
/// build clears the dirt and the water, raises a three-block wall capped
/// with a slab, and puts up a pillar beyond reach of the start.
pub fn demo_site(seed: u64) -> DemoSite {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid = GridWorld::new(-16, 64, 64);
    let stone = BlockState::new("stone");

    for x in -FLOOR_RADIUS..=FLOOR_RADIUS {
        for z in -FLOOR_RADIUS..=FLOOR_RADIUS {
            grid.set_block(BlockPos::new(x, 0, z), stone.clone());
        }
    }

    let mut targets = BTreeMap::new();

    let flooded = BlockPos::new(-2, 0, 2);
    grid.set_block(flooded, BlockState::fluid("water"));
    targets.insert(flooded, TargetState::Empty);

    for (x, z) in DIRT_CANDIDATES.choose_multiple(&mut rng, DIRT_COUNT) {
        let pos = BlockPos::new(*x, 1, *z);
        let dirt = BlockState::new("dirt").with_hardness(Hardness::Ticks(rng.random_range(2..=5)));
        grid.set_block(pos, dirt);
        targets.insert(pos, TargetState::Empty);
    }

    for x in -1..=1 {
        targets.insert(BlockPos::new(x, 1, 3), TargetState::Exact(stone.clone()));
    }
    targets.insert(
        BlockPos::new(0, 2, 3),
        TargetState::Exact(BlockState::new("oak_slab").with("type", "bottom")),
    );
    targets.insert(BlockPos::new(5, 1, 5), TargetState::Exact(stone));

    grid.set_hotbar(0, Some(Item::new("pickaxe")));
    grid.set_hotbar(1, Some(Item::new("stone")));
    grid.set_tool_rule(
        "cobblestone",
        ToolRule {
            tool: Item::new("pickaxe"),
            break_ticks: 6,
        },
    );

    DemoSite {
        world: SharedWorld::new(grid, Vec3::new(0.5, 1.0, 0.5)),
        targets,
        storage: vec![Item::new("cobblestone"), Item::new("oak_slab")],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn player_geometry() {
        let world = SharedWorld::new(GridWorld::default(), Vec3::new(0.5, 1.0, 0.5));
        let player = world.player();
        assert!((player.eye().y - 2.62).abs() < 1e-9);
        assert!(player.hitbox().contains(Vec3::new(0.5, 2.0, 0.5)));
        world.move_player(Vec3::new(3.5, 1.0, 0.5));
        assert!((world.player().feet.x - 3.5).abs() < 1e-9);
    }

    #[test]
    fn hotbar_swaps_return_the_previous_item() {
        let world = SharedWorld::new(GridWorld::default(), Vec3::ZERO);
        assert_eq!(world.empty_hotbar_slot(), Some(0));
        assert_eq!(world.swap_hotbar(0, Some(Item::new("stone"))), None);
        assert_eq!(world.empty_hotbar_slot(), Some(1));
        assert_eq!(world.swap_hotbar(0, None), Some(Item::new("stone")));
    }

    #[test]
    fn demo_site_is_reproducible() {
        let a = demo_site(11);
        let b = demo_site(11);
        assert_eq!(a.targets, b.targets);
        let dirt = a
            .targets
            .keys()
            .filter(|pos| a.world.block_state(**pos).name == "dirt")
            .count();
        assert_eq!(dirt, DIRT_COUNT);
        assert_eq!(a.world.supporting_block(), Some(BlockPos::new(0, 0, 0)));
    }
}
