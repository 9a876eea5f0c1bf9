//! The read-only view of the world the simulation runs against.
//!
//! The simulation never mutates anything. Everything it knows about blocks,
//! shapes, ray casts and the player's hotbar comes through [`WorldView`],
//! which must be safe to share between the concurrent units of a pass.

use praxis_types::{Aabb, BlockPos, BlockState, Direction, Item, Rotation, Vec3};

/// Where the simulated player looks from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    /// Eye position.
    pub eye: Vec3,
    /// Current look direction.
    pub rotation: Rotation,
}

impl Viewpoint {
    /// Create a viewpoint.
    pub const fn new(eye: Vec3, rotation: Rotation) -> Self {
        Self { eye, rotation }
    }
}

/// The block face a ray cast stopped on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Block that was hit.
    pub pos: BlockPos,
    /// Face of the block the ray entered through.
    pub face: Direction,
    /// Exact point of impact.
    pub point: Vec3,
}

/// The best hotbar tool for breaking a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakTool {
    /// Hotbar slot holding the tool.
    pub slot: u8,
    /// The tool itself.
    pub item: Item,
    /// Ticks needed to break the block with this tool.
    pub break_ticks: u32,
}

impl BreakTool {
    /// Whether the block breaks in the tick it is hit.
    pub const fn is_instant(&self) -> bool {
        self.break_ticks <= 1
    }
}

/// A placement the simulation wants predicted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementQuery {
    /// Position the placement is meant to fill.
    pub target: BlockPos,
    /// Block that gets clicked.
    pub clicked: BlockPos,
    /// Face of the clicked block.
    pub face: Direction,
    /// Point on the face that gets clicked.
    pub hit: Vec3,
    /// Item used for the placement.
    pub item: Item,
    /// Rotation the player holds while placing.
    pub rotation: Rotation,
}

/// What the world would do with a [`PlacementQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The item would place `state` at `pos`.
    Placed {
        /// Where the block would end up.
        pos: BlockPos,
        /// The state it would have.
        state: BlockState,
    },
    /// The item cannot build outward from the clicked face any further.
    NoContext,
    /// The existing block at the target cannot be replaced.
    CantReplace,
    /// The player is not allowed to use the item there.
    Illegal,
    /// Something stands where the block would go.
    Blocked {
        /// Whether the player itself is in the way.
        by_self: bool,
        /// Blocks other entities stand on.
        supports: Vec<BlockPos>,
    },
}

/// Read-only access to blocks, shapes, and the player's hotbar.
pub trait WorldView: Send + Sync {
    /// The block state at `pos`.
    fn block_state(&self, pos: BlockPos) -> BlockState;

    /// Whether the chunk holding `pos` is loaded.
    fn is_loaded(&self, pos: BlockPos) -> bool;

    /// Whether `pos` lies inside the world's build limits and border.
    fn in_world(&self, pos: BlockPos) -> bool;

    /// Outline boxes of the block at `pos` in world coordinates.
    fn outline(&self, pos: BlockPos) -> Vec<Aabb>;

    /// Cast a ray from `eye` along `rotation`, up to `reach` blocks.
    fn ray_cast(&self, eye: Vec3, rotation: Rotation, reach: f64) -> Option<RayHit>;

    /// Hotbar slot holding `item`, if any.
    fn hotbar_slot_of(&self, item: &Item) -> Option<u8>;

    /// Best hotbar tool for breaking `state`, if one can break it at all.
    fn break_tool(&self, state: &BlockState) -> Option<BreakTool>;

    /// Predict the outcome of a placement.
    fn predict_placement(&self, query: &PlacementQuery) -> Placement;

    /// Block the player is standing on, if any.
    fn supporting_block(&self) -> Option<BlockPos>;
}
