//! An in-memory block grid implementing [`WorldView`].
//!
//! [`GridWorld`] stores blocks sparsely (anything not stored is air), a
//! nine-slot hotbar, tool rules, and the hitboxes of the player and other
//! entities. It is small enough to reason about in tests and complete
//! enough to drive the engine's demo build.

use std::collections::{BTreeMap, BTreeSet};

use praxis_types::{Aabb, Axis, BlockPos, BlockState, Direction, Hardness, Item, Rotation, Vec3};

use crate::world::{BreakTool, Placement, PlacementQuery, RayHit, WorldView};

/// Number of hotbar slots.
pub const HOTBAR_SLOTS: usize = 9;

/// Upper bound on cells visited by one ray cast.
const MAX_RAY_CELLS: usize = 256;

const EPSILON: f64 = 1e-9;

/// A tool that breaks one block faster, and is required to break it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRule {
    /// The tool.
    pub tool: Item,
    /// Ticks to break the block with the tool.
    pub break_ticks: u32,
}

/// Sparse in-memory world.
#[derive(Debug, Clone)]
pub struct GridWorld {
    blocks: BTreeMap<BlockPos, BlockState>,
    min_y: i32,
    max_y: i32,
    border: i32,
    unloaded: BTreeSet<(i32, i32)>,
    hotbar: Vec<Option<Item>>,
    selected: u8,
    tools: BTreeMap<String, ToolRule>,
    player: Option<Aabb>,
    entities: Vec<Aabb>,
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new(-64, 320, 30_000_000)
    }
}

impl GridWorld {
    /// An empty world spanning `min_y..max_y` vertically and `border`
    /// blocks from the origin horizontally.
    pub fn new(min_y: i32, max_y: i32, border: i32) -> Self {
        Self {
            blocks: BTreeMap::new(),
            min_y,
            max_y,
            border,
            unloaded: BTreeSet::new(),
            hotbar: vec![None; HOTBAR_SLOTS],
            selected: 0,
            tools: BTreeMap::new(),
            player: None,
            entities: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Blocks
    // -------------------------------------------------------------------

    /// Put `state` at `pos`. Air removes the stored block.
    pub fn set_block(&mut self, pos: BlockPos, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    /// Remove the block at `pos`, returning what was there.
    pub fn clear_block(&mut self, pos: BlockPos) -> Option<BlockState> {
        self.blocks.remove(&pos)
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Mark the 16x16 column holding `pos` as not loaded.
    pub fn unload_chunk_at(&mut self, pos: BlockPos) {
        self.unloaded.insert(chunk_of(pos));
    }

    // -------------------------------------------------------------------
    // Hotbar and tools
    // -------------------------------------------------------------------

    /// Put `item` into hotbar `slot`. Out-of-range slots are ignored.
    pub fn set_hotbar(&mut self, slot: u8, item: Option<Item>) {
        if let Some(entry) = self.hotbar.get_mut(usize::from(slot)) {
            *entry = item;
        }
    }

    /// The item in hotbar `slot`.
    pub fn hotbar_item(&self, slot: u8) -> Option<&Item> {
        self.hotbar.get(usize::from(slot)).and_then(Option::as_ref)
    }

    /// Select hotbar `slot`. Out-of-range slots are ignored.
    pub fn select_slot(&mut self, slot: u8) {
        if usize::from(slot) < HOTBAR_SLOTS {
            self.selected = slot;
        }
    }

    /// The selected hotbar slot.
    pub const fn selected_slot(&self) -> u8 {
        self.selected
    }

    /// Require `rule.tool` for breaking blocks called `block`.
    pub fn set_tool_rule(&mut self, block: impl Into<String>, rule: ToolRule) {
        self.tools.insert(block.into(), rule);
    }

    // -------------------------------------------------------------------
    // Entities
    // -------------------------------------------------------------------

    /// Set the player's hitbox.
    pub const fn set_player(&mut self, hitbox: Option<Aabb>) {
        self.player = hitbox;
    }

    /// Add another entity's hitbox.
    pub fn add_entity(&mut self, hitbox: Aabb) {
        self.entities.push(hitbox);
    }

    /// Remove every entity standing in `cell`.
    pub fn clear_entities_in(&mut self, cell: BlockPos) {
        let bounds = Aabb::FULL_CUBE.at(cell);
        self.entities.retain(|hitbox| !hitbox.intersects(bounds));
    }

    fn placement_state(item: &Item, pos: BlockPos, query: &PlacementQuery) -> BlockState {
        let state = BlockState::new(item.as_str());
        if item.as_str().ends_with("_slab") {
            let upper = match query.face {
                Direction::Down => true,
                Direction::Up => false,
                _ => query.hit.y - f64::from(pos.y) > 0.5,
            };
            return state.with("type", if upper { "top" } else { "bottom" });
        }
        if item.as_str().ends_with("_log") {
            let axis = match query.face.axis() {
                Axis::X => "x",
                Axis::Y => "y",
                Axis::Z => "z",
            };
            return state.with("axis", axis);
        }
        state
    }

    fn merged_slab(&self, query: &PlacementQuery) -> Option<BlockState> {
        let clicked = self.block_state(query.clicked);
        if clicked.name != query.item.as_str() || !clicked.name.ends_with("_slab") {
            return None;
        }
        let completes = match clicked.property("type") {
            Some("bottom") => query.face == Direction::Up,
            Some("top") => query.face == Direction::Down,
            _ => false,
        };
        completes.then(|| clicked.with("type", "double"))
    }
}

const fn chunk_of(pos: BlockPos) -> (i32, i32) {
    (pos.x.div_euclid(16), pos.z.div_euclid(16))
}

/// Outline of `state` in block-local coordinates.
fn local_shape(state: &BlockState) -> Option<Aabb> {
    if state.is_air() || state.liquid {
        return None;
    }
    if state.name.ends_with("_slab") {
        match state.property("type") {
            Some("bottom") => return Some(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.5, 1.0))),
            Some("top") => return Some(Aabb::new(Vec3::new(0.0, 0.5, 0.0), Vec3::new(1.0, 1.0, 1.0))),
            _ => {}
        }
    }
    Some(Aabb::FULL_CUBE)
}

/// Entry distance and face of a ray hitting `aabb`.
fn ray_box(origin: Vec3, dir: Vec3, aabb: Aabb) -> Option<(f64, Direction)> {
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut face = None;
    for axis in [Axis::X, Axis::Y, Axis::Z] {
        let o = origin.component(axis);
        let d = dir.component(axis);
        let lo = aabb.min.component(axis);
        let hi = aabb.max.component(axis);
        if d.abs() < EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let t1 = (lo - o) / d;
        let t2 = (hi - o) / d;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if near > t_enter {
            t_enter = near;
            face = Some(if d > 0.0 {
                axis.negative()
            } else {
                axis.positive()
            });
        }
        t_exit = t_exit.min(far);
    }
    if t_enter > t_exit || t_enter < 0.0 {
        return None;
    }
    face.map(|face| (t_enter, face))
}

/// Voxel traversal state along one axis: step sign, distance to the next
/// cell boundary, and distance between boundaries.
fn axis_walk(origin: f64, dir: f64, cell: i32) -> (i32, f64, f64) {
    if dir > EPSILON {
        (1, (f64::from(cell) + 1.0 - origin) / dir, 1.0 / dir)
    } else if dir < -EPSILON {
        (-1, (f64::from(cell) - origin) / dir, -1.0 / dir)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

impl WorldView for GridWorld {
    fn block_state(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).cloned().unwrap_or_else(BlockState::air)
    }

    fn is_loaded(&self, pos: BlockPos) -> bool {
        !self.unloaded.contains(&chunk_of(pos))
    }

    fn in_world(&self, pos: BlockPos) -> bool {
        pos.y >= self.min_y
            && pos.y < self.max_y
            && pos.x.unsigned_abs() <= self.border.unsigned_abs()
            && pos.z.unsigned_abs() <= self.border.unsigned_abs()
    }

    fn outline(&self, pos: BlockPos) -> Vec<Aabb> {
        self.blocks
            .get(&pos)
            .and_then(local_shape)
            .map(|shape| shape.at(pos))
            .into_iter()
            .collect()
    }

    fn ray_cast(&self, eye: Vec3, rotation: Rotation, reach: f64) -> Option<RayHit> {
        let dir = rotation.direction();
        let mut cell = eye.block_pos();
        let (step_x, mut next_x, delta_x) = axis_walk(eye.x, dir.x, cell.x);
        let (step_y, mut next_y, delta_y) = axis_walk(eye.y, dir.y, cell.y);
        let (step_z, mut next_z, delta_z) = axis_walk(eye.z, dir.z, cell.z);

        for _ in 0..MAX_RAY_CELLS {
            let nearest = self
                .outline(cell)
                .into_iter()
                .filter_map(|aabb| ray_box(eye, dir, aabb))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((t, face)) = nearest
                && t <= reach
            {
                return Some(RayHit {
                    pos: cell,
                    face,
                    point: eye + dir * t,
                });
            }

            if next_x <= next_y && next_x <= next_z {
                if next_x > reach {
                    break;
                }
                cell.x = cell.x.saturating_add(step_x);
                next_x += delta_x;
            } else if next_y <= next_z {
                if next_y > reach {
                    break;
                }
                cell.y = cell.y.saturating_add(step_y);
                next_y += delta_y;
            } else {
                if next_z > reach {
                    break;
                }
                cell.z = cell.z.saturating_add(step_z);
                next_z += delta_z;
            }
        }
        None
    }

    fn hotbar_slot_of(&self, item: &Item) -> Option<u8> {
        let index = self
            .hotbar
            .iter()
            .position(|slot| slot.as_ref() == Some(item))?;
        u8::try_from(index).ok()
    }

    fn break_tool(&self, state: &BlockState) -> Option<BreakTool> {
        if state.hardness == Hardness::Unbreakable {
            return None;
        }
        if let Some(rule) = self.tools.get(&state.name) {
            let slot = self.hotbar_slot_of(&rule.tool)?;
            return Some(BreakTool {
                slot,
                item: rule.tool.clone(),
                break_ticks: rule.break_ticks,
            });
        }
        let item = self
            .hotbar_item(self.selected)
            .cloned()
            .unwrap_or_else(|| Item::new("hand"));
        let break_ticks = match state.hardness {
            Hardness::Ticks(ticks) => ticks,
            Hardness::Instant | Hardness::Unbreakable => 0,
        };
        Some(BreakTool {
            slot: self.selected,
            item,
            break_ticks,
        })
    }

    fn predict_placement(&self, query: &PlacementQuery) -> Placement {
        if let Some(state) = self.merged_slab(query) {
            return Placement::Placed {
                pos: query.clicked,
                state,
            };
        }

        let clicked = self.block_state(query.clicked);
        let pos = if clicked.replaceable {
            query.clicked
        } else {
            query.clicked.offset(query.face)
        };
        if !self.in_world(pos) {
            return Placement::Illegal;
        }
        if !self.block_state(pos).replaceable {
            return Placement::CantReplace;
        }

        let cell = Aabb::FULL_CUBE.at(pos);
        if self.player.is_some_and(|hitbox| hitbox.intersects(cell)) {
            return Placement::Blocked {
                by_self: true,
                supports: Vec::new(),
            };
        }
        let supports: Vec<BlockPos> = self
            .entities
            .iter()
            .filter(|hitbox| hitbox.intersects(cell))
            .map(|hitbox| Vec3::new(hitbox.center().x, hitbox.min.y - 0.01, hitbox.center().z).block_pos())
            .filter(|support| self.blocks.contains_key(support))
            .collect();
        if self.entities.iter().any(|hitbox| hitbox.intersects(cell)) {
            return Placement::Blocked {
                by_self: false,
                supports,
            };
        }

        Placement::Placed {
            pos,
            state: Self::placement_state(&query.item, pos, query),
        }
    }

    fn supporting_block(&self) -> Option<BlockPos> {
        let hitbox = self.player?;
        let center = hitbox.center();
        let below = Vec3::new(center.x, hitbox.min.y - 0.01, center.z).block_pos();
        self.blocks.contains_key(&below).then_some(below)
    }
}
