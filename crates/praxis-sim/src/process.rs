//! Placement pre-processing.
//!
//! Before a placement is simulated, the [`ProcessorRegistry`] turns the
//! `(current, target)` state pair into a [`PlacementProfile`]: which item
//! places the target, which faces may be clicked, which half of a block may
//! be aimed at, and which properties only settle after placement and can be
//! ignored when comparing states. Block states are immutable, so profiles
//! are cached per state pair.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use tracing::trace;

use praxis_types::{Axis, BlockState, Direction, Item};

use crate::scan::{ScanHalf, SurfaceScan};

/// Properties that placement cannot set directly and that are therefore
/// never compared.
pub const POST_PLACEMENT_PROPERTIES: &[&str] = &[
    "waterlogged",
    "powered",
    "open",
    "lit",
    "snowy",
    "extended",
    "occupied",
    "triggered",
    "persistent",
    "distance",
    "age",
    "level",
    "stage",
    "north",
    "east",
    "south",
    "west",
    "up",
    "down",
    "shape",
    "attached",
    "enabled",
    "in_wall",
];

/// How one target state gets placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementProfile {
    /// The state the placement should produce.
    pub expected: BlockState,
    /// Item that places the state.
    pub item: Item,
    /// Faces of the target position that may be used.
    pub faces: BTreeSet<Direction>,
    /// Properties disregarded when comparing the result.
    pub ignored: BTreeSet<String>,
    /// Optional restriction of the aim points to one half of the block.
    pub surface: Option<SurfaceScan>,
    /// Whether the click places a new block rather than changing the
    /// existing one.
    pub placing: bool,
}

impl PlacementProfile {
    /// The unrestricted profile for placing `target`.
    pub fn new(target: &BlockState) -> Self {
        Self {
            expected: target.clone(),
            item: Item::placing(target),
            faces: Direction::ALL.into_iter().collect(),
            ignored: POST_PLACEMENT_PROPERTIES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            surface: None,
            placing: true,
        }
    }

    /// Keep only the faces accepted by `keep`.
    pub fn retain_faces(&mut self, keep: impl Fn(Direction) -> bool) {
        self.faces.retain(|face| keep(*face));
    }

    /// Restrict the scan, unless an earlier processor already did.
    pub fn offer_surface(&mut self, surface: SurfaceScan) {
        if self.surface.is_none() {
            self.surface = Some(surface);
        }
    }

    /// Add a property to the ignored set.
    pub fn ignore(&mut self, property: &str) {
        self.ignored.insert(property.to_owned());
    }

    /// Faces in a stable order.
    pub fn face_list(&self) -> Vec<Direction> {
        self.faces.iter().copied().collect()
    }
}

/// One property-driven adjustment of a placement profile.
pub trait PropertyProcessor: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Whether the processor applies to `target`.
    fn accepts(&self, target: &BlockState) -> bool;

    /// Adjust `profile` for placing `target` over `current`.
    fn process(&self, current: &BlockState, target: &BlockState, profile: &mut PlacementProfile);
}

/// `half=top|bottom`: aim at the matching half of the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHalfProcessor;

impl PropertyProcessor for BlockHalfProcessor {
    fn name(&self) -> &'static str {
        "block_half"
    }

    fn accepts(&self, target: &BlockState) -> bool {
        target.property("half").is_some()
    }

    fn process(&self, _current: &BlockState, target: &BlockState, profile: &mut PlacementProfile) {
        match target.property("half") {
            Some("top") => profile.offer_surface(SurfaceScan::vertical(ScanHalf::Greater)),
            Some("bottom") => profile.offer_surface(SurfaceScan::vertical(ScanHalf::Lesser)),
            _ => {}
        }
    }
}

/// `type=top|bottom|double` on slabs.
///
/// A double slab over an existing slab of the same block is completed by
/// clicking the open face of the existing slab.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlabProcessor;

impl PropertyProcessor for SlabProcessor {
    fn name(&self) -> &'static str {
        "slab"
    }

    fn accepts(&self, target: &BlockState) -> bool {
        target.name.ends_with("_slab") && target.property("type").is_some()
    }

    fn process(&self, current: &BlockState, target: &BlockState, profile: &mut PlacementProfile) {
        match target.property("type") {
            Some("bottom") => profile.offer_surface(SurfaceScan::vertical(ScanHalf::Lesser)),
            Some("top") => profile.offer_surface(SurfaceScan::vertical(ScanHalf::Greater)),
            Some("double") if current.same_block(target) => {
                let open = if current.property("type") == Some("bottom") {
                    Direction::Up
                } else {
                    Direction::Down
                };
                profile.retain_faces(|face| face == open);
                profile.placing = false;
            }
            Some("double") => profile.ignore("type"),
            _ => {}
        }
    }
}

/// `face=floor|ceiling|wall` with `facing`: attach to the matching side.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentProcessor;

impl PropertyProcessor for AttachmentProcessor {
    fn name(&self) -> &'static str {
        "attachment"
    }

    fn accepts(&self, target: &BlockState) -> bool {
        target.property("face").is_some()
    }

    fn process(&self, _current: &BlockState, target: &BlockState, profile: &mut PlacementProfile) {
        match target.property("face") {
            Some("floor") => profile.retain_faces(|face| face == Direction::Down),
            Some("ceiling") => profile.retain_faces(|face| face == Direction::Up),
            Some("wall") => {
                let support = target
                    .property("facing")
                    .and_then(Direction::from_name)
                    .map(Direction::opposite);
                profile.retain_faces(|face| {
                    face.is_horizontal() && support.is_none_or(|support| support == face)
                });
            }
            _ => {}
        }
    }
}

/// `axis=x|y|z`: click a face on that axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisProcessor;

impl PropertyProcessor for AxisProcessor {
    fn name(&self) -> &'static str {
        "axis"
    }

    fn accepts(&self, target: &BlockState) -> bool {
        target.property("axis").is_some()
    }

    fn process(&self, _current: &BlockState, target: &BlockState, profile: &mut PlacementProfile) {
        let axis = match target.property("axis") {
            Some("x") => Axis::X,
            Some("y") => Axis::Y,
            Some("z") => Axis::Z,
            _ => return,
        };
        profile.retain_faces(|face| face.axis() == axis);
    }
}

/// Runs property processors and caches the profiles they produce.
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn PropertyProcessor>>,
    cache: Mutex<HashMap<(BlockState, BlockState), Option<PlacementProfile>>>,
}

impl core::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.processors.iter().map(|p| p.name()).collect();
        f.debug_struct("ProcessorRegistry")
            .field("processors", &names)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl ProcessorRegistry {
    /// A registry without processors.
    pub fn empty() -> Self {
        Self {
            processors: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A registry with the built-in half, slab, attachment, and axis
    /// processors.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(BlockHalfProcessor);
        registry.register(SlabProcessor);
        registry.register(AttachmentProcessor);
        registry.register(AxisProcessor);
        registry
    }

    /// Add a processor. Registering clears the cache.
    pub fn register(&mut self, processor: impl PropertyProcessor + 'static) {
        self.processors.push(Box::new(processor));
        self.cache.get_mut().clear();
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether no processor is registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Number of cached state pairs.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    /// The profile for placing `target` over `current`.
    ///
    /// Returns `None` when `current` is a different block that placement
    /// cannot replace.
    pub fn profile(&self, current: &BlockState, target: &BlockState) -> Option<PlacementProfile> {
        let key = (current.clone(), target.clone());
        if let Some(cached) = self.cache.lock().get(&key) {
            return cached.clone();
        }

        let profile = self.build(current, target);
        self.cache.lock().insert(key, profile.clone());
        profile
    }

    fn build(&self, current: &BlockState, target: &BlockState) -> Option<PlacementProfile> {
        if !current.replaceable && !current.same_block(target) {
            return None;
        }
        let mut profile = PlacementProfile::new(target);
        for processor in self.processors.iter().filter(|p| p.accepts(target)) {
            trace!(processor = processor.name(), target = %target, "pre-processing placement");
            processor.process(current, target, &mut profile);
        }
        Some(profile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn solid_block_of_another_kind_has_no_profile() {
        let registry = ProcessorRegistry::with_builtin();
        let profile = registry.profile(&BlockState::new("stone"), &BlockState::new("dirt"));
        assert!(profile.is_none());
    }

    #[test]
    fn plain_block_over_air_uses_every_face() {
        let registry = ProcessorRegistry::with_builtin();
        let profile = registry
            .profile(&BlockState::air(), &BlockState::new("stone"))
            .unwrap();
        assert_eq!(profile.faces.len(), 6);
        assert!(profile.placing);
        assert!(profile.surface.is_none());
        assert!(profile.ignored.contains("waterlogged"));
        assert_eq!(profile.item, Item::new("stone"));
    }

    #[test]
    fn top_slab_restricts_to_upper_half() {
        let registry = ProcessorRegistry::with_builtin();
        let slab = BlockState::new("oak_slab").with("type", "top");
        let profile = registry.profile(&BlockState::air(), &slab).unwrap();
        assert_eq!(profile.surface, Some(SurfaceScan::vertical(ScanHalf::Greater)));
    }

    #[test]
    fn double_slab_over_bottom_slab_is_an_interaction() {
        let registry = ProcessorRegistry::with_builtin();
        let bottom = BlockState::new("oak_slab").with("type", "bottom");
        let double = BlockState::new("oak_slab").with("type", "double");
        let profile = registry.profile(&bottom, &double).unwrap();
        assert!(!profile.placing);
        assert_eq!(profile.face_list(), vec![Direction::Up]);
        assert!(profile.surface.is_none());

        let fresh = registry.profile(&BlockState::air(), &double).unwrap();
        assert!(fresh.placing);
        assert!(fresh.ignored.contains("type"));
    }

    #[test]
    fn wall_attachment_keeps_the_supporting_face() {
        let registry = ProcessorRegistry::with_builtin();
        let lever = BlockState::new("lever")
            .with("face", "wall")
            .with("facing", "north");
        let profile = registry.profile(&BlockState::air(), &lever).unwrap();
        assert_eq!(profile.face_list(), vec![Direction::South]);

        let floor = BlockState::new("lever").with("face", "floor");
        let profile = registry.profile(&BlockState::air(), &floor).unwrap();
        assert_eq!(profile.face_list(), vec![Direction::Down]);
    }

    #[test]
    fn axis_limits_faces_to_the_axis() {
        let registry = ProcessorRegistry::with_builtin();
        let log = BlockState::new("oak_log").with("axis", "x");
        let profile = registry.profile(&BlockState::air(), &log).unwrap();
        assert_eq!(profile.face_list(), vec![Direction::West, Direction::East]);
    }

    #[test]
    fn profiles_are_cached_per_state_pair() {
        let registry = ProcessorRegistry::with_builtin();
        let stone = BlockState::new("stone");
        registry.profile(&BlockState::air(), &stone);
        registry.profile(&BlockState::air(), &stone);
        registry.profile(&BlockState::new("dirt"), &stone);
        assert_eq!(registry.cached(), 2);
    }

    #[test]
    fn registering_clears_the_cache() {
        let mut registry = ProcessorRegistry::empty();
        registry.profile(&BlockState::air(), &BlockState::new("stone"));
        assert_eq!(registry.cached(), 1);
        registry.register(AxisProcessor);
        assert_eq!(registry.cached(), 0);
        assert_eq!(registry.len(), 1);
    }
}
