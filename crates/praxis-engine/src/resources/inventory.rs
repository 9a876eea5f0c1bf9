//! Stored items and the hotbar.
//!
//! The player keeps items outside the hotbar in an unordered store. An
//! [`InventoryPlan`] is an ordered list of moves between the store and the
//! hotbar. The resource performs as many moves per tick as its budget
//! allows and picks up where it left off whenever the manager opens again.

use praxis_core::config::InventoryConfig;
use praxis_core::manager::{Admission, Resource, Retention};
use praxis_core::request::Request;
use praxis_types::{Item, Stage};
use tracing::debug;

use crate::world::{HOTBAR_SLOTS, SharedWorld};

/// One move between the store and the hotbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    /// Move `item` from the store into hotbar `slot`, storing whatever was
    /// there.
    ToHotbar {
        /// The item to fetch.
        item: Item,
        /// Destination slot.
        slot: u8,
    },
    /// Move the item in hotbar `slot` into the store.
    Stash {
        /// Slot to empty.
        slot: u8,
    },
}

/// An ordered list of moves and how far it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryPlan {
    actions: Vec<InventoryAction>,
    performed: usize,
}

impl InventoryPlan {
    /// A plan that performs `actions` in order.
    pub const fn new(actions: Vec<InventoryAction>) -> Self {
        Self {
            actions,
            performed: 0,
        }
    }

    /// A single move of `item` into `slot`.
    pub fn fetch(item: Item, slot: u8) -> Self {
        Self::new(vec![InventoryAction::ToHotbar { item, slot }])
    }

    /// Whether every move has been performed.
    pub fn is_complete(&self) -> bool {
        self.performed >= self.actions.len()
    }
}

/// Why a move could not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blocked {
    Budget,
    Missing,
}

/// Moves items between the store and the hotbar.
#[derive(Debug)]
pub struct InventoryResource {
    world: SharedWorld,
    storage: Vec<Item>,
    actions_per_tick: u32,
    actions_this_tick: u32,
}

impl InventoryResource {
    /// An inventory resource over `world` holding `storage`.
    pub const fn new(world: SharedWorld, storage: Vec<Item>, config: &InventoryConfig) -> Self {
        Self {
            world,
            storage,
            actions_per_tick: config.actions_per_tick,
            actions_this_tick: 0,
        }
    }

    /// Whether the store holds `item`.
    pub fn contains(&self, item: &Item) -> bool {
        self.storage.contains(item)
    }

    /// Items in the store.
    pub fn storage(&self) -> &[Item] {
        &self.storage
    }

    fn has_budget(&self) -> bool {
        self.actions_per_tick == 0 || self.actions_this_tick < self.actions_per_tick
    }

    fn perform_one(&mut self, action: &InventoryAction) -> Result<(), Blocked> {
        match action {
            InventoryAction::ToHotbar { item, slot } => {
                if *slot >= HOTBAR_SLOTS {
                    return Err(Blocked::Missing);
                }
                if self.world.hotbar_item(*slot).as_ref() == Some(item) {
                    return Ok(());
                }
                if !self.has_budget() {
                    return Err(Blocked::Budget);
                }
                let Some(index) = self.storage.iter().position(|stored| stored == item) else {
                    return Err(Blocked::Missing);
                };
                let fetched = self.storage.swap_remove(index);
                if let Some(previous) = self.world.swap_hotbar(*slot, Some(fetched)) {
                    self.storage.push(previous);
                }
            }
            InventoryAction::Stash { slot } => {
                if self.world.hotbar_item(*slot).is_none() {
                    return Ok(());
                }
                if !self.has_budget() {
                    return Err(Blocked::Budget);
                }
                if let Some(previous) = self.world.swap_hotbar(*slot, None) {
                    self.storage.push(previous);
                }
            }
        }
        self.actions_this_tick = self.actions_this_tick.saturating_add(1);
        Ok(())
    }

    fn perform(&mut self, plan: &mut InventoryPlan) -> Result<(), Blocked> {
        while let Some(action) = plan.actions.get(plan.performed).cloned() {
            self.perform_one(&action)?;
            plan.performed = plan.performed.saturating_add(1);
        }
        Ok(())
    }
}

impl Resource for InventoryResource {
    type Payload = InventoryPlan;

    fn apply(&mut self, _stage: Stage, request: &mut Request<InventoryPlan>) -> Admission {
        match self.perform(request.payload_mut()) {
            Ok(()) | Err(Blocked::Budget) => Admission::Accepted,
            Err(Blocked::Missing) => {
                debug!(request_id = %request.id(), "inventory move refused: item not stored");
                Admission::Declined
            }
        }
    }

    fn is_done(&self, request: &Request<InventoryPlan>) -> bool {
        request.payload().is_complete()
    }

    fn on_open(&mut self, _stage: Stage, active: Option<&mut Request<InventoryPlan>>) {
        if let Some(request) = active
            && self.perform(request.payload_mut()) == Err(Blocked::Missing)
        {
            debug!(request_id = %request.id(), "inventory plan stalled: item not stored");
        }
    }

    fn end_tick(&mut self, active: Option<&mut Request<InventoryPlan>>) -> Retention {
        self.actions_this_tick = 0;
        match active {
            Some(request) if request.age().matched_ticks > 0 => Retention::Release,
            _ => Retention::Keep,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use praxis_core::manager::RequestStatus;
    use praxis_sim::grid::GridWorld;
    use praxis_types::{OwnerId, Vec3};

    use super::*;
    use crate::resources::bench::Bench;

    fn setup(actions_per_tick: u32) -> (SharedWorld, Bench<InventoryResource>) {
        let world = SharedWorld::new(GridWorld::default(), Vec3::ZERO);
        world.swap_hotbar(0, Some(Item::new("pickaxe")));
        let resource = InventoryResource::new(
            world.clone(),
            vec![Item::new("cobblestone"), Item::new("oak_slab")],
            &InventoryConfig { actions_per_tick },
        );
        (world, Bench::new(resource))
    }

    #[test]
    fn fetch_swaps_the_previous_item_into_storage() {
        let (world, mut bench) = setup(1);
        bench.open();
        let id = bench
            .manager
            .request(Request::new(OwnerId::new(), InventoryPlan::fetch(Item::new("cobblestone"), 0)), false);
        assert!(bench.manager.is_done(id));
        assert_eq!(world.hotbar_item(0), Some(Item::new("cobblestone")));
        let resource = bench.manager.resource();
        assert!(resource.contains(&Item::new("pickaxe")));
        assert!(!resource.contains(&Item::new("cobblestone")));
    }

    #[test]
    fn missing_item_is_declined() {
        let (world, mut bench) = setup(1);
        bench.open();
        let id = bench
            .manager
            .request(Request::new(OwnerId::new(), InventoryPlan::fetch(Item::new("glass"), 1)), false);
        assert_eq!(bench.manager.status(id), RequestStatus::Unknown);
        assert_eq!(world.hotbar_item(1), None);
    }

    #[test]
    fn plan_spreads_over_ticks_within_budget() {
        let (world, mut bench) = setup(1);
        let plan = InventoryPlan::new(vec![
            InventoryAction::ToHotbar {
                item: Item::new("cobblestone"),
                slot: 1,
            },
            InventoryAction::ToHotbar {
                item: Item::new("oak_slab"),
                slot: 2,
            },
            InventoryAction::Stash { slot: 0 },
        ]);
        bench.open();
        let id = bench.manager.request(Request::new(OwnerId::new(), plan), false);
        assert!(!bench.manager.is_done(id));
        assert_eq!(bench.manager.active().unwrap().payload().performed, 1);

        bench.finish_tick();
        bench.open();
        assert_eq!(bench.manager.active().unwrap().payload().performed, 2);
        bench.finish_tick();
        bench.open();
        assert!(bench.manager.is_done(id));
        assert_eq!(world.hotbar_item(0), None);
        assert_eq!(world.hotbar_item(2), Some(Item::new("oak_slab")));
        assert!(bench.manager.resource().contains(&Item::new("pickaxe")));
    }
}
