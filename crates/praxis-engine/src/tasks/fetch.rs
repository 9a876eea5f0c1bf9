//! Bring a stored item into the hotbar.

use praxis_core::request::Request;
use praxis_core::task::{Step, Task, TaskCx, TaskError};
use praxis_sim::WorldView;
use praxis_types::Item;
use tracing::{debug, info};

use super::Pursuit;
use crate::agent::Agent;
use crate::resources::InventoryPlan;
use crate::world::HOTBAR_SLOTS;

/// Ticks a fetch may take.
pub const FETCH_TIMEOUT_TICKS: u64 = 100;

/// Move `item` from storage into the hotbar.
///
/// Uses the first empty slot, or the last slot when the hotbar is full.
/// Completes with the slot the item ended up in.
#[derive(Debug)]
pub struct FetchTask {
    item: Item,
    slot: Option<u8>,
    pursuit: Pursuit,
}

impl FetchTask {
    /// A task fetching `item`.
    pub fn new(item: Item) -> Self {
        Self {
            item,
            slot: None,
            pursuit: Pursuit::default(),
        }
    }
}

impl Task<Agent> for FetchTask {
    type Output = u8;

    fn on_start(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<u8>, TaskError> {
        let agent = cx.env();
        if let Some(slot) = agent.world().hotbar_slot_of(&self.item) {
            debug!(item = %self.item, slot, "item already in the hotbar");
            return Ok(Step::Done(slot));
        }
        if !agent.inventory.resource().contains(&self.item) {
            return Err(TaskError::failed(format!("{} is not in storage", self.item)));
        }
        let slot = agent
            .world()
            .empty_hotbar_slot()
            .unwrap_or(HOTBAR_SLOTS.saturating_sub(1));
        self.slot = Some(slot);
        info!(item = %self.item, slot, "fetching item");
        self.on_stage(cx)
    }

    fn on_stage(&mut self, cx: &mut TaskCx<'_, Agent>) -> Result<Step<u8>, TaskError> {
        let Some(slot) = self.slot else {
            return Err(TaskError::failed("fetch has no destination slot"));
        };
        let me = cx.me();
        let age = cx.forest().age(me)?;
        let agent = cx.env();
        let owner = agent.owner();
        let item = &self.item;
        if self
            .pursuit
            .drive(&mut agent.inventory, || Request::new(owner, InventoryPlan::fetch(item.clone(), slot)))
            || agent.world().hotbar_item(slot).as_ref() == Some(&self.item)
        {
            return Ok(Step::Done(slot));
        }
        if age >= FETCH_TIMEOUT_TICKS {
            return Err(TaskError::failed(format!(
                "{} did not reach hotbar slot {slot}",
                self.item
            )));
        }
        Ok(Step::Pending)
    }
}
