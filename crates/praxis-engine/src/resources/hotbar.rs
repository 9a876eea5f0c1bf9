//! The selected hotbar slot.

use praxis_core::config::HotbarConfig;
use praxis_core::manager::{Admission, Resource, Retention};
use praxis_core::request::Request;
use praxis_types::Stage;
use tracing::trace;

use crate::world::{HOTBAR_SLOTS, SharedWorld};

/// Selects hotbar slots, at most `swaps_per_tick` times per tick.
///
/// After a swap the slot only counts as ready once `swap_pause` ticks have
/// passed.
#[derive(Debug)]
pub struct HotbarResource {
    world: SharedWorld,
    keep_ticks: u32,
    swap_pause: u32,
    swaps_per_tick: u32,
    swaps_this_tick: u32,
    pause_left: u32,
}

impl HotbarResource {
    /// A hotbar resource over `world`.
    pub const fn new(world: SharedWorld, config: &HotbarConfig) -> Self {
        Self {
            world,
            keep_ticks: config.keep_ticks,
            swap_pause: config.swap_pause,
            swaps_per_tick: config.swaps_per_tick,
            swaps_this_tick: 0,
            pause_left: 0,
        }
    }
}

impl Resource for HotbarResource {
    type Payload = u8;

    fn apply(&mut self, _stage: Stage, request: &mut Request<u8>) -> Admission {
        let slot = *request.payload();
        if slot >= HOTBAR_SLOTS {
            return Admission::Declined;
        }
        if self.world.selected_slot() == slot {
            return Admission::Accepted;
        }
        if self.swaps_this_tick >= self.swaps_per_tick {
            trace!(slot, swaps = self.swaps_this_tick, "swap budget exhausted");
            return Admission::Declined;
        }
        self.world.select_slot(slot);
        self.swaps_this_tick = self.swaps_this_tick.saturating_add(1);
        self.pause_left = self.swap_pause;
        Admission::Accepted
    }

    fn is_done(&self, request: &Request<u8>) -> bool {
        self.world.selected_slot() == *request.payload() && self.pause_left == 0
    }

    fn end_tick(&mut self, active: Option<&mut Request<u8>>) -> Retention {
        self.swaps_this_tick = 0;
        self.pause_left = self.pause_left.saturating_sub(1);
        match active {
            Some(request) if request.age().matched_ticks >= self.keep_ticks => Retention::Release,
            _ => Retention::Keep,
        }
    }
}
