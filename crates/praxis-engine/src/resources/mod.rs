//! Concrete resources arbitrated by the agent's managers.
//!
//! Each resource writes through the [`SharedWorld`](crate::world::SharedWorld)
//! it was built with:
//!
//! - [`rotation`] -- where the player looks.
//! - [`hotbar`] -- which hotbar slot is selected.
//! - [`inventory`] -- moving stored items into the hotbar.
//! - [`interact`] -- breaking and clicking blocks.

pub mod hotbar;
pub mod interact;
pub mod inventory;
pub mod rotation;

pub use hotbar::HotbarResource;
pub use interact::{InteractResource, Interaction};
pub use inventory::{InventoryAction, InventoryPlan, InventoryResource};
pub use rotation::RotationResource;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod bench {
    //! Drives one manager through a two-stage tick by hand.

    use praxis_core::clock::StageSchedule;
    use praxis_core::manager::{Manager, ManagerHooks, Resource};
    use praxis_types::Stage;

    pub(crate) struct Bench<R: Resource> {
        pub(crate) manager: Manager<R>,
        schedule: StageSchedule,
    }

    impl<R: Resource> Bench<R> {
        pub(crate) fn new(resource: R) -> Self {
            let schedule = StageSchedule::new(["pre", "post"]).unwrap();
            let manager = Manager::builder("bench", resource).build(&schedule).unwrap();
            Self { manager, schedule }
        }

        fn first(&self) -> Stage {
            self.schedule.first()
        }

        /// Open the first stage of a new tick.
        pub(crate) fn open(&mut self) {
            let stage = self.first();
            self.manager.open(stage);
        }

        /// Close the first stage, run the terminal one, and reset.
        pub(crate) fn finish_tick(&mut self) {
            let first = self.first();
            let terminal = self.schedule.terminal();
            self.manager.close(first);
            self.manager.open(terminal);
            self.manager.close(terminal);
            self.manager.end_tick();
        }

        /// Run `ticks` empty ticks.
        pub(crate) fn idle(&mut self, ticks: usize) {
            for _ in 0..ticks {
                self.open();
                self.finish_tick();
            }
        }
    }
}
