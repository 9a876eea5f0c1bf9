//! Breaking and clicking blocks.
//!
//! An [`Interaction`] is only accepted while the player holds the right
//! hotbar slot and looks where the simulation said to look. Breaks that
//! take time progress once per tick while their request stays active.

use praxis_core::manager::{Admission, Resource, Retention};
use praxis_core::request::Request;
use praxis_sim::result::{BreakAction, InteractAction};
use praxis_sim::world::{Placement, PlacementQuery, WorldView};
use praxis_types::{BlockPos, BlockState, Rotation, Stage};
use tracing::{debug, trace};

use crate::world::SharedWorld;

/// How far, in degrees, the player may look away from the aim point.
pub const AIM_TOLERANCE_DEGREES: f64 = 1.0;

/// One use of the interaction key.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Break the block at `pos`.
    Break {
        /// Block to break.
        pos: BlockPos,
        /// Slot that has to be selected.
        slot: u8,
        /// Rotation that aims at the block.
        rotation: Rotation,
    },
    /// Click a block with the item in hand.
    Use(Box<InteractAction>),
}

impl Interaction {
    /// The interaction that carries out `action`.
    pub const fn breaking(action: &BreakAction) -> Self {
        Self::Break {
            pos: action.pos,
            slot: action.slot,
            rotation: action.hit.rotation,
        }
    }

    /// Position the interaction changes.
    pub fn pos(&self) -> BlockPos {
        match self {
            Self::Break { pos, .. } => *pos,
            Self::Use(action) => action.pos,
        }
    }

    /// Slot that has to be selected.
    pub fn slot(&self) -> u8 {
        match self {
            Self::Break { slot, .. } => *slot,
            Self::Use(action) => action.slot,
        }
    }

    /// Rotation the player has to hold.
    pub fn rotation(&self) -> Rotation {
        match self {
            Self::Break { rotation, .. } => *rotation,
            Self::Use(action) => action.hit.rotation,
        }
    }

    /// The state the position is in once the interaction is done.
    pub fn outcome(&self) -> BlockState {
        match self {
            Self::Break { .. } => BlockState::air(),
            Self::Use(action) => action.state.clone(),
        }
    }
}

/// A break in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Breaking {
    pos: BlockPos,
    ticks_left: u32,
}

/// Carries out interactions against the world.
#[derive(Debug)]
pub struct InteractResource {
    world: SharedWorld,
    breaking: Option<Breaking>,
}

impl InteractResource {
    /// An interaction resource over `world`.
    pub const fn new(world: SharedWorld) -> Self {
        Self {
            world,
            breaking: None,
        }
    }

    /// Ticks left on the break in progress.
    pub fn break_ticks_left(&self) -> Option<u32> {
        self.breaking.map(|breaking| breaking.ticks_left)
    }

    fn start_break(&mut self, pos: BlockPos) -> Admission {
        let current = self.world.block_state(pos);
        if current.is_air() {
            return Admission::Accepted;
        }
        let Some(tool) = self.world.break_tool(&current) else {
            debug!(%pos, block = %current, "nothing in the hotbar can break this block");
            return Admission::Declined;
        };
        if tool.is_instant() {
            self.world.set_block(pos, BlockState::air());
            self.breaking = None;
        } else if self.breaking.is_none_or(|breaking| breaking.pos != pos) {
            self.breaking = Some(Breaking {
                pos,
                ticks_left: tool.break_ticks,
            });
        }
        Admission::Accepted
    }

    fn click(&mut self, action: &InteractAction) -> Admission {
        if self.world.hotbar_item(action.slot).as_ref() != Some(&action.item) {
            return Admission::Declined;
        }
        let query = PlacementQuery {
            target: action.pos,
            clicked: action.hit.pos,
            face: action.hit.face,
            hit: action.hit.point,
            item: action.item.clone(),
            rotation: action.hit.rotation,
        };
        match self.world.predict_placement(&query) {
            Placement::Placed { pos, state } => {
                trace!(%pos, block = %state, "block placed");
                self.world.set_block(pos, state);
                self.breaking = None;
                Admission::Accepted
            }
            refused => {
                debug!(pos = %action.pos, outcome = ?refused, "click had no effect");
                Admission::Declined
            }
        }
    }
}

impl Resource for InteractResource {
    type Payload = Interaction;

    fn apply(&mut self, _stage: Stage, request: &mut Request<Interaction>) -> Admission {
        let interaction = request.payload();
        if self.world.selected_slot() != interaction.slot() {
            trace!(request_id = %request.id(), "declined: wrong slot selected");
            return Admission::Declined;
        }
        if self.world.player().rotation.angle_to(interaction.rotation()) > AIM_TOLERANCE_DEGREES {
            trace!(request_id = %request.id(), "declined: not aiming at the block");
            return Admission::Declined;
        }
        match interaction {
            Interaction::Break { pos, .. } => self.start_break(*pos),
            Interaction::Use(action) => self.click(action),
        }
    }

    fn is_done(&self, request: &Request<Interaction>) -> bool {
        let interaction = request.payload();
        self.world.block_state(interaction.pos()) == interaction.outcome()
    }

    fn end_tick(&mut self, active: Option<&mut Request<Interaction>>) -> Retention {
        let Some(request) = active else {
            self.breaking = None;
            return Retention::Keep;
        };
        if request.age().matched_ticks > 0 {
            return Retention::Release;
        }
        if let Interaction::Break { pos, .. } = request.payload()
            && let Some(breaking) = self.breaking.as_mut()
            && breaking.pos == *pos
        {
            breaking.ticks_left = breaking.ticks_left.saturating_sub(1);
            if breaking.ticks_left == 0 {
                self.world.set_block(*pos, BlockState::air());
                self.breaking = None;
            }
        }
        Retention::Keep
    }
}
