//! Simulation results and their ranking.
//!
//! Every way (or reason not) to change one position is a [`SimResult`].
//! Results carry a [`Rank`]: lower ranks are more directly actionable.
//! Results produced by a nested simulation are wrapped in
//! [`SimResult::Dependency`] by every outer simulation on the stack.

use std::cmp::Ordering;

use serde::Serialize;

use praxis_types::{BlockPos, BlockState, Item};

use crate::dependency::DependencyReason;
use crate::scan::Hit;

/// Ordinal actionability of a result. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    /// Break or place right now.
    Success,
    /// The right item is not in the hotbar.
    WrongItem,
    /// Every aim point is beyond the reach.
    OutOfReach,
    /// No permitted face can be seen.
    NotVisible,
    /// A fluid has to be displaced first.
    Submerge,
    /// The player stands on the block.
    PlayerOnTop,
    /// The player stands where the block would go.
    BlockedBySelf,
    /// An entity stands where the block would go.
    BlockedByEntity,
    /// The placement would produce the wrong state.
    NoIntegrity,
    /// The placement would land somewhere else.
    UnexpectedPosition,
    /// The item cannot build out from the clicked face.
    ScaffoldExceeded,
    /// The block at the target cannot be replaced.
    CantReplace,
    /// The item may not be used here.
    IllegalUsage,
    /// The chunk is not loaded.
    ChunkNotLoaded,
    /// The block is on the ignore list.
    Ignored,
    /// The position is outside the world.
    OutOfWorld,
    /// The block cannot be broken.
    Unbreakable,
    /// The position already matches the target.
    Done,
}

impl Rank {
    /// Position of the rank in the ordering.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Where the player should move to make a result actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Come within `radius` blocks of `pos`.
    Near {
        /// Position to approach.
        pos: BlockPos,
        /// Acceptable distance.
        radius: u32,
    },
    /// Step off `pos`.
    Away {
        /// Position to leave.
        pos: BlockPos,
    },
}

/// A break that can be started right now.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakAction {
    /// Block to break.
    pub pos: BlockPos,
    /// Aim point.
    pub hit: Hit,
    /// Hotbar slot of the tool.
    pub slot: u8,
    /// The tool.
    pub item: Item,
    /// Whether the block breaks in the tick it is hit.
    pub instant: bool,
}

/// A click that can be made right now.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractAction {
    /// Position being changed.
    pub pos: BlockPos,
    /// Aim point on the clicked block.
    pub hit: Hit,
    /// Hotbar slot of the item.
    pub slot: u8,
    /// The item used.
    pub item: Item,
    /// Whether the click places a new block.
    pub placing: bool,
    /// State the position ends up in.
    pub state: BlockState,
}

/// One simulated way, or reason not, to change a position.
#[derive(Debug, Clone, PartialEq)]
pub enum SimResult {
    /// The chunk is not loaded.
    ChunkNotLoaded {
        /// Position.
        pos: BlockPos,
    },
    /// The position already matches the target.
    Done {
        /// Position.
        pos: BlockPos,
    },
    /// The block is on the ignore list.
    Ignored {
        /// Position.
        pos: BlockPos,
    },
    /// The position is outside the world.
    OutOfWorld {
        /// Position.
        pos: BlockPos,
    },
    /// The block cannot be broken.
    Unbreakable {
        /// Position.
        pos: BlockPos,
    },
    /// Break the block.
    Break(BreakAction),
    /// The player stands on the block.
    PlayerOnTop {
        /// Position.
        pos: BlockPos,
    },
    /// A fluid has to be displaced before the position can be cleared.
    Submerge {
        /// Position.
        pos: BlockPos,
    },
    /// The needed item or tool is not in the hotbar.
    WrongItem {
        /// Position.
        pos: BlockPos,
        /// The missing item, or `None` for any suitable tool.
        item: Option<Item>,
    },
    /// Click a block.
    Interact(Box<InteractAction>),
    /// The item cannot build out from the clicked face.
    ScaffoldExceeded {
        /// Position.
        pos: BlockPos,
    },
    /// The placement would land somewhere else.
    UnexpectedPosition {
        /// Intended position.
        pos: BlockPos,
        /// Where the block would actually go.
        actual: BlockPos,
    },
    /// The item may not be used here.
    IllegalUsage {
        /// Position.
        pos: BlockPos,
    },
    /// The block at the target cannot be replaced.
    CantReplace {
        /// Position.
        pos: BlockPos,
    },
    /// The player stands where the block would go.
    BlockedBySelf {
        /// Position.
        pos: BlockPos,
    },
    /// An entity stands where the block would go.
    BlockedByEntity {
        /// Position.
        pos: BlockPos,
    },
    /// The placement would produce the wrong state.
    NoIntegrity {
        /// Position.
        pos: BlockPos,
        /// The wanted state.
        expected: BlockState,
        /// The state the placement would produce.
        actual: BlockState,
    },
    /// Every aim point is beyond the reach.
    OutOfReach {
        /// Position.
        pos: BlockPos,
        /// Distance to the nearest aim point.
        distance: f64,
    },
    /// No permitted face can be seen.
    NotVisible {
        /// Position.
        pos: BlockPos,
    },
    /// A result of a nested simulation, wrapped by the outer one.
    Dependency {
        /// Why the outer simulation ran the nested one.
        reason: DependencyReason,
        /// Position of the outer simulation.
        origin: BlockPos,
        /// The nested result.
        inner: Box<Self>,
    },
}

impl SimResult {
    /// Position the result is about. For dependencies this is the outer
    /// simulation's position.
    pub fn pos(&self) -> BlockPos {
        match self {
            Self::ChunkNotLoaded { pos }
            | Self::Done { pos }
            | Self::Ignored { pos }
            | Self::OutOfWorld { pos }
            | Self::Unbreakable { pos }
            | Self::PlayerOnTop { pos }
            | Self::Submerge { pos }
            | Self::WrongItem { pos, .. }
            | Self::ScaffoldExceeded { pos }
            | Self::UnexpectedPosition { pos, .. }
            | Self::IllegalUsage { pos }
            | Self::CantReplace { pos }
            | Self::BlockedBySelf { pos }
            | Self::BlockedByEntity { pos }
            | Self::NoIntegrity { pos, .. }
            | Self::OutOfReach { pos, .. }
            | Self::NotVisible { pos } => *pos,
            Self::Break(action) => action.pos,
            Self::Interact(action) => action.pos,
            Self::Dependency { origin, .. } => *origin,
        }
    }

    /// Actionability rank. Dependencies take the rank of what they wrap.
    pub fn rank(&self) -> Rank {
        match self {
            Self::ChunkNotLoaded { .. } => Rank::ChunkNotLoaded,
            Self::Done { .. } => Rank::Done,
            Self::Ignored { .. } => Rank::Ignored,
            Self::OutOfWorld { .. } => Rank::OutOfWorld,
            Self::Unbreakable { .. } => Rank::Unbreakable,
            Self::Break(_) | Self::Interact(_) => Rank::Success,
            Self::PlayerOnTop { .. } => Rank::PlayerOnTop,
            Self::Submerge { .. } => Rank::Submerge,
            Self::WrongItem { .. } => Rank::WrongItem,
            Self::ScaffoldExceeded { .. } => Rank::ScaffoldExceeded,
            Self::UnexpectedPosition { .. } => Rank::UnexpectedPosition,
            Self::IllegalUsage { .. } => Rank::IllegalUsage,
            Self::CantReplace { .. } => Rank::CantReplace,
            Self::BlockedBySelf { .. } => Rank::BlockedBySelf,
            Self::BlockedByEntity { .. } => Rank::BlockedByEntity,
            Self::NoIntegrity { .. } => Rank::NoIntegrity,
            Self::OutOfReach { .. } => Rank::OutOfReach,
            Self::NotVisible { .. } => Rank::NotVisible,
            Self::Dependency { inner, .. } => inner.rank(),
        }
    }

    /// Where to move to make this result actionable, if moving helps.
    pub fn goal(&self) -> Option<Goal> {
        match self {
            Self::OutOfReach { pos, .. } => Some(Goal::Near {
                pos: *pos,
                radius: 3,
            }),
            Self::PlayerOnTop { pos } => Some(Goal::Away { pos: *pos }),
            Self::Dependency { inner, .. } => inner.goal(),
            _ => None,
        }
    }

    /// Whether the rank is below `threshold`.
    pub fn is_actionable(&self, threshold: u8) -> bool {
        self.rank().ordinal() < threshold
    }

    /// The innermost result, unwrapping every dependency.
    pub fn innermost(&self) -> &Self {
        let mut current = self;
        while let Self::Dependency { inner, .. } = current {
            current = inner;
        }
        current
    }

    /// Short name of the result kind, for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChunkNotLoaded { .. } => "chunk_not_loaded",
            Self::Done { .. } => "done",
            Self::Ignored { .. } => "ignored",
            Self::OutOfWorld { .. } => "out_of_world",
            Self::Unbreakable { .. } => "unbreakable",
            Self::Break(_) => "break",
            Self::PlayerOnTop { .. } => "player_on_top",
            Self::Submerge { .. } => "submerge",
            Self::WrongItem { .. } => "wrong_item",
            Self::Interact(_) => "interact",
            Self::ScaffoldExceeded { .. } => "scaffold_exceeded",
            Self::UnexpectedPosition { .. } => "unexpected_position",
            Self::IllegalUsage { .. } => "illegal_usage",
            Self::CantReplace { .. } => "cant_replace",
            Self::BlockedBySelf { .. } => "blocked_by_self",
            Self::BlockedByEntity { .. } => "blocked_by_entity",
            Self::NoIntegrity { .. } => "no_integrity",
            Self::OutOfReach { .. } => "out_of_reach",
            Self::NotVisible { .. } => "not_visible",
            Self::Dependency { .. } => "dependency",
        }
    }

    /// Kind-specific distance used to break rank ties: the squared eye
    /// distance of the aim point for actions, the miss distance for
    /// out-of-reach results, zero otherwise.
    pub fn distance(&self) -> f64 {
        match self {
            Self::Break(action) => action.hit.distance_sq,
            Self::Interact(action) => action.hit.distance_sq,
            Self::OutOfReach { distance, .. } => distance * distance,
            Self::Dependency { inner, .. } => inner.distance(),
            _ => 0.0,
        }
    }

    const fn discriminant(&self) -> u8 {
        match self {
            Self::ChunkNotLoaded { .. } => 0,
            Self::Done { .. } => 1,
            Self::Ignored { .. } => 2,
            Self::OutOfWorld { .. } => 3,
            Self::Unbreakable { .. } => 4,
            Self::Break(_) => 5,
            Self::PlayerOnTop { .. } => 6,
            Self::Submerge { .. } => 7,
            Self::WrongItem { .. } => 8,
            Self::Interact(_) => 9,
            Self::ScaffoldExceeded { .. } => 10,
            Self::UnexpectedPosition { .. } => 11,
            Self::IllegalUsage { .. } => 12,
            Self::CantReplace { .. } => 13,
            Self::BlockedBySelf { .. } => 14,
            Self::BlockedByEntity { .. } => 15,
            Self::NoIntegrity { .. } => 16,
            Self::OutOfReach { .. } => 17,
            Self::NotVisible { .. } => 18,
            Self::Dependency { .. } => 19,
        }
    }

    /// Total order over results: rank, then distance, then position, then
    /// kind. Results that compare equal are interchangeable for callers.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.distance().total_cmp(&other.distance()))
            .then_with(|| self.pos().cmp(&other.pos()))
            .then_with(|| self.discriminant().cmp(&other.discriminant()))
            .then_with(|| match (self, other) {
                (Self::Dependency { inner: a, .. }, Self::Dependency { inner: b, .. }) => {
                    a.compare(b)
                }
                _ => Ordering::Equal,
            })
    }
}

/// The best actionable result: the minimum by [`SimResult::compare`] among
/// results ranked below `threshold`.
pub fn best_actionable(results: &[SimResult], threshold: u8) -> Option<&SimResult> {
    results
        .iter()
        .filter(|result| result.is_actionable(threshold))
        .min_by(|a, b| a.compare(b))
}
