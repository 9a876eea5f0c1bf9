//! Stages and stage sets.
//!
//! A [`Stage`] is a position in the fixed, repeating sequence of sub-phases
//! the host emits once per tick. Stages are ordered by their position in
//! that sequence. A [`StageMask`] is a set of stages packed into a `u64`, so
//! a schedule holds at most [`MAX_STAGES`] stages.

use serde::{Deserialize, Serialize};

/// Maximum number of stages a tick can be divided into.
pub const MAX_STAGES: usize = 64;

/// A sub-phase of one tick, identified by its position in the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stage(u32);

impl Stage {
    /// Create a stage from its position in the schedule.
    ///
    /// Returns `None` if the index is not below [`MAX_STAGES`].
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= MAX_STAGES {
            return None;
        }
        u32::try_from(index).ok().map(Self)
    }

    /// Position of this stage in the schedule.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    const fn bit(self) -> u64 {
        match 1_u64.checked_shl(self.0) {
            Some(bit) => bit,
            None => 0,
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// A set of stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageMask(u64);

impl StageMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every representable stage.
    pub const ALL: Self = Self(u64::MAX);

    /// A set containing exactly one stage.
    pub const fn single(stage: Stage) -> Self {
        Self(stage.bit())
    }

    /// All stages up to and including `stage`.
    pub const fn up_to(stage: Stage) -> Self {
        let bit = stage.bit();
        Self(bit | bit.wrapping_sub(1))
    }

    /// All stages that come strictly after `stage` within the same tick.
    pub const fn after(stage: Stage) -> Self {
        Self(!Self::up_to(stage).0)
    }

    /// Return this set with `stage` added.
    #[must_use]
    pub const fn with(self, stage: Stage) -> Self {
        Self(self.0 | stage.bit())
    }

    /// Return this set with `stage` removed.
    #[must_use]
    pub const fn without(self, stage: Stage) -> Self {
        Self(self.0 & !stage.bit())
    }

    /// Whether `stage` is in the set.
    pub const fn contains(self, stage: Stage) -> bool {
        self.0 & stage.bit() != 0
    }

    /// Set intersection.
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Set union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Set difference.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Whether the set has no stages.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of stages in the set.
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate the stages in schedule order.
    pub fn iter(self) -> impl Iterator<Item = Stage> {
        (0..MAX_STAGES)
            .filter_map(Stage::from_index)
            .filter(move |stage| self.contains(*stage))
    }
}

impl FromIterator<Stage> for StageMask {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}
