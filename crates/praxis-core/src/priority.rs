//! Effective priorities for managers that share a stage.
//!
//! Every stage is dispatched as one list of slots, highest slot first:
//! manager openings occupy the top of the range, the host's stage handler
//! sits at [`HOST_SLOT`], manager closings sit near the bottom, and the
//! per-tick reset runs at [`RESET_SLOT`]. A manager's slots are derived from
//! its own priority and the sum of every sibling's priority, which makes
//! opening run high-to-low priority and closing run low-to-high.

/// Slot of the host's own stage handler.
pub const HOST_SLOT: i64 = 0;

/// Slot of the per-tick reset on the terminal stage.
pub const RESET_SLOT: i64 = i64::MIN;

/// One step of a stage's dispatch plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Open the manager at this index.
    Open(usize),
    /// Run the host's stage handler.
    Host,
    /// Close the manager at this index.
    Close(usize),
    /// Run the per-tick reset of the manager at this index.
    Reset(usize),
}

/// Sum of all sibling priorities, from which slots are derived.
///
/// Priorities are unsigned, so a manager is never "behind" by a negative
/// amount and the slot ranges cannot overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityLedger {
    /// Sum of every registered priority.
    total: i64,
}

impl PriorityLedger {
    /// Build a ledger over the priorities of every manager on the stage.
    pub fn new<I: IntoIterator<Item = u32>>(priorities: I) -> Self {
        let total = priorities
            .into_iter()
            .fold(0_i64, |sum, p| sum.saturating_add(i64::from(p)));
        Self { total }
    }

    /// Sum of every priority.
    pub const fn total(&self) -> i64 {
        self.total
    }

    /// Slot at which a manager with `priority` opens.
    pub const fn open_slot(&self, priority: u32) -> i64 {
        let behind = self.total.saturating_sub(priority as i64);
        i64::MAX.saturating_sub(1).saturating_sub(behind)
    }

    /// Slot at which a manager with `priority` closes.
    pub const fn close_slot(&self, priority: u32) -> i64 {
        let behind = self.total.saturating_sub(priority as i64);
        RESET_SLOT.saturating_add(1).saturating_add(behind)
    }

    /// The dispatch plan for one stage.
    ///
    /// `priorities[i]` is the priority of manager `i`. Ties open in index
    /// order and close in reverse index order. Resets are only planned on
    /// the terminal stage.
    pub fn plan(&self, priorities: &[u32], terminal: bool) -> Vec<Phase> {
        let mut slots: Vec<(i64, usize, Phase)> = Vec::with_capacity(
            priorities
                .len()
                .saturating_mul(3)
                .saturating_add(1),
        );
        for (index, priority) in priorities.iter().copied().enumerate() {
            slots.push((self.open_slot(priority), index, Phase::Open(index)));
            slots.push((self.close_slot(priority), index, Phase::Close(index)));
            if terminal {
                slots.push((RESET_SLOT, index, Phase::Reset(index)));
            }
        }
        slots.push((HOST_SLOT, 0, Phase::Host));
        slots.sort_by(|a, b| {
            b.0.cmp(&a.0).then_with(|| match a.2 {
                Phase::Close(_) => b.1.cmp(&a.1),
                _ => a.1.cmp(&b.1),
            })
        });
        slots.into_iter().map(|(_, _, phase)| phase).collect()
    }
}
