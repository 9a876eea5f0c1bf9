//! The stack of outer simulations a nested simulation runs under.
//!
//! A strategy that needs some other change first (fill a fluid before
//! breaking it, clear a support before placing) simulates that change as a
//! dependency. Results of the nested simulation are wrapped by every
//! dependency on the stack, innermost first, so the outermost wrapper names
//! the position the caller asked about.

use serde::Serialize;

use praxis_types::BlockPos;

use crate::result::SimResult;

/// Why an outer simulation ran a nested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyReason {
    /// A fluid must be filled with a solid block before it can be cleared.
    FillFluid,
    /// A block an entity stands on must be broken so a placement fits.
    ClearSupport,
}

/// One entry on the dependency stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Why the nested simulation runs.
    pub reason: DependencyReason,
    /// Position of the outer simulation.
    pub origin: BlockPos,
}

impl Dependency {
    /// Create a dependency entry.
    pub const fn new(reason: DependencyReason, origin: BlockPos) -> Self {
        Self { reason, origin }
    }

    /// Wrap a result produced under this dependency.
    pub fn wrap(self, result: SimResult) -> SimResult {
        SimResult::Dependency {
            reason: self.reason,
            origin: self.origin,
            inner: Box::new(result),
        }
    }
}

/// Bounded stack of dependencies, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyStack {
    entries: Vec<Dependency>,
    max_depth: usize,
}

impl DependencyStack {
    /// An empty stack holding at most `max_depth` dependencies.
    pub const fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_depth,
        }
    }

    /// Number of dependencies on the stack.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// The stack with `dependency` pushed on top, or `None` when the stack
    /// is already full.
    #[must_use]
    pub fn push(&self, dependency: Dependency) -> Option<Self> {
        if self.entries.len() >= self.max_depth {
            return None;
        }
        let mut next = self.clone();
        next.entries.push(dependency);
        Some(next)
    }

    /// Wrap `result` by every dependency, innermost first.
    pub fn wrap(&self, result: SimResult) -> SimResult {
        self.entries
            .iter()
            .rev()
            .fold(result, |inner, dependency| dependency.wrap(inner))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unwrap_dependency(result: SimResult) -> Option<(DependencyReason, BlockPos, SimResult)> {
        match result {
            SimResult::Dependency {
                reason,
                origin,
                inner,
            } => Some((reason, origin, *inner)),
            _ => None,
        }
    }

    #[test]
    fn inner_dependency_wraps_first() {
        let outer = Dependency::new(DependencyReason::FillFluid, BlockPos::new(1, 0, 0));
        let inner = Dependency::new(DependencyReason::ClearSupport, BlockPos::new(2, 0, 0));
        let stack = DependencyStack::new(3).push(outer).unwrap().push(inner).unwrap();

        let leaf = BlockPos::new(3, 0, 0);
        let wrapped = stack.wrap(SimResult::NotVisible { pos: leaf });

        let (reason, origin, middle) = unwrap_dependency(wrapped).unwrap();
        assert_eq!(reason, DependencyReason::FillFluid);
        assert_eq!(origin, BlockPos::new(1, 0, 0));

        let (reason, origin, innermost) = unwrap_dependency(middle).unwrap();
        assert_eq!(reason, DependencyReason::ClearSupport);
        assert_eq!(origin, BlockPos::new(2, 0, 0));
        assert_eq!(innermost, SimResult::NotVisible { pos: leaf });
    }

    #[test]
    fn push_beyond_the_bound_is_dropped() {
        let dependency = Dependency::new(DependencyReason::FillFluid, BlockPos::new(0, 0, 0));
        let one = DependencyStack::new(1).push(dependency).unwrap();
        assert_eq!(one.depth(), 1);
        assert!(one.push(dependency).is_none());
        assert!(DependencyStack::new(0).push(dependency).is_none());
    }

    #[test]
    fn empty_stack_leaves_results_alone() {
        let result = SimResult::Done {
            pos: BlockPos::new(0, 0, 0),
        };
        assert_eq!(DependencyStack::new(2).wrap(result.clone()), result);
    }
}
