//! Requests: described, not-yet-applied changes to a managed resource.
//!
//! A behavior builds a [`Request`] around a resource-specific payload,
//! narrows the stages it may be applied in, and submits it to the resource's
//! [`Manager`]. The manager either applies it, queues it for a later stage
//! of the same tick, or drops it. Dropping is silent: callers observe
//! success through [`Manager::is_done`], never through a return code.
//!
//! [`Manager`]: crate::manager::Manager
//! [`Manager::is_done`]: crate::manager::Manager::is_done

use praxis_types::{OwnerId, RequestId, Stage, StageMask};

use crate::manager::{Manager, Resource};

/// Counters that age a request while it is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestAge {
    /// Completed ticks the request has been active for.
    pub held_ticks: u32,
    /// Consecutive completed ticks the resource has matched the request.
    pub matched_ticks: u32,
}

impl RequestAge {
    /// Record the end of a tick.
    pub const fn advance(&mut self, matched: bool) {
        self.held_ticks = self.held_ticks.saturating_add(1);
        self.matched_ticks = if matched {
            self.matched_ticks.saturating_add(1)
        } else {
            0
        };
    }
}

/// A desired change to one managed resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<P> {
    /// Unique id of this request.
    id: RequestId,

    /// The behavior that submitted the request.
    owner: OwnerId,

    /// Resource-specific description of the change.
    payload: P,

    /// Stages in which the request may be applied.
    stages: StageMask,

    /// Apply now or not at all; never queue.
    urgent: bool,

    /// Ticks the request stays protected from preemption once applied.
    min_hold_ticks: u32,

    /// Age counters, advanced by the manager at the end of every tick.
    age: RequestAge,

    /// Whether the request has never been applied.
    fresh: bool,
}

impl<P> Request<P> {
    /// Create a queueable request allowed in every stage, held for at least
    /// one tick once applied.
    pub fn new(owner: OwnerId, payload: P) -> Self {
        Self {
            id: RequestId::new(),
            owner,
            payload,
            stages: StageMask::ALL,
            urgent: false,
            min_hold_ticks: 1,
            age: RequestAge::default(),
            fresh: true,
        }
    }

    /// Builder: restrict the stages the request may be applied in.
    #[must_use]
    pub const fn in_stages(mut self, stages: StageMask) -> Self {
        self.stages = stages;
        self
    }

    /// Builder: restrict the request to a single stage.
    #[must_use]
    pub const fn in_stage(self, stage: Stage) -> Self {
        self.in_stages(StageMask::single(stage))
    }

    /// Builder: mark the request now-or-nothing.
    #[must_use]
    pub const fn urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    /// Builder: set how many ticks the request is protected once applied.
    #[must_use]
    pub const fn hold_for(mut self, ticks: u32) -> Self {
        self.min_hold_ticks = ticks;
        self
    }

    /// Submit the request to `manager`, queueing it if the current stage does
    /// not match.
    pub fn submit<R>(self, manager: &mut Manager<R>) -> RequestId
    where
        R: Resource<Payload = P>,
    {
        manager.request(self, true)
    }

    /// Unique id of this request.
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The behavior that submitted the request.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Resource-specific payload.
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Mutable access to the payload, for resources that track progress
    /// inside it.
    pub const fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Stages in which the request may be applied.
    pub const fn stages(&self) -> StageMask {
        self.stages
    }

    /// Whether the request is now-or-nothing.
    pub const fn is_urgent(&self) -> bool {
        self.urgent
    }

    /// Ticks the request stays protected once applied.
    pub const fn min_hold_ticks(&self) -> u32 {
        self.min_hold_ticks
    }

    /// Age counters.
    pub const fn age(&self) -> RequestAge {
        self.age
    }

    /// Whether the request has never been applied.
    pub const fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Whether the minimum hold has elapsed, so another owner may preempt.
    pub const fn hold_elapsed(&self) -> bool {
        self.age.held_ticks >= self.min_hold_ticks
    }

    pub(crate) const fn mark_applied(&mut self) {
        self.fresh = false;
    }

    pub(crate) const fn age_mut(&mut self) -> &mut RequestAge {
        &mut self.age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_defaults() {
        let request = Request::new(OwnerId::new(), 5_u8);
        assert!(request.is_fresh());
        assert!(!request.is_urgent());
        assert_eq!(request.stages(), StageMask::ALL);
        assert_eq!(request.min_hold_ticks(), 1);
        assert!(!request.hold_elapsed());
    }

    #[test]
    fn age_resets_matched_on_mismatch() {
        let mut age = RequestAge::default();
        age.advance(true);
        age.advance(true);
        assert_eq!(age.matched_ticks, 2);
        age.advance(false);
        assert_eq!(age.held_ticks, 3);
        assert_eq!(age.matched_ticks, 0);
    }

    #[test]
    fn hold_elapses_after_min_ticks() {
        let mut request = Request::new(OwnerId::new(), ()).hold_for(2);
        request.age_mut().advance(false);
        assert!(!request.hold_elapsed());
        request.age_mut().advance(false);
        assert!(request.hold_elapsed());
    }

    #[test]
    fn zero_hold_is_immediately_preemptible() {
        let request = Request::new(OwnerId::new(), ()).hold_for(0);
        assert!(request.hold_elapsed());
    }
}
