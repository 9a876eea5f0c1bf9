//! Stage-gated arbitration of one shared resource.
//!
//! A [`Manager`] owns one serially-usable [`Resource`] (the aim, the
//! selected hotbar slot, the inventory cursor) and decides which of many
//! competing [`Request`]s may change it. It is only *accepting* while one of
//! its open stages is in progress; a request arriving outside that window
//! may be queued for a later stage of the same tick.
//!
//! # Arbitration rules
//!
//! For `request(req, queue)`:
//!
//! 1. A request queued by a different owner blocks everything else until
//!    the tick ends.
//! 2. An active request from a different owner is protected until its
//!    minimum hold has elapsed.
//! 3. If the manager is not accepting, or the current stage is not allowed
//!    by `req`, the request is queued when `queue` is set, `req` is not
//!    urgent, and some remaining open stage of this tick allows it.
//!    Otherwise it is dropped.
//! 4. Otherwise the resource applies it on the spot.
//!
//! A queued request is applied when its stage opens, before the host's own
//! stage handler runs. Anything still queued at the terminal stage is
//! dropped.

use std::collections::VecDeque;

use praxis_types::{OwnerId, RequestId, Stage, StageMask};
use tracing::{debug, trace, warn};

use crate::clock::{ScheduleError, StageSchedule};
use crate::config::ManagerConfig;
use crate::request::Request;

/// Errors that can occur while constructing a manager.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// A configured stage name does not exist.
    #[error("stage resolution failed for manager {name}: {source}")]
    Stage {
        /// The manager being built.
        name: String,
        /// The underlying clock error.
        source: ScheduleError,
    },

    /// Every stage of the schedule is excluded.
    #[error("manager {name} never opens: every stage is excluded")]
    NeverOpens {
        /// The manager being built.
        name: String,
    },
}

/// Whether a resource took a request it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request is now the active one.
    Accepted,
    /// The resource refused the request.
    Declined,
}

/// Whether the active request stays active after the tick ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep the request active.
    Keep,
    /// Release the request; the resource returns to idle.
    Release,
}

/// The serially-usable thing a [`Manager`] arbitrates.
pub trait Resource {
    /// Resource-specific description of a desired change.
    type Payload;

    /// Apply `request` during `stage`.
    fn apply(&mut self, stage: Stage, request: &mut Request<Self::Payload>) -> Admission;

    /// Whether the resource currently satisfies `request`.
    fn is_done(&self, request: &Request<Self::Payload>) -> bool;

    /// Called at the end of every tick with the active request, if any.
    ///
    /// The request's age has already been advanced.
    fn end_tick(&mut self, active: Option<&mut Request<Self::Payload>>) -> Retention {
        let _ = active;
        Retention::Keep
    }

    /// Called when the manager opens for `stage`.
    fn on_open(&mut self, stage: Stage, active: Option<&mut Request<Self::Payload>>) {
        let _ = (stage, active);
    }

    /// Called when the manager closes after `stage`.
    fn on_close(&mut self, stage: Stage, active: Option<&mut Request<Self::Payload>>) {
        let _ = (stage, active);
    }
}

/// Observable state of a request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// The request is the active one.
    Active,
    /// The request waits for a later stage of this tick.
    Queued,
    /// The request was dropped, superseded, or never seen.
    Unknown,
}

/// Per-tick and per-second admission budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionCounter {
    /// Maximum admissions per tick (0 = unlimited).
    max_per_tick: u32,
    /// Maximum admissions per second of host time (0 = unlimited).
    max_per_second: u32,
    /// Ticks in one second of host time.
    ticks_per_second: usize,
    /// Admissions during the current tick.
    this_tick: u32,
    /// Admissions in each of the most recent completed ticks.
    window: VecDeque<u32>,
}

impl AdmissionCounter {
    /// Create a counter. A limit of 0 disables that budget.
    pub fn new(max_per_tick: u32, max_per_second: u32, ticks_per_second: u32) -> Self {
        let ticks_per_second = usize::try_from(ticks_per_second.max(1)).unwrap_or(1);
        Self {
            max_per_tick,
            max_per_second,
            ticks_per_second,
            this_tick: 0,
            window: VecDeque::with_capacity(ticks_per_second),
        }
    }

    /// A counter with no limits.
    pub fn unlimited() -> Self {
        Self::new(0, 0, 20)
    }

    /// Admissions within the trailing second, including this tick.
    pub fn this_second(&self) -> u32 {
        self.window
            .iter()
            .fold(self.this_tick, |sum, n| sum.saturating_add(*n))
    }

    /// Admissions during the current tick.
    pub const fn this_tick(&self) -> u32 {
        self.this_tick
    }

    /// Whether another admission fits both budgets.
    pub fn has_budget(&self) -> bool {
        let tick_ok = self.max_per_tick == 0 || self.this_tick < self.max_per_tick;
        let second_ok = self.max_per_second == 0 || self.this_second() < self.max_per_second;
        tick_ok && second_ok
    }

    /// Record one admission.
    pub const fn record(&mut self) {
        self.this_tick = self.this_tick.saturating_add(1);
    }

    /// Close the current tick.
    pub fn end_tick(&mut self) {
        self.window.push_back(self.this_tick);
        while self.window.len() >= self.ticks_per_second {
            self.window.pop_front();
        }
        self.this_tick = 0;
    }
}

/// Hook run when a manager opens or closes.
pub type StageHook<R> = Box<dyn FnMut(&mut R, Stage) + Send>;

/// Object-safe view of a manager used by the tick driver.
pub trait ManagerHooks {
    /// Manager name, for logs.
    fn name(&self) -> &str;

    /// Priority against sibling managers.
    fn priority(&self) -> u32;

    /// Enter `stage`. Returns whether the manager opened.
    fn open(&mut self, stage: Stage) -> bool;

    /// Leave `stage`.
    fn close(&mut self, stage: Stage);

    /// Per-tick reset, run once on the terminal stage after every close.
    fn end_tick(&mut self);
}

/// Sole arbiter for one shared resource.
pub struct Manager<R: Resource> {
    /// Name for logs.
    name: String,

    /// Priority against sibling managers.
    priority: u32,

    /// Stages in which the manager opens.
    open_stages: StageMask,

    /// The arbitrated resource.
    resource: R,

    /// Whether the current stage is one of the open stages.
    accepting: bool,

    /// Stage in progress, `None` between ticks.
    current_stage: Option<Stage>,

    /// The request currently in effect.
    active: Option<Request<R::Payload>>,

    /// A request waiting for a later stage of this tick.
    queued: Option<Request<R::Payload>>,

    /// Whether a request was applied during this tick.
    active_this_tick: bool,

    /// Admission budgets.
    admissions: AdmissionCounter,

    /// Run after the manager opens.
    on_open: Option<StageHook<R>>,

    /// Run before the manager closes.
    on_close: Option<StageHook<R>>,
}

impl<R: Resource> core::fmt::Debug for Manager<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Manager")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("accepting", &self.accepting)
            .field("current_stage", &self.current_stage)
            .field("active", &self.active.as_ref().map(Request::id))
            .field("queued", &self.queued.as_ref().map(Request::id))
            .finish_non_exhaustive()
    }
}

impl<R: Resource> Manager<R> {
    /// Start building a manager for `resource`.
    pub fn builder(name: impl Into<String>, resource: R) -> ManagerBuilder<R> {
        ManagerBuilder {
            name: name.into(),
            resource,
            priority: 0,
            exclude: Vec::new(),
            admissions: AdmissionCounter::unlimited(),
            on_open: None,
            on_close: None,
        }
    }

    /// Submit a request.
    ///
    /// Returns the request's id whether or not it was honoured; use
    /// [`is_done`](Self::is_done) or [`status`](Self::status) to observe the
    /// outcome.
    pub fn request(&mut self, request: Request<R::Payload>, queue: bool) -> RequestId {
        let id = request.id();
        let owner = request.owner();

        if let Some(queued) = &self.queued
            && queued.owner() != owner
        {
            debug!(manager = %self.name, request_id = %id, queued_id = %queued.id(), "rejected: another owner's request is queued");
            return id;
        }

        if !self.preemptible_by(owner) {
            debug!(manager = %self.name, request_id = %id, "rejected: active request still held");
            return id;
        }

        let stage_matches = self
            .current_stage
            .is_some_and(|stage| self.accepting && request.stages().contains(stage));

        if !stage_matches {
            if !queue || request.is_urgent() {
                debug!(manager = %self.name, request_id = %id, urgent = request.is_urgent(), "rejected: stage mismatch");
                return id;
            }
            let remaining = self
                .current_stage
                .map_or(self.open_stages, |stage| {
                    self.open_stages.intersect(StageMask::after(stage))
                })
                .intersect(request.stages());
            if remaining.is_empty() {
                debug!(manager = %self.name, request_id = %id, "rejected: no remaining open stage allows it");
                return id;
            }
            trace!(manager = %self.name, request_id = %id, "queued for a later stage");
            self.queued = Some(request);
            return id;
        }

        if self.queued.as_ref().is_some_and(|q| q.owner() == owner) {
            self.queued = None;
        }
        self.admit(request);
        id
    }

    /// Whether `id` is the active request and the resource satisfies it.
    pub fn is_done(&self, id: RequestId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.id() == id && self.resource.is_done(active))
    }

    /// Observable state of `id`.
    pub fn status(&self, id: RequestId) -> RequestStatus {
        if self.active.as_ref().is_some_and(|r| r.id() == id) {
            RequestStatus::Active
        } else if self.queued.as_ref().is_some_and(|r| r.id() == id) {
            RequestStatus::Queued
        } else {
            RequestStatus::Unknown
        }
    }

    /// The active request.
    pub const fn active(&self) -> Option<&Request<R::Payload>> {
        self.active.as_ref()
    }

    /// The queued request.
    pub const fn queued(&self) -> Option<&Request<R::Payload>> {
        self.queued.as_ref()
    }

    /// Whether a request was applied during the current tick.
    pub const fn active_this_tick(&self) -> bool {
        self.active_this_tick
    }

    /// Whether the manager is accepting requests right now.
    pub const fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Stages in which the manager opens.
    pub const fn open_stages(&self) -> StageMask {
        self.open_stages
    }

    /// The arbitrated resource.
    pub const fn resource(&self) -> &R {
        &self.resource
    }

    /// Mutable access to the resource, for host-side bookkeeping.
    pub const fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    /// Admission budgets.
    pub const fn admissions(&self) -> &AdmissionCounter {
        &self.admissions
    }

    fn preemptible_by(&self, owner: OwnerId) -> bool {
        self.active
            .as_ref()
            .is_none_or(|active| active.owner() == owner || active.hold_elapsed())
    }

    fn admit(&mut self, mut request: Request<R::Payload>) {
        let Some(stage) = self.current_stage else {
            return;
        };
        let id = request.id();
        if !self.admissions.has_budget() {
            debug!(manager = %self.name, request_id = %id, "rejected: admission budget exhausted");
            return;
        }
        match self.resource.apply(stage, &mut request) {
            Admission::Accepted => {
                request.mark_applied();
                self.admissions.record();
                self.active_this_tick = true;
                trace!(manager = %self.name, request_id = %id, stage = stage.index(), "applied");
                self.active = Some(request);
            }
            Admission::Declined => {
                debug!(manager = %self.name, request_id = %id, "declined by resource");
            }
        }
    }
}

impl<R: Resource> ManagerHooks for Manager<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn open(&mut self, stage: Stage) -> bool {
        self.current_stage = Some(stage);
        if !self.open_stages.contains(stage) {
            self.accepting = false;
            return false;
        }
        self.accepting = true;
        if let Some(queued) = self.queued.take() {
            if queued.stages().contains(stage) {
                if self.preemptible_by(queued.owner()) {
                    self.admit(queued);
                } else {
                    debug!(manager = %self.name, request_id = %queued.id(), "queued request dropped: active request still held");
                }
            } else {
                self.queued = Some(queued);
            }
        }
        self.resource.on_open(stage, self.active.as_mut());
        if let Some(hook) = self.on_open.as_mut() {
            hook(&mut self.resource, stage);
        }
        true
    }

    fn close(&mut self, stage: Stage) {
        if !self.accepting {
            return;
        }
        if let Some(hook) = self.on_close.as_mut() {
            hook(&mut self.resource, stage);
        }
        self.resource.on_close(stage, self.active.as_mut());
        self.accepting = false;
    }

    fn end_tick(&mut self) {
        if let Some(active) = self.active.as_mut() {
            let matched = self.resource.is_done(active);
            active.age_mut().advance(matched);
        }
        if self.resource.end_tick(self.active.as_mut()) == Retention::Release
            && let Some(released) = self.active.take()
        {
            trace!(manager = %self.name, request_id = %released.id(), "released");
        }
        if let Some(dropped) = self.queued.take() {
            warn!(manager = %self.name, request_id = %dropped.id(), "queued request dropped at end of tick");
        }
        self.active_this_tick = false;
        self.admissions.end_tick();
        self.current_stage = None;
        self.accepting = false;
    }
}

/// Builder for [`Manager`].
pub struct ManagerBuilder<R: Resource> {
    name: String,
    resource: R,
    priority: u32,
    exclude: Vec<String>,
    admissions: AdmissionCounter,
    on_open: Option<StageHook<R>>,
    on_close: Option<StageHook<R>>,
}

impl<R: Resource> ManagerBuilder<R> {
    /// Set the priority against sibling managers.
    #[must_use]
    pub const fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Exclude stages by name.
    #[must_use]
    pub fn exclude<S: Into<String>>(mut self, stages: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(stages.into_iter().map(Into::into));
        self
    }

    /// Set the admission budgets.
    #[must_use]
    pub fn admissions(mut self, admissions: AdmissionCounter) -> Self {
        self.admissions = admissions;
        self
    }

    /// Apply priority, exclusions, and budgets from configuration.
    #[must_use]
    pub fn configure(self, config: &ManagerConfig, ticks_per_second: u32) -> Self {
        self.priority(config.priority)
            .exclude(config.exclude_stages.iter().cloned())
            .admissions(AdmissionCounter::new(
                config.max_per_tick,
                config.max_per_second,
                ticks_per_second,
            ))
    }

    /// Run `hook` every time the manager opens.
    #[must_use]
    pub fn on_open(mut self, hook: impl FnMut(&mut R, Stage) + Send + 'static) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Run `hook` every time the manager closes.
    #[must_use]
    pub fn on_close(mut self, hook: impl FnMut(&mut R, Stage) + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Resolve stage names against `schedule` and build the manager.
    ///
    /// Excluded names that are not part of the schedule are ignored so that
    /// one configuration can serve schedules of different shapes.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NeverOpens`] if every stage is excluded.
    pub fn build(self, schedule: &StageSchedule) -> Result<Manager<R>, ManagerError> {
        let excluded: StageMask = self
            .exclude
            .iter()
            .filter_map(|name| schedule.stage(name).ok())
            .collect();
        let open_stages = schedule.all().difference(excluded);
        if open_stages.is_empty() {
            return Err(ManagerError::NeverOpens { name: self.name });
        }
        Ok(Manager {
            name: self.name,
            priority: self.priority,
            open_stages,
            resource: self.resource,
            accepting: false,
            current_stage: None,
            active: None,
            queued: None,
            active_this_tick: false,
            admissions: self.admissions,
            on_open: self.on_open,
            on_close: self.on_close,
        })
    }

    /// Like [`build`](Self::build), but every excluded name must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Stage`] for an unknown stage name, or
    /// [`ManagerError::NeverOpens`] if every stage is excluded.
    pub fn build_strict(self, schedule: &StageSchedule) -> Result<Manager<R>, ManagerError> {
        if let Err(source) = schedule.mask(self.exclude.as_slice()) {
            return Err(ManagerError::Stage {
                name: self.name,
                source,
            });
        }
        self.build(schedule)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::*;

    /// A dial that can be turned to any non-negative value.
    #[derive(Debug, Default)]
    struct Dial {
        value: i32,
        applied: Vec<i32>,
        release_when_matched: bool,
    }

    impl Resource for Dial {
        type Payload = i32;

        fn apply(&mut self, _stage: Stage, request: &mut Request<i32>) -> Admission {
            let target = *request.payload();
            if target < 0 {
                return Admission::Declined;
            }
            self.value = target;
            self.applied.push(target);
            Admission::Accepted
        }

        fn is_done(&self, request: &Request<i32>) -> bool {
            self.value == *request.payload()
        }

        fn end_tick(&mut self, active: Option<&mut Request<i32>>) -> Retention {
            match active {
                Some(request) if self.release_when_matched && request.age().matched_ticks > 0 => {
                    Retention::Release
                }
                _ => Retention::Keep,
            }
        }
    }

    fn schedule() -> StageSchedule {
        StageSchedule::new(["a", "b", "c", "end"]).unwrap()
    }

    fn manager(schedule: &StageSchedule) -> Manager<Dial> {
        Manager::builder("dial", Dial::default())
            .build(schedule)
            .unwrap()
    }

    fn stage(schedule: &StageSchedule, name: &str) -> Stage {
        schedule.stage(name).unwrap()
    }

    /// Drive `manager` through one full tick, calling `during` inside every
    /// stage it opens for.
    fn run_tick(
        schedule: &StageSchedule,
        manager: &mut Manager<Dial>,
        mut during: impl FnMut(Stage, &mut Manager<Dial>),
    ) {
        for stage in schedule.stages() {
            manager.open(stage);
            during(stage, manager);
            manager.close(stage);
        }
        manager.end_tick();
    }

    #[test]
    fn applies_immediately_while_accepting() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        manager.open(stage(&schedule, "a"));

        let id = Request::new(OwnerId::new(), 7).submit(&mut manager);

        assert!(manager.is_done(id));
        assert_eq!(manager.status(id), RequestStatus::Active);
        assert!(manager.active_this_tick());
        assert!(!manager.active().unwrap().is_fresh());
    }

    #[test]
    fn queued_until_allowed_stage_opens() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        let c = stage(&schedule, "c");
        manager.open(stage(&schedule, "a"));

        let id = Request::new(OwnerId::new(), 3)
            .in_stage(c)
            .submit(&mut manager);
        assert_eq!(manager.status(id), RequestStatus::Queued);
        assert_eq!(manager.resource().value, 0);

        manager.close(stage(&schedule, "a"));
        manager.open(stage(&schedule, "b"));
        assert_eq!(manager.status(id), RequestStatus::Queued);
        manager.close(stage(&schedule, "b"));

        manager.open(c);
        assert!(manager.is_done(id));
    }

    #[test]
    fn urgent_request_is_never_queued() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        manager.open(stage(&schedule, "a"));

        let id = Request::new(OwnerId::new(), 3)
            .in_stage(stage(&schedule, "c"))
            .urgent(true)
            .submit(&mut manager);
        assert_eq!(manager.status(id), RequestStatus::Unknown);
    }

    #[test]
    fn request_without_remaining_stage_is_dropped() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        manager.open(stage(&schedule, "c"));

        let id = Request::new(OwnerId::new(), 3)
            .in_stage(stage(&schedule, "a"))
            .submit(&mut manager);
        assert_eq!(manager.status(id), RequestStatus::Unknown);
    }

    #[test]
    fn request_between_ticks_queues_for_any_open_stage() {
        let schedule = schedule();
        let mut manager = manager(&schedule);

        let id = Request::new(OwnerId::new(), 4).submit(&mut manager);
        assert_eq!(manager.status(id), RequestStatus::Queued);
        manager.open(stage(&schedule, "a"));
        assert!(manager.is_done(id));
    }

    #[test]
    fn queued_request_from_other_owner_blocks_everyone() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        let c = stage(&schedule, "c");
        manager.open(stage(&schedule, "a"));

        let queued = Request::new(OwnerId::new(), 1)
            .in_stage(c)
            .submit(&mut manager);
        let blocked = Request::new(OwnerId::new(), 2).submit(&mut manager);
        let urgent = Request::new(OwnerId::new(), 2)
            .urgent(true)
            .submit(&mut manager);

        assert_eq!(manager.status(queued), RequestStatus::Queued);
        assert_eq!(manager.status(blocked), RequestStatus::Unknown);
        assert_eq!(manager.status(urgent), RequestStatus::Unknown);
        assert_eq!(manager.resource().value, 0);
    }

    #[test]
    fn same_owner_supersedes_its_queued_request() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        let owner = OwnerId::new();
        manager.open(stage(&schedule, "a"));

        let first = Request::new(owner, 1)
            .in_stage(stage(&schedule, "c"))
            .submit(&mut manager);
        let second = Request::new(owner, 2).submit(&mut manager);

        assert_eq!(manager.status(first), RequestStatus::Unknown);
        assert!(manager.is_done(second));
        assert!(manager.queued().is_none());
    }

    #[test]
    fn hold_protects_against_other_owners() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        let holder = OwnerId::new();
        manager.open(stage(&schedule, "a"));

        let held = Request::new(holder, 1).hold_for(2).submit(&mut manager);
        let rival = Request::new(OwnerId::new(), 2).submit(&mut manager);
        assert!(manager.is_done(held));
        assert_eq!(manager.status(rival), RequestStatus::Unknown);

        let replaced = Request::new(holder, 5).submit(&mut manager);
        assert!(manager.is_done(replaced));
    }

    #[test]
    fn hold_elapses_after_enough_ticks() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        let a = stage(&schedule, "a");
        let mut held = None;
        run_tick(&schedule, &mut manager, |stage, m| {
            if stage == a {
                held = Some(Request::new(OwnerId::new(), 1).hold_for(1).submit(m));
            }
        });
        assert_eq!(manager.active().unwrap().age().held_ticks, 1);

        manager.open(a);
        let rival = Request::new(OwnerId::new(), 9).submit(&mut manager);
        assert!(manager.is_done(rival));
        assert_eq!(manager.status(held.unwrap()), RequestStatus::Unknown);
    }

    #[test]
    fn queued_request_dropped_at_end_of_tick() {
        let schedule = StageSchedule::new(["a", "b"]).unwrap();
        let mut manager = Manager::builder("dial", Dial::default())
            .exclude(["b"])
            .build(&schedule)
            .unwrap();
        let b = stage(&schedule, "b");

        assert!(!manager.open(b));
        let id = Request::new(OwnerId::new(), 1).submit(&mut manager);
        assert_eq!(manager.status(id), RequestStatus::Unknown);

        manager.open(stage(&schedule, "a"));
        manager.close(stage(&schedule, "a"));
        let late = Request::new(OwnerId::new(), 1).submit(&mut manager);
        assert_eq!(manager.status(late), RequestStatus::Unknown);

        let mut manager = Manager::builder("dial", Dial::default())
            .build(&schedule)
            .unwrap();
        manager.open(stage(&schedule, "a"));
        manager.close(stage(&schedule, "a"));
        let queued = Request::new(OwnerId::new(), 1).submit(&mut manager);
        assert_eq!(manager.status(queued), RequestStatus::Queued);
        manager.end_tick();
        assert_eq!(manager.status(queued), RequestStatus::Unknown);
    }

    #[test]
    fn declined_request_leaves_active_untouched() {
        let schedule = schedule();
        let mut manager = manager(&schedule);
        let owner = OwnerId::new();
        manager.open(stage(&schedule, "a"));

        let good = Request::new(owner, 4).submit(&mut manager);
        let bad = Request::new(owner, -1).submit(&mut manager);

        assert!(manager.is_done(good));
        assert_eq!(manager.status(bad), RequestStatus::Unknown);
    }

    #[test]
    fn resource_releases_matched_request() {
        let schedule = schedule();
        let mut manager = Manager::builder(
            "dial",
            Dial {
                release_when_matched: true,
                ..Dial::default()
            },
        )
        .build(&schedule)
        .unwrap();
        let a = stage(&schedule, "a");

        run_tick(&schedule, &mut manager, |stage, m| {
            if stage == a {
                Request::new(OwnerId::new(), 2).submit(m);
            }
        });
        assert!(manager.active().is_none());
        assert_eq!(manager.resource().value, 2);
    }

    #[test]
    fn per_tick_budget_limits_admissions() {
        let schedule = schedule();
        let mut manager = Manager::builder("dial", Dial::default())
            .admissions(AdmissionCounter::new(1, 0, 20))
            .build(&schedule)
            .unwrap();
        let owner = OwnerId::new();
        let a = stage(&schedule, "a");

        run_tick(&schedule, &mut manager, |stage, m| {
            if stage == a {
                m.request(Request::new(owner, 1), false);
                m.request(Request::new(owner, 2), false);
            }
        });
        assert_eq!(manager.resource().applied, vec![1]);

        manager.open(a);
        manager.request(Request::new(owner, 3), false);
        assert_eq!(manager.resource().applied, vec![1, 3]);
    }

    #[test]
    fn per_second_budget_spans_ticks() {
        let mut counter = AdmissionCounter::new(0, 2, 4);
        counter.record();
        counter.end_tick();
        counter.record();
        assert!(!counter.has_budget());
        counter.end_tick();
        counter.end_tick();
        counter.end_tick();
        assert!(counter.has_budget());
        assert_eq!(counter.this_second(), 1);
    }

    #[test]
    fn excluded_stage_does_not_open() {
        let schedule = schedule();
        let mut manager = Manager::builder("dial", Dial::default())
            .exclude(["b", "not-a-stage"])
            .build(&schedule)
            .unwrap();

        assert!(manager.open(stage(&schedule, "a")));
        manager.close(stage(&schedule, "a"));
        assert!(!manager.open(stage(&schedule, "b")));
        assert!(!manager.is_accepting());
    }

    #[test]
    fn strict_build_rejects_unknown_stage() {
        let result = Manager::builder("dial", Dial::default())
            .exclude(["nope"])
            .build_strict(&schedule());
        assert!(matches!(result, Err(ManagerError::Stage { .. })));
    }

    #[test]
    fn excluding_everything_is_an_error() {
        let result = Manager::builder("dial", Dial::default())
            .exclude(["a", "b", "c", "end"])
            .build(&schedule());
        assert!(matches!(result, Err(ManagerError::NeverOpens { .. })));
    }

    #[test]
    fn open_hook_sees_queued_request_applied() {
        let schedule = schedule();
        let seen = Arc::new(AtomicI32::new(-1));
        let seen_in_hook = Arc::clone(&seen);
        let mut manager = Manager::builder("dial", Dial::default())
            .on_open(move |dial, _| seen_in_hook.store(dial.value, Ordering::SeqCst))
            .build(&schedule)
            .unwrap();

        Request::new(OwnerId::new(), 6).submit(&mut manager);
        manager.open(stage(&schedule, "a"));
        assert_eq!(seen.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn configure_reads_manager_section() {
        let config = ManagerConfig {
            priority: 9,
            exclude_stages: vec!["c".into()],
            max_per_tick: 0,
            max_per_second: 0,
        };
        let manager = Manager::builder("dial", Dial::default())
            .configure(&config, 20)
            .build(&schedule())
            .unwrap();
        assert_eq!(manager.priority(), 9);
        assert_eq!(manager.open_stages().len(), 3);
    }
}
