//! Stage clock, request arbitration, task continuations, and the tick runner
//! for Praxis.
//!
//! A host emits the same ordered sequence of stages once per tick. This
//! crate turns that sequence into windows in which shared resources may be
//! changed, arbitrates which behavior gets to change each one, and runs
//! long-lived behaviors as trees of suspendable tasks.
//!
//! # Modules
//!
//! - [`clock`] -- Stage schedule and the clock that walks it.
//! - [`config`] -- Configuration loading from `praxis-config.yaml` into
//!   strongly-typed structs.
//! - [`priority`] -- Slot ordering of manager openings and closings.
//! - [`request`] -- [`Request`], a described change to one resource.
//! - [`manager`] -- [`Manager`], the stage-gated arbiter of one [`Resource`].
//! - [`tick`] -- [`TickDriver`], which dispatches every stage to a host.
//! - [`task`] -- [`TaskForest`], the tree of suspendable work.
//! - [`control`] -- Shared pause/stop/speed state for the runner.
//! - [`runner`] -- The async tick loop.
//!
//! [`Request`]: request::Request
//! [`Manager`]: manager::Manager
//! [`Resource`]: manager::Resource
//! [`TickDriver`]: tick::TickDriver
//! [`TaskForest`]: task::TaskForest

pub mod clock;
pub mod config;
pub mod control;
pub mod manager;
pub mod priority;
pub mod request;
pub mod runner;
pub mod task;
pub mod tick;
