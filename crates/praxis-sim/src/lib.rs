//! Read-only simulation of block breaks and placements for Praxis.
//!
//! Given a viewpoint and a set of positions with target states, the
//! simulator works out every way (and every reason not) to bring each
//! position to its target: which face to aim at, from which rotation, with
//! which hotbar slot, and what the world would look like afterwards. It
//! never changes the world; acting on the best result is up to the caller.
//!
//! # Modules
//!
//! - [`world`] -- [`WorldView`], the read-only queries a simulation needs.
//! - [`grid`] -- [`GridWorld`], an in-memory world for hosts and tests.
//! - [`check`] -- Checks that settle a position before any strategy.
//! - [`process`] -- Placement pre-processing of block properties.
//! - [`scan`] -- Aim point scanning over block shapes.
//! - [`select`] -- Choosing one aim point out of many.
//! - [`strategy`] -- The break and interact strategies.
//! - [`dependency`] -- Nested simulations for prerequisite changes.
//! - [`result`] -- [`SimResult`] and its ranking.
//! - [`simulator`] -- [`Simulator`] and the concurrent pass.
//! - [`error`] -- [`SimError`].
//!
//! [`WorldView`]: world::WorldView
//! [`GridWorld`]: grid::GridWorld
//! [`SimResult`]: result::SimResult
//! [`Simulator`]: simulator::Simulator
//! [`SimError`]: error::SimError

pub mod check;
pub mod dependency;
pub mod error;
pub mod grid;
pub mod process;
pub mod result;
pub mod scan;
pub mod select;
pub mod simulator;
pub mod strategy;
pub mod world;

pub use error::SimError;
pub use result::{Rank, SimResult};
pub use simulator::{ResultSink, Simulator};
pub use world::{Viewpoint, WorldView};
