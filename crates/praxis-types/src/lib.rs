//! Shared value types for Praxis.
//!
//! Every crate in the workspace speaks in these types: requests and their
//! owners are identified by typed ids, managers and tasks are scheduled by
//! [`Stage`], and the simulation engine reasons about [`BlockPos`],
//! [`Aabb`], and [`BlockState`].
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for requests, owners, and reports
//! - [`stage`] -- Tick sub-phases and stage sets
//! - [`geometry`] -- Vectors, block positions, faces, boxes, and rotations
//! - [`block`] -- Block states, items, and build targets

pub mod block;
pub mod geometry;
pub mod ids;
pub mod stage;

pub use block::{AIR, BlockState, Hardness, Item, TargetState};
pub use geometry::{Aabb, Axis, BlockPos, Direction, Rotation, Vec3, wrap_degrees};
pub use ids::{OwnerId, ReportId, RequestId};
pub use stage::{MAX_STAGES, Stage, StageMask};
