//! The tasks a build is made of.
//!
//! - [`build`] -- simulates the remaining targets and acts on the best
//!   result, one child task at a time.
//! - [`act`] -- aims, selects the slot, and carries out one interaction.
//! - [`fetch`] -- moves a stored item into the hotbar.
//! - [`approach`] -- walks the player towards or away from a position.
//! - [`verify`] -- checks every target once the build reports done.

pub mod act;
pub mod approach;
pub mod build;
pub mod fetch;
pub mod verify;

pub use act::ActTask;
pub use approach::ApproachTask;
pub use build::{BuildReport, BuildTask};
pub use fetch::FetchTask;
pub use verify::VerifyTask;

use praxis_core::manager::{Manager, RequestStatus, Resource};
use praxis_core::request::Request;
use praxis_types::RequestId;

/// Follows one request through a manager until the resource satisfies it.
///
/// While the request is active or queued it is left alone. Once the
/// manager has dropped it, a fresh one is submitted.
#[derive(Debug, Default)]
pub(crate) struct Pursuit {
    id: Option<RequestId>,
}

impl Pursuit {
    /// Whether the pursued request is done, submitting it again if the
    /// manager no longer knows it.
    pub(crate) fn drive<R: Resource>(
        &mut self,
        manager: &mut Manager<R>,
        make: impl FnOnce() -> Request<R::Payload>,
    ) -> bool {
        if let Some(id) = self.id {
            if manager.is_done(id) {
                return true;
            }
            if manager.status(id) != RequestStatus::Unknown {
                return false;
            }
        }
        let id = manager.request(make(), true);
        self.id = Some(id);
        manager.is_done(id)
    }
}
