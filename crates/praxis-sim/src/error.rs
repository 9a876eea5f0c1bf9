//! Error types for the praxis-sim crate.
//!
//! A simulation that finds nothing to do is not an error: misses and
//! refusals are reported as typed [`SimResult`](crate::result::SimResult)s.
//! Errors here only cover a pass that could not be carried out.

/// Errors that can occur while running a simulation pass.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A simulation unit panicked or was aborted before it finished.
    ///
    /// Reported after every other unit of the pass has been joined.
    #[error("simulation unit failed: {message}")]
    UnitFailed {
        /// The panic message, or a description of the abort.
        message: String,
    },

    /// The pass could not be driven on the supplied runtime.
    #[error("simulation runtime error: {message}")]
    Runtime {
        /// What went wrong.
        message: String,
    },
}
