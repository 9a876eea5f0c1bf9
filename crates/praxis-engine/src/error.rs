//! Error types for the Praxis engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during engine startup and the build run.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: praxis_core::config::ConfigError,
    },

    /// The stage schedule could not be built.
    #[error("schedule error: {source}")]
    Schedule {
        /// The underlying schedule error.
        #[from]
        source: praxis_core::clock::ScheduleError,
    },

    /// A manager could not be built.
    #[error("manager error: {source}")]
    Manager {
        /// The underlying manager error.
        #[from]
        source: praxis_core::manager::ManagerError,
    },

    /// The task forest refused an operation.
    #[error("task error: {source}")]
    Task {
        /// The underlying task error.
        #[from]
        source: praxis_core::task::TaskError,
    },

    /// The tick runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: praxis_core::runner::RunnerError,
    },

    /// The build ended with a failure report.
    #[error("build failed: {message}")]
    Build {
        /// The rendered failure report.
        message: String,
    },
}
