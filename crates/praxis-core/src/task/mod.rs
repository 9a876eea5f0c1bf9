//! Hierarchical, suspendable units of work.
//!
//! Tasks live in a [`TaskForest`] under a single root. A task started with
//! [`TaskForest::execute`] becomes a child of its owner and, by default,
//! pauses the owner until it finishes. Completion resolves at most one
//! continuation (attached with [`TaskForest::then`] or
//! [`TaskForest::then_or_none`]) as a new child of the same owner; failure
//! marks every ancestor up to the root as failed and produces exactly one
//! [`FailureReport`].
//!
//! # Lifecycle
//!
//! ```text
//! Init --execute--> Running <--> Paused
//!                      |
//!                      +--> Completed | Failed | Cancelled
//! ```
//!
//! Only `Running` tasks are polled. `Init` and `Paused` tasks are muted.

mod forest;
mod render;

use std::any::Any;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use praxis_types::ReportId;
use serde::Serialize;

use crate::clock::StagePosition;

pub use forest::TaskForest;

/// Errors produced by the task forest or by task hooks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// A task was asked to execute under itself.
    #[error("task {name} cannot be its own parent")]
    SelfParent {
        /// Name of the offending task.
        name: String,
    },

    /// A task was executed twice.
    #[error("task {name} was already started")]
    AlreadyStarted {
        /// Name of the offending task.
        name: String,
    },

    /// The task is a continuation placeholder that has not been generated
    /// yet.
    #[error("task {name} is a pending continuation and cannot be started directly")]
    Deferred {
        /// Name of the placeholder.
        name: String,
    },

    /// The handle refers to a task that no longer exists.
    #[error("unknown task {id}")]
    UnknownTask {
        /// The stale id.
        id: TaskId,
    },

    /// The task is not running or paused.
    #[error("task {name} is {state}, not live")]
    NotLive {
        /// Name of the task.
        name: String,
        /// Its current state.
        state: TaskState,
    },

    /// A second continuation was attached.
    #[error("task {name} already has a {kind} continuation")]
    ContinuationAlreadyAttached {
        /// Name of the task.
        name: String,
        /// Kind of the continuation already attached: `then` or
        /// `then_or_none`.
        kind: &'static str,
    },

    /// A second finalizer was attached.
    #[error("task {name} already has a finalizer")]
    FinalizerAlreadyAttached {
        /// Name of the task.
        name: String,
    },

    /// A task's output did not have the type its continuation expected.
    #[error("task {name} produced an output of an unexpected type")]
    ResultTypeMismatch {
        /// Name of the task.
        name: String,
    },

    /// A task hook failed.
    #[error("{message}")]
    Failed {
        /// Human-readable reason.
        message: String,
    },
}

impl TaskError {
    /// A hook failure with `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created but not started.
    Init,
    /// Started and polled every stage.
    Running,
    /// Waiting for pause-requesting children.
    Paused,
    /// Cancelled by a caller or by an ancestor's failure.
    Cancelled,
    /// Failed, directly or through a descendant.
    Failed,
    /// Finished successfully.
    Completed,
}

impl TaskState {
    /// Running or paused.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Completed, failed, or cancelled.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Generational index of a task in a [`TaskForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    index: usize,
    generation: u32,
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}.{}", self.index, self.generation)
    }
}

/// Typed handle to a task whose output is `T`.
pub struct TaskHandle<T> {
    id: TaskId,
    _output: PhantomData<fn() -> T>,
}

impl<T> TaskHandle<T> {
    const fn new(id: TaskId) -> Self {
        Self {
            id,
            _output: PhantomData,
        }
    }

    /// The untyped id.
    pub const fn id(&self) -> TaskId {
        self.id
    }
}

#[allow(clippy::expl_impl_clone_on_copy)]
impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TaskHandle<T> {}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TaskHandle").field(&self.id).finish()
    }
}

impl<T> From<TaskHandle<T>> for TaskId {
    fn from(handle: TaskHandle<T>) -> Self {
        handle.id
    }
}

/// Outcome of polling a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Keep running.
    Pending,
    /// Finished with a result.
    Done(T),
}

/// Context handed to task hooks.
pub struct TaskCx<'a, C> {
    forest: &'a mut TaskForest<C>,
    env: &'a mut C,
    me: TaskId,
    position: Option<StagePosition>,
}

impl<C: 'static> TaskCx<'_, C> {
    /// The host environment.
    pub const fn env(&mut self) -> &mut C {
        self.env
    }

    /// The forest, for inspecting other tasks.
    pub const fn forest(&mut self) -> &mut TaskForest<C> {
        self.forest
    }

    /// Id of the task being run.
    pub const fn me(&self) -> TaskId {
        self.me
    }

    /// Stage in progress, `None` outside the stage loop.
    pub const fn position(&self) -> Option<StagePosition> {
        self.position
    }

    /// Spawn `task` and execute it as a child of the running task.
    ///
    /// # Errors
    ///
    /// Propagates [`TaskForest::execute`] errors.
    pub fn spawn_child<T: Task<C>>(
        &mut self,
        task: T,
        pause_parent: bool,
    ) -> Result<TaskHandle<T::Output>, TaskError> {
        let handle = self.forest.spawn(task);
        self.forest
            .execute_at(handle.id(), self.me, pause_parent, self.env, self.position)?;
        Ok(handle)
    }
}

/// A suspendable unit of work in environment `C`.
pub trait Task<C>: 'static {
    /// Result produced on success.
    type Output: 'static;

    /// Name shown in renders and failure reports.
    fn name(&self) -> String {
        short_type_name::<Self>().to_owned()
    }

    /// Called once when the task is executed.
    ///
    /// # Errors
    ///
    /// An error fails the task.
    fn on_start(&mut self, cx: &mut TaskCx<'_, C>) -> Result<Step<Self::Output>, TaskError> {
        let _ = cx;
        Ok(Step::Pending)
    }

    /// Called once per stage while the task is running.
    ///
    /// # Errors
    ///
    /// An error fails the task.
    fn on_stage(&mut self, cx: &mut TaskCx<'_, C>) -> Result<Step<Self::Output>, TaskError>;

    /// Called when the task is cancelled, before its children.
    fn on_cancel(&mut self, env: &mut C) {
        let _ = env;
    }
}

/// Object-safe form of [`Task`] stored in the forest.
trait ErasedTask<C> {
    fn name(&self) -> String;
    fn on_start(&mut self, cx: &mut TaskCx<'_, C>) -> Result<Option<Box<dyn Any>>, TaskError>;
    fn on_stage(&mut self, cx: &mut TaskCx<'_, C>) -> Result<Option<Box<dyn Any>>, TaskError>;
    fn on_cancel(&mut self, env: &mut C);
}

impl<C, T: Task<C>> ErasedTask<C> for T {
    fn name(&self) -> String {
        Task::name(self)
    }

    fn on_start(&mut self, cx: &mut TaskCx<'_, C>) -> Result<Option<Box<dyn Any>>, TaskError> {
        Task::on_start(self, cx).map(erase_step)
    }

    fn on_stage(&mut self, cx: &mut TaskCx<'_, C>) -> Result<Option<Box<dyn Any>>, TaskError> {
        Task::on_stage(self, cx).map(erase_step)
    }

    fn on_cancel(&mut self, env: &mut C) {
        Task::on_cancel(self, env);
    }
}

fn erase_step<T: 'static>(step: Step<T>) -> Option<Box<dyn Any>> {
    match step {
        Step::Pending => None,
        Step::Done(output) => Some(Box::new(output)),
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// One failure, bubbled to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Unique id of the report.
    pub id: ReportId,
    /// Names of the failed tasks, innermost first.
    pub path: Vec<String>,
    /// The failure message.
    pub message: String,
    /// When the failure reached the root.
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for FailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.join(" <- "), self.message)
    }
}
