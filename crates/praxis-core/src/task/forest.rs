//! The task arena and its success/failure/cancel processing.

use std::any::Any;
use std::collections::VecDeque;

use chrono::Utc;
use praxis_types::ReportId;
use tracing::{debug, error, trace};

use super::{ErasedTask, FailureReport, Task, TaskCx, TaskError, TaskHandle, TaskId, TaskState};
use crate::clock::StagePosition;
use crate::config::TaskConfig;

/// Builds a continuation's task from the completed task's output.
type Generator<C> =
    Box<dyn FnOnce(&dyn Any) -> Result<Option<Box<dyn ErasedTask<C>>>, TaskError>>;

/// Observes a completed task's output.
type Finalizer = Box<dyn FnOnce(&dyn Any)>;

/// Receives every failure report.
type FailureSink = Box<dyn FnMut(&FailureReport)>;

struct Continuation<C> {
    /// Placeholder that receives the generated task.
    target: TaskId,
    /// `then` or `then_or_none`.
    kind: &'static str,
    generate: Generator<C>,
}

pub(super) struct Node<C> {
    pub(super) name: String,
    pub(super) state: TaskState,
    pub(super) parent: Option<TaskId>,
    pub(super) children: Vec<TaskId>,
    /// Whether this task keeps its parent paused while live.
    pauses_parent: bool,
    /// Completed ticks while live.
    pub(super) age: u64,
    /// Placeholder waiting for its continuation to be generated.
    deferred: bool,
    /// Taken out while one of its hooks runs.
    task: Option<Box<dyn ErasedTask<C>>>,
    /// At most one continuation of either kind.
    next: Option<Continuation<C>>,
    finalizer: Option<Finalizer>,
    output: Option<Box<dyn Any>>,
}

impl<C> Node<C> {
    fn new(name: String, task: Option<Box<dyn ErasedTask<C>>>) -> Self {
        Self {
            name,
            state: TaskState::Init,
            parent: None,
            children: Vec::new(),
            pauses_parent: false,
            age: 0,
            deferred: false,
            task,
            next: None,
            finalizer: None,
            output: None,
        }
    }
}

struct Slot<C> {
    generation: u32,
    node: Option<Node<C>>,
}

enum Work {
    Succeed { id: TaskId, output: Box<dyn Any> },
    Fail { id: TaskId, message: String },
}

/// Arena of tasks under a single immortal root.
///
/// Every operation that can complete or fail a task takes the host
/// environment `C`, because completing a task may start its continuation
/// and failing one cancels its live descendants.
pub struct TaskForest<C> {
    slots: Vec<Slot<C>>,
    free: Vec<usize>,
    root: TaskId,
    work: VecDeque<Work>,
    draining: bool,
    failures: Vec<FailureReport>,
    sink: Option<FailureSink>,
    pub(super) show_all_entries: bool,
    pub(super) max_render_entries: usize,
}

impl<C> std::fmt::Debug for TaskForest<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskForest")
            .field("slots", &self.slots.len())
            .field("free", &self.free.len())
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

impl<C: 'static> Default for TaskForest<C> {
    fn default() -> Self {
        Self::new(&TaskConfig::default())
    }
}

impl<C: 'static> TaskForest<C> {
    /// Create a forest holding only the root.
    pub fn new(config: &TaskConfig) -> Self {
        let mut root = Node::new("root".to_owned(), None);
        root.state = TaskState::Running;
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: TaskId {
                index: 0,
                generation: 0,
            },
            work: VecDeque::new(),
            draining: false,
            failures: Vec::new(),
            sink: None,
            show_all_entries: config.show_all_entries,
            max_render_entries: config.max_render_entries,
        }
    }

    /// The root, owner of top-level tasks. It is never paused, failed, or
    /// cancelled.
    pub const fn root(&self) -> TaskId {
        self.root
    }

    /// Deliver every future failure report to `sink`.
    pub fn set_failure_sink(&mut self, sink: impl FnMut(&FailureReport) + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Failure reports so far, oldest first.
    pub fn failures(&self) -> &[FailureReport] {
        &self.failures
    }

    // -----------------------------------------------------------------------
    // Construction and composition
    // -----------------------------------------------------------------------

    /// Insert `task` in the `Init` state.
    pub fn spawn<T: Task<C>>(&mut self, task: T) -> TaskHandle<T::Output> {
        let name = Task::name(&task);
        let id = self.insert(Node::new(name, Some(Box::new(task))));
        TaskHandle::new(id)
    }

    /// Start `handle` as a child of `owner`.
    ///
    /// With `pause_parent` set (and `owner` not the root), the owner stays
    /// paused until this task is no longer live.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SelfParent`], [`TaskError::AlreadyStarted`],
    /// [`TaskError::Deferred`], [`TaskError::UnknownTask`], or
    /// [`TaskError::NotLive`] for a finished owner. A failing start hook is
    /// not an error here; it fails the task.
    pub fn execute<T>(
        &mut self,
        handle: TaskHandle<T>,
        owner: TaskId,
        pause_parent: bool,
        env: &mut C,
    ) -> Result<(), TaskError> {
        self.execute_at(handle.id(), owner, pause_parent, env, None)
    }

    pub(super) fn execute_at(
        &mut self,
        id: TaskId,
        owner: TaskId,
        pause_parent: bool,
        env: &mut C,
        position: Option<StagePosition>,
    ) -> Result<(), TaskError> {
        let node = self.node(id)?;
        if id == owner {
            return Err(TaskError::SelfParent {
                name: node.name.clone(),
            });
        }
        if node.deferred {
            return Err(TaskError::Deferred {
                name: node.name.clone(),
            });
        }
        if node.state != TaskState::Init {
            return Err(TaskError::AlreadyStarted {
                name: node.name.clone(),
            });
        }
        let owner_node = self.node(owner)?;
        if !owner_node.state.is_live() {
            return Err(TaskError::NotLive {
                name: owner_node.name.clone(),
                state: owner_node.state,
            });
        }
        self.start(id, owner, pause_parent, env, position);
        Ok(())
    }

    /// Attach the continuation run when `handle` completes.
    ///
    /// Returns a handle to the continuation, which can itself be given a
    /// continuation or finalizer before it exists.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ContinuationAlreadyAttached`] if `handle` already
    /// has a continuation of either kind.
    pub fn then<T, U, F>(
        &mut self,
        handle: TaskHandle<T>,
        next: F,
    ) -> Result<TaskHandle<U::Output>, TaskError>
    where
        T: 'static,
        U: Task<C>,
        F: FnOnce(&T) -> U + 'static,
    {
        let name = self.node(handle.id())?.name.clone();
        let generate: Generator<C> = Box::new(move |output: &dyn Any| {
            let value = output
                .downcast_ref::<T>()
                .ok_or(TaskError::ResultTypeMismatch { name })?;
            let task: Box<dyn ErasedTask<C>> = Box::new(next(value));
            Ok(Some(task))
        });
        self.attach(handle.id(), false, generate).map(TaskHandle::new)
    }

    /// Attach a continuation that may decline to run.
    ///
    /// When `next` returns `None` the task's finalizer runs instead.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ContinuationAlreadyAttached`] if `handle` already
    /// has a continuation of either kind.
    pub fn then_or_none<T, U, F>(
        &mut self,
        handle: TaskHandle<T>,
        next: F,
    ) -> Result<TaskHandle<U::Output>, TaskError>
    where
        T: 'static,
        U: Task<C>,
        F: FnOnce(&T) -> Option<U> + 'static,
    {
        let name = self.node(handle.id())?.name.clone();
        let generate: Generator<C> = Box::new(move |output: &dyn Any| {
            let value = output
                .downcast_ref::<T>()
                .ok_or(TaskError::ResultTypeMismatch { name })?;
            Ok(next(value).map(|task| Box::new(task) as Box<dyn ErasedTask<C>>))
        });
        self.attach(handle.id(), true, generate).map(TaskHandle::new)
    }

    /// Attach the finalizer run when `handle` completes without a
    /// continuation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::FinalizerAlreadyAttached`] on a second attach.
    pub fn finally<T, F>(&mut self, handle: TaskHandle<T>, finalizer: F) -> Result<(), TaskError>
    where
        T: 'static,
        F: FnOnce(&T) + 'static,
    {
        let node = self.node_mut(handle.id())?;
        if node.finalizer.is_some() {
            return Err(TaskError::FinalizerAlreadyAttached {
                name: node.name.clone(),
            });
        }
        node.finalizer = Some(Box::new(move |output: &dyn Any| {
            if let Some(value) = output.downcast_ref::<T>() {
                finalizer(value);
            }
        }));
        Ok(())
    }

    fn attach(
        &mut self,
        id: TaskId,
        or_none: bool,
        generate: Generator<C>,
    ) -> Result<TaskId, TaskError> {
        let node = self.node(id)?;
        if let Some(existing) = &node.next {
            return Err(TaskError::ContinuationAlreadyAttached {
                name: node.name.clone(),
                kind: existing.kind,
            });
        }
        let kind = if or_none { "then_or_none" } else { "then" };
        if node.state.is_terminal() {
            return Err(TaskError::NotLive {
                name: node.name.clone(),
                state: node.state,
            });
        }
        let mut placeholder = Node::new(format!("{}.{kind}", node.name), None);
        placeholder.deferred = true;
        let target = self.insert(placeholder);
        self.node_mut(id)?.next = Some(Continuation {
            target,
            kind,
            generate,
        });
        Ok(target)
    }

    // -----------------------------------------------------------------------
    // Outcomes
    // -----------------------------------------------------------------------

    /// Complete a live task from outside its hooks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale handle or
    /// [`TaskError::NotLive`] if the task is not running or paused.
    pub fn complete<T: 'static>(
        &mut self,
        handle: TaskHandle<T>,
        output: T,
        env: &mut C,
    ) -> Result<(), TaskError> {
        let id = handle.id();
        self.require_live(id)?;
        self.work.push_back(Work::Succeed {
            id,
            output: Box::new(output),
        });
        self.drain(env);
        Ok(())
    }

    /// Fail a task from outside its hooks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn fail(
        &mut self,
        id: TaskId,
        message: impl Into<String>,
        env: &mut C,
    ) -> Result<(), TaskError> {
        self.node(id)?;
        self.work.push_back(Work::Fail {
            id,
            message: message.into(),
        });
        self.drain(env);
        Ok(())
    }

    /// Cancel `id` and its live subtree.
    ///
    /// Descendants are cancelled, hooks included, before their ancestors.
    /// Completed and cancelled tasks are left untouched. Cancelling the root
    /// cancels its children only.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn cancel(&mut self, id: TaskId, env: &mut C) -> Result<(), TaskError> {
        let parent = self.node(id)?.parent;
        self.cancel_subtree(id, env);
        if let Some(parent) = parent {
            self.reactivate(parent);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stage loop
    // -----------------------------------------------------------------------

    /// Poll every running task once, parents before children.
    ///
    /// Returns the number of tasks polled.
    pub fn on_stage(&mut self, position: StagePosition, env: &mut C) -> usize {
        let mut polled = 0_usize;
        for id in self.running_order() {
            let Ok(node) = self.node_mut(id) else {
                continue;
            };
            if node.state != TaskState::Running {
                continue;
            }
            let Some(mut task) = node.task.take() else {
                continue;
            };
            let outcome = {
                let mut cx = TaskCx {
                    forest: &mut *self,
                    env: &mut *env,
                    me: id,
                    position: Some(position),
                };
                task.on_stage(&mut cx)
            };
            self.restore(id, task);
            self.enqueue_outcome(id, outcome);
            self.drain(env);
            polled = polled.saturating_add(1);
        }
        polled
    }

    /// Age every live task by one tick.
    pub fn advance_tick(&mut self) {
        let root = self.root.index;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if index == root {
                continue;
            }
            if let Some(node) = slot.node.as_mut()
                && node.state.is_live()
            {
                node.age = node.age.saturating_add(1);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Lifecycle state of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn state(&self, id: TaskId) -> Result<TaskState, TaskError> {
        self.node(id).map(|node| node.state)
    }

    /// Ticks `id` has been live.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn age(&self, id: TaskId) -> Result<u64, TaskError> {
        self.node(id).map(|node| node.age)
    }

    /// Name of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn name(&self, id: TaskId) -> Result<&str, TaskError> {
        self.node(id).map(|node| node.name.as_str())
    }

    /// Parent of `id`, `None` for the root and unstarted tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn parent(&self, id: TaskId) -> Result<Option<TaskId>, TaskError> {
        self.node(id).map(|node| node.parent)
    }

    /// Visible children of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a stale id.
    pub fn children(&self, id: TaskId) -> Result<&[TaskId], TaskError> {
        self.node(id).map(|node| node.children.as_slice())
    }

    /// Output of a completed task, until it is pruned.
    pub fn output<T: 'static>(&self, handle: TaskHandle<T>) -> Option<&T> {
        self.node(handle.id())
            .ok()?
            .output
            .as_ref()?
            .downcast_ref::<T>()
    }

    /// Number of tasks reachable from the root, excluding the root and
    /// cancelled branches.
    pub fn size(&self) -> usize {
        let mut count = 0_usize;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.node(id) else {
                continue;
            };
            for child in &node.children {
                if self.node(*child).is_ok_and(|c| c.state != TaskState::Cancelled) {
                    count = count.saturating_add(1);
                    stack.push(*child);
                }
            }
        }
        count
    }

    /// Free every finished task whose subtree is finished.
    ///
    /// Handles to pruned tasks become stale. Returns the number freed.
    pub fn prune(&mut self) -> usize {
        let mut freed = 0_usize;
        loop {
            let batch: Vec<TaskId> = self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| {
                    let node = slot.node.as_ref()?;
                    let id = TaskId {
                        index,
                        generation: slot.generation,
                    };
                    let finished = id != self.root
                        && node.state.is_terminal()
                        && node.children.iter().all(|child| self.node(*child).is_err());
                    finished.then_some(id)
                })
                .collect();
            if batch.is_empty() {
                break;
            }
            for id in batch {
                if let Ok(Some(parent)) = self.parent(id)
                    && let Ok(parent) = self.node_mut(parent)
                {
                    parent.children.retain(|child| *child != id);
                }
                self.remove(id);
                freed = freed.saturating_add(1);
            }
        }
        if freed > 0 {
            debug!(freed, "pruned finished tasks");
        }
        freed
    }

    // -----------------------------------------------------------------------
    // Arena
    // -----------------------------------------------------------------------

    pub(super) fn node(&self, id: TaskId) -> Result<&Node<C>, TaskError> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(TaskError::UnknownTask { id })
    }

    fn node_mut(&mut self, id: TaskId) -> Result<&mut Node<C>, TaskError> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(TaskError::UnknownTask { id })
    }

    fn insert(&mut self, node: Node<C>) -> TaskId {
        if let Some(index) = self.free.pop()
            && let Some(slot) = self.slots.get_mut(index)
        {
            slot.node = Some(node);
            return TaskId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        TaskId {
            index,
            generation: 0,
        }
    }

    fn remove(&mut self, id: TaskId) {
        if let Some(slot) = self.slots.get_mut(id.index)
            && slot.generation == id.generation
        {
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
    }

    fn restore(&mut self, id: TaskId, task: Box<dyn ErasedTask<C>>) {
        if let Ok(node) = self.node_mut(id)
            && node.task.is_none()
        {
            node.task = Some(task);
        }
    }

    fn require_live(&self, id: TaskId) -> Result<(), TaskError> {
        let node = self.node(id)?;
        if node.state.is_live() {
            Ok(())
        } else {
            Err(TaskError::NotLive {
                name: node.name.clone(),
                state: node.state,
            })
        }
    }

    /// Running tasks in depth-first order from the root.
    fn running_order(&self) -> Vec<TaskId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.node(id) else {
                continue;
            };
            if id != self.root && node.state == TaskState::Running {
                order.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    fn start(
        &mut self,
        id: TaskId,
        owner: TaskId,
        pause_parent: bool,
        env: &mut C,
        position: Option<StagePosition>,
    ) {
        let pauses = pause_parent && owner != self.root;
        if let Ok(parent) = self.node_mut(owner) {
            parent.children.push(id);
            if pauses && parent.state == TaskState::Running {
                parent.state = TaskState::Paused;
            }
        }
        let Ok(node) = self.node_mut(id) else {
            return;
        };
        node.parent = Some(owner);
        node.pauses_parent = pauses;
        node.deferred = false;
        node.state = TaskState::Running;
        trace!(task = %node.name, id = %id, pauses, "started");

        if let Some(mut task) = node.task.take() {
            let outcome = {
                let mut cx = TaskCx {
                    forest: &mut *self,
                    env: &mut *env,
                    me: id,
                    position,
                };
                task.on_start(&mut cx)
            };
            self.restore(id, task);
            self.enqueue_outcome(id, outcome);
        }
        self.drain(env);
    }

    fn enqueue_outcome(&mut self, id: TaskId, outcome: Result<Option<Box<dyn Any>>, TaskError>) {
        match outcome {
            Ok(Some(output)) => self.work.push_back(Work::Succeed { id, output }),
            Ok(None) => {}
            Err(err) => self.work.push_back(Work::Fail {
                id,
                message: err.to_string(),
            }),
        }
    }

    /// Process queued outcomes until none remain. Re-entrant calls return
    /// immediately and leave their work to the outer loop.
    fn drain(&mut self, env: &mut C) {
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(work) = self.work.pop_front() {
            match work {
                Work::Succeed { id, output } => self.succeed(id, output, env),
                Work::Fail { id, message } => self.process_failure(id, message, env),
            }
        }
        self.draining = false;
    }

    fn succeed(&mut self, id: TaskId, output: Box<dyn Any>, env: &mut C) {
        let show_all = self.show_all_entries;
        let root = self.root;
        let Ok(node) = self.node_mut(id) else {
            return;
        };
        if !node.state.is_live() {
            debug!(task = %node.name, state = %node.state, "ignoring completion of a task that is not live");
            return;
        }
        node.state = TaskState::Completed;
        let parent = node.parent.unwrap_or(root);
        let pauses = node.pauses_parent;
        let next = node.next.take();
        let finalizer = node.finalizer.take();
        trace!(task = %node.name, id = %id, "completed");

        if !show_all && let Ok(parent) = self.node_mut(parent) {
            parent.children.retain(|child| *child != id);
        }

        let mut continued = false;
        if let Some(continuation) = next {
            let target = continuation.target;
            match (continuation.generate)(&*output) {
                Ok(Some(task)) => {
                    if let Ok(node) = self.node_mut(target) {
                        node.name = task.name();
                        node.task = Some(task);
                    }
                    self.start(target, parent, pauses, env, None);
                    continued = true;
                }
                Ok(None) => self.discard(target),
                Err(err) => {
                    self.start(target, parent, pauses, env, None);
                    self.work.push_back(Work::Fail {
                        id: target,
                        message: err.to_string(),
                    });
                    continued = true;
                }
            }
        }

        if !continued {
            if let Some(finalizer) = finalizer {
                finalizer(&*output);
            }
            self.reactivate(parent);
        }
        if let Ok(node) = self.node_mut(id) {
            node.output = Some(output);
        }
    }

    fn process_failure(&mut self, id: TaskId, message: String, env: &mut C) {
        let Ok(node) = self.node(id) else {
            return;
        };
        if matches!(node.state, TaskState::Completed | TaskState::Cancelled | TaskState::Failed) {
            debug!(task = %node.name, state = %node.state, %message, "ignoring failure of a finished task");
            return;
        }

        let mut path = Vec::new();
        let mut outermost = id;
        let mut current = Some(id);
        while let Some(cursor) = current {
            if cursor == self.root {
                break;
            }
            let Ok(node) = self.node_mut(cursor) else {
                break;
            };
            if node.state == TaskState::Failed {
                break;
            }
            node.state = TaskState::Failed;
            node.finalizer = None;
            let pending = node.next.take();
            path.push(node.name.clone());
            outermost = cursor;
            current = node.parent;
            if let Some(continuation) = pending {
                self.discard(continuation.target);
            }
        }

        self.cancel_subtree(outermost, env);

        let report = FailureReport {
            id: ReportId::new(),
            path,
            message,
            at: Utc::now(),
        };
        error!(
            report_id = %report.id,
            path = %report.path.join(" <- "),
            message = %report.message,
            "task failed"
        );
        if let Some(sink) = self.sink.as_mut() {
            sink(&report);
        }
        self.failures.push(report);
    }

    fn cancel_subtree(&mut self, start: TaskId, env: &mut C) {
        let mut stack = vec![(start, false)];
        while let Some((id, visited)) = stack.pop() {
            if visited {
                if id == self.root {
                    continue;
                }
                let Ok(node) = self.node_mut(id) else {
                    continue;
                };
                if node.state.is_terminal() {
                    continue;
                }
                if let Some(mut task) = node.task.take() {
                    task.on_cancel(env);
                    self.restore(id, task);
                }
                let Ok(node) = self.node_mut(id) else {
                    continue;
                };
                node.state = TaskState::Cancelled;
                node.finalizer = None;
                let pending = node.next.take();
                trace!(task = %node.name, id = %id, "cancelled");
                if let Some(continuation) = pending {
                    self.discard(continuation.target);
                }
                continue;
            }

            let Ok(node) = self.node(id) else {
                continue;
            };
            if matches!(node.state, TaskState::Completed | TaskState::Cancelled) {
                continue;
            }
            let children = node.children.clone();
            stack.push((id, true));
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
    }

    /// Cancel a continuation placeholder that will never be generated, and
    /// every placeholder chained behind it.
    fn discard(&mut self, target: TaskId) {
        let mut pending = vec![target];
        while let Some(id) = pending.pop() {
            let Ok(node) = self.node_mut(id) else {
                continue;
            };
            if node.state != TaskState::Init {
                continue;
            }
            node.state = TaskState::Cancelled;
            node.deferred = false;
            node.finalizer = None;
            pending.extend(node.next.take().map(|c| c.target));
        }
    }

    /// Resume `id` if it is paused and no pause-requesting child is live.
    fn reactivate(&mut self, id: TaskId) {
        let Ok(node) = self.node(id) else {
            return;
        };
        if node.state != TaskState::Paused {
            return;
        }
        let blocked = node.children.iter().any(|child| {
            self.node(*child)
                .is_ok_and(|c| c.pauses_parent && c.state.is_live())
        });
        if blocked {
            return;
        }
        if let Ok(node) = self.node_mut(id) {
            node.state = TaskState::Running;
            trace!(task = %node.name, id = %id, "resumed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use praxis_types::Stage;

    use super::*;
    use crate::task::Step;

    #[derive(Debug, Default)]
    struct Env {
        journal: Vec<String>,
    }

    /// Finishes after `ticks` polls.
    struct Countdown {
        label: &'static str,
        ticks: u32,
    }

    impl Task<Env> for Countdown {
        type Output = u32;

        fn name(&self) -> String {
            self.label.to_owned()
        }

        fn on_stage(&mut self, cx: &mut TaskCx<'_, Env>) -> Result<Step<u32>, TaskError> {
            cx.env().journal.push(format!("poll {}", self.label));
            if self.ticks == 0 {
                return Ok(Step::Done(7));
            }
            self.ticks = self.ticks.saturating_sub(1);
            Ok(Step::Pending)
        }

        fn on_cancel(&mut self, env: &mut Env) {
            env.journal.push(format!("cancel {}", self.label));
        }
    }

    /// Never finishes on its own.
    struct Idle(&'static str);

    impl Task<Env> for Idle {
        type Output = ();

        fn name(&self) -> String {
            self.0.to_owned()
        }

        fn on_stage(&mut self, _cx: &mut TaskCx<'_, Env>) -> Result<Step<()>, TaskError> {
            Ok(Step::Pending)
        }

        fn on_cancel(&mut self, env: &mut Env) {
            env.journal.push(format!("cancel {}", self.0));
        }
    }

    /// Finishes as soon as it starts.
    struct Instant(u64);

    impl Task<Env> for Instant {
        type Output = u64;

        fn on_start(&mut self, _cx: &mut TaskCx<'_, Env>) -> Result<Step<u64>, TaskError> {
            Ok(Step::Done(self.0))
        }

        fn on_stage(&mut self, _cx: &mut TaskCx<'_, Env>) -> Result<Step<u64>, TaskError> {
            Ok(Step::Pending)
        }
    }

    /// Fails when started.
    struct Broken;

    impl Task<Env> for Broken {
        type Output = ();

        fn on_start(&mut self, _cx: &mut TaskCx<'_, Env>) -> Result<Step<()>, TaskError> {
            Err(TaskError::failed("no path to target"))
        }

        fn on_stage(&mut self, _cx: &mut TaskCx<'_, Env>) -> Result<Step<()>, TaskError> {
            Ok(Step::Pending)
        }
    }

    /// Spawns a pausing child on start and finishes when resumed.
    struct Supervisor;

    impl Task<Env> for Supervisor {
        type Output = &'static str;

        fn on_start(&mut self, cx: &mut TaskCx<'_, Env>) -> Result<Step<&'static str>, TaskError> {
            cx.spawn_child(
                Countdown {
                    label: "worker",
                    ticks: 1,
                },
                true,
            )?;
            Ok(Step::Pending)
        }

        fn on_stage(&mut self, _cx: &mut TaskCx<'_, Env>) -> Result<Step<&'static str>, TaskError> {
            Ok(Step::Done("supervised"))
        }
    }

    fn position() -> StagePosition {
        StagePosition {
            tick: 1,
            stage: Stage::from_index(0).unwrap(),
        }
    }

    fn forest() -> TaskForest<Env> {
        TaskForest::default()
    }

    #[test]
    fn pausing_child_blocks_owner_until_it_completes() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();

        let supervisor = forest.spawn(Supervisor);
        forest.execute(supervisor, root, true, &mut env).unwrap();
        assert_eq!(forest.state(supervisor.id()).unwrap(), TaskState::Paused);

        forest.on_stage(position(), &mut env);
        assert_eq!(forest.state(supervisor.id()).unwrap(), TaskState::Paused);

        forest.on_stage(position(), &mut env);
        assert_eq!(forest.state(supervisor.id()).unwrap(), TaskState::Running);

        forest.on_stage(position(), &mut env);
        assert_eq!(forest.state(supervisor.id()).unwrap(), TaskState::Completed);
        assert_eq!(forest.output(supervisor), Some(&"supervised"));
        assert_eq!(env.journal, vec!["poll worker", "poll worker"]);
    }

    #[test]
    fn root_owner_is_never_paused() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let task = forest.spawn(Idle("idle"));
        forest.execute(task, root, true, &mut env).unwrap();
        assert_eq!(forest.state(root).unwrap(), TaskState::Running);
    }

    #[test]
    fn execute_rejects_self_parent_and_restart() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let task = forest.spawn(Idle("idle"));

        let err = forest.execute(task, task.id(), true, &mut env).unwrap_err();
        assert!(matches!(err, TaskError::SelfParent { .. }));

        forest.execute(task, root, true, &mut env).unwrap();
        let err = forest.execute(task, root, true, &mut env).unwrap_err();
        assert!(matches!(err, TaskError::AlreadyStarted { .. }));
    }

    #[test]
    fn second_continuation_of_same_kind_fails_loudly() {
        let mut forest = forest();
        let task = forest.spawn(Instant(1));

        forest.then(task, |n: &u64| Instant(n + 1)).unwrap();
        let err = forest.then(task, |n: &u64| Instant(n + 2)).unwrap_err();
        assert!(matches!(
            err,
            TaskError::ContinuationAlreadyAttached { kind: "then", .. }
        ));

        forest.finally(task, |_: &u64| {}).unwrap();
        let err = forest.finally(task, |_: &u64| {}).unwrap_err();
        assert!(matches!(err, TaskError::FinalizerAlreadyAttached { .. }));
    }

    #[test]
    fn continuation_runs_under_same_owner_and_keeps_it_paused() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();

        let owner = forest.spawn(Idle("owner"));
        forest.execute(owner, root, false, &mut env).unwrap();
        let first = forest.spawn(Countdown {
            label: "first",
            ticks: 0,
        });
        let second = forest
            .then(first, |_: &u32| Countdown {
                label: "second",
                ticks: 0,
            })
            .unwrap();
        forest.execute(first, owner.id(), true, &mut env).unwrap();

        forest.on_stage(position(), &mut env);
        assert_eq!(forest.state(first.id()).unwrap(), TaskState::Completed);
        assert_eq!(forest.state(second.id()).unwrap(), TaskState::Running);
        assert_eq!(forest.parent(second.id()).unwrap(), Some(owner.id()));
        assert_eq!(forest.name(second.id()).unwrap(), "second");
        assert_eq!(forest.state(owner.id()).unwrap(), TaskState::Paused);

        forest.on_stage(position(), &mut env);
        assert_eq!(forest.output(second), Some(&7));
        assert_eq!(forest.state(owner.id()).unwrap(), TaskState::Running);
    }

    #[test]
    fn continuations_of_different_kinds_exclude_each_other() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();

        let first = forest.spawn(Instant(1));
        let next = forest.then(first, |n: &u64| Instant(n * 10)).unwrap();
        let err = forest
            .then_or_none(first, |n: &u64| Some(Instant(n * 100)))
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::ContinuationAlreadyAttached { kind: "then", .. }
        ));

        let second = forest.spawn(Instant(2));
        forest
            .then_or_none(second, |n: &u64| Some(Instant(n * 100)))
            .unwrap();
        let err = forest.then(second, |n: &u64| Instant(n * 10)).unwrap_err();
        assert!(matches!(
            err,
            TaskError::ContinuationAlreadyAttached {
                kind: "then_or_none",
                ..
            }
        ));

        forest.execute(first, root, true, &mut env).unwrap();
        assert_eq!(forest.output(next), Some(&10));
    }

    #[test]
    fn declined_continuation_runs_finalizer() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let seen = Rc::new(RefCell::new(None));
        let seen_by_finalizer = Rc::clone(&seen);

        let task = forest.spawn(Instant(4));
        let skipped = forest
            .then_or_none(task, |_: &u64| None::<Instant>)
            .unwrap();
        forest
            .finally(task, move |n: &u64| *seen_by_finalizer.borrow_mut() = Some(*n))
            .unwrap();
        forest.execute(task, root, true, &mut env).unwrap();

        assert_eq!(*seen.borrow(), Some(4));
        assert_eq!(forest.state(skipped.id()).unwrap(), TaskState::Cancelled);
    }

    #[test]
    fn placeholder_cannot_be_started_directly() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let task = forest.spawn(Instant(1));
        let next = forest.then(task, |n: &u64| Instant(*n)).unwrap();
        let err = forest.execute(next, root, true, &mut env).unwrap_err();
        assert!(matches!(err, TaskError::Deferred { .. }));
    }

    #[test]
    fn long_chain_resolves_without_recursion() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();

        let first = forest.spawn(Instant(0));
        let mut last = first;
        for _ in 0..10_000 {
            last = forest.then(last, |n: &u64| Instant(n + 1)).unwrap();
        }
        forest.execute(first, root, true, &mut env).unwrap();

        assert_eq!(forest.output(last), Some(&10_000));
        assert!(forest.failures().is_empty());
    }

    #[test]
    fn cancel_is_depth_first_and_idempotent() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();

        let top = forest.spawn(Idle("top"));
        forest.execute(top, root, true, &mut env).unwrap();
        let left = forest.spawn(Idle("left"));
        forest.execute(left, top.id(), true, &mut env).unwrap();
        let leaf = forest.spawn(Idle("leaf"));
        forest.execute(leaf, left.id(), true, &mut env).unwrap();
        let right = forest.spawn(Idle("right"));
        forest.execute(right, top.id(), false, &mut env).unwrap();

        forest.cancel(top.id(), &mut env).unwrap();
        assert_eq!(
            env.journal,
            vec!["cancel leaf", "cancel left", "cancel right", "cancel top"]
        );
        for id in [top.id(), left.id(), leaf.id(), right.id()] {
            assert_eq!(forest.state(id).unwrap(), TaskState::Cancelled);
        }

        forest.cancel(top.id(), &mut env).unwrap();
        assert_eq!(env.journal.len(), 4);
    }

    #[test]
    fn cancel_leaves_completed_tasks_untouched() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let done = forest.spawn(Instant(1));
        forest.execute(done, root, true, &mut env).unwrap();
        forest.cancel(done.id(), &mut env).unwrap();
        assert_eq!(forest.state(done.id()).unwrap(), TaskState::Completed);
    }

    #[test]
    fn cancelling_pausing_child_reactivates_owner() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();

        let owner = forest.spawn(Idle("owner"));
        forest.execute(owner, root, true, &mut env).unwrap();
        let a = forest.spawn(Idle("a"));
        let b = forest.spawn(Idle("b"));
        forest.execute(a, owner.id(), true, &mut env).unwrap();
        forest.execute(b, owner.id(), true, &mut env).unwrap();

        forest.cancel(a.id(), &mut env).unwrap();
        assert_eq!(forest.state(owner.id()).unwrap(), TaskState::Paused);
        forest.cancel(b.id(), &mut env).unwrap();
        assert_eq!(forest.state(owner.id()).unwrap(), TaskState::Running);
    }

    #[test]
    fn root_is_immune_to_cancel() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let task = forest.spawn(Idle("idle"));
        forest.execute(task, root, true, &mut env).unwrap();

        forest.cancel(root, &mut env).unwrap();
        assert_eq!(forest.state(root).unwrap(), TaskState::Running);
        assert_eq!(forest.state(task.id()).unwrap(), TaskState::Cancelled);
    }

    #[test]
    fn failure_bubbles_to_root_and_is_reported_once() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let sunk = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sunk);
        forest.set_failure_sink(move |report| sink.borrow_mut().push(report.path.clone()));

        let outer = forest.spawn(Idle("outer"));
        forest.execute(outer, root, true, &mut env).unwrap();
        let middle = forest.spawn(Idle("middle"));
        forest.execute(middle, outer.id(), true, &mut env).unwrap();
        let sibling = forest.spawn(Idle("sibling"));
        forest.execute(sibling, outer.id(), false, &mut env).unwrap();
        let inner = forest.spawn(Broken);
        forest.execute(inner, middle.id(), true, &mut env).unwrap();

        assert_eq!(forest.failures().len(), 1);
        let report = forest.failures().first().unwrap();
        assert_eq!(report.path, vec!["Broken", "middle", "outer"]);
        assert_eq!(report.message, "no path to target");
        assert_eq!(sunk.borrow().len(), 1);

        for id in [inner.id(), middle.id(), outer.id()] {
            assert_eq!(forest.state(id).unwrap(), TaskState::Failed);
        }
        assert_eq!(forest.state(sibling.id()).unwrap(), TaskState::Cancelled);
        assert_eq!(forest.state(root).unwrap(), TaskState::Running);

        forest.fail(inner.id(), "again", &mut env).unwrap();
        assert_eq!(forest.failures().len(), 1);
    }

    #[test]
    fn failure_discards_pending_continuations() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let task = forest.spawn(Idle("doomed"));
        let next = forest.then(task, |(): &()| Idle("never")).unwrap();
        forest.execute(task, root, true, &mut env).unwrap();

        forest.fail(task.id(), "gave up", &mut env).unwrap();
        assert_eq!(forest.state(next.id()).unwrap(), TaskState::Cancelled);
    }

    #[test]
    fn completing_a_finished_task_is_rejected() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let task = forest.spawn(Idle("idle"));
        let err = forest.complete(task, (), &mut env).unwrap_err();
        assert!(matches!(err, TaskError::NotLive { .. }));

        forest.execute(task, root, true, &mut env).unwrap();
        forest.complete(task, (), &mut env).unwrap();
        assert_eq!(forest.state(task.id()).unwrap(), TaskState::Completed);
    }

    #[test]
    fn age_advances_for_live_tasks_only() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let live = forest.spawn(Idle("live"));
        let unstarted = forest.spawn(Idle("unstarted"));
        forest.execute(live, root, true, &mut env).unwrap();

        forest.advance_tick();
        forest.advance_tick();
        assert_eq!(forest.age(live.id()).unwrap(), 2);
        assert_eq!(forest.age(unstarted.id()).unwrap(), 0);
    }

    #[test]
    fn render_omits_cancelled_and_caps_children() {
        let mut forest = TaskForest::new(&TaskConfig {
            show_all_entries: false,
            max_render_entries: 2,
        });
        let mut env = Env::default();
        let root = forest.root();
        let mut handles = Vec::new();
        for label in ["a", "b", "c", "d"] {
            let handle = forest.spawn(Idle(label));
            forest.execute(handle, root, true, &mut env).unwrap();
            handles.push(handle);
        }
        forest.cancel(handles.first().unwrap().id(), &mut env).unwrap();
        forest.advance_tick();

        let rendered = forest.render();
        assert_eq!(
            rendered,
            "root\n  b [running] 50ms\n  c [running] 50ms\n  ...and 1 more tasks\n"
        );
        assert_eq!(forest.size(), 3);
    }

    #[test]
    fn prune_frees_finished_subtrees() {
        let mut forest = forest();
        let mut env = Env::default();
        let root = forest.root();
        let done = forest.spawn(Instant(1));
        forest.execute(done, root, true, &mut env).unwrap();
        let live = forest.spawn(Idle("live"));
        forest.execute(live, root, true, &mut env).unwrap();

        assert_eq!(forest.prune(), 1);
        assert!(matches!(
            forest.state(done.id()),
            Err(TaskError::UnknownTask { .. })
        ));
        assert_eq!(forest.state(live.id()).unwrap(), TaskState::Running);

        let reused = forest.spawn(Idle("reused"));
        assert_ne!(reused.id(), done.id());
    }
}
