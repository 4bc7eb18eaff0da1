// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Task registry with a fixed state machine.
//!
//! Legal transitions (everything else is [`TaskError::IllegalTransition`]):
//!
//! ```text
//!   spawn → Running
//!   Running → Waiting            (wait_task)
//!   Waiting → Running            (resume_task)
//!   Running | Waiting → CancelRequested   (cancel_task)
//!   CancelRequested → Canceled   (mark_canceled)
//!   Running → Completed | Failed (complete_task, fail_task)
//!   Running | Waiting → Killed   (kill_task)
//! ```
//!
//! `Canceled`, `Completed`, `Failed`, and `Killed` are terminal and sticky.

use std::collections::BTreeMap;

use silt_store::ObjectId;

use crate::error::TaskError;

/// Registry-unique task identifier, allocated from 1 upward.
pub type TaskId = u64;

/// Where a task is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Pre-spawn placeholder; never observed on a registered task.
    Created,
    /// Scheduled and runnable.
    Running,
    /// Suspended on a waitable.
    Waiting,
    /// Cancellation requested; the task has not yet observed it.
    CancelRequested,
    /// Terminal: the cancellation was observed.
    Canceled,
    /// Terminal: finished normally.
    Completed,
    /// Terminal: finished with an error.
    Failed,
    /// Terminal: forcibly stopped.
    Killed,
}

impl TaskState {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Canceled | TaskState::Completed | TaskState::Failed | TaskState::Killed
        )
    }

    /// Stable display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Created => "Created",
            TaskState::Running => "Running",
            TaskState::Waiting => "Waiting",
            TaskState::CancelRequested => "CancelRequested",
            TaskState::Canceled => "Canceled",
            TaskState::Completed => "Completed",
            TaskState::Failed => "Failed",
            TaskState::Killed => "Killed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRecord {
    /// Registry-unique identifier, ≥ 1.
    pub id: TaskId,
    /// Object this task originates from.
    pub origin: ObjectId,
    /// Parent task, if spawned under one.
    pub parent: Option<TaskId>,
    /// Children in spawn order. Never pruned, even past terminal states.
    pub children: Vec<TaskId>,
    /// Current state.
    pub state: TaskState,
    /// Display name; `fail_task` overwrites it with the failure reason.
    pub name: String,
}

/// Allocates task ids and enforces the state machine.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    next_id: TaskId,
    tasks: BTreeMap<TaskId, TaskRecord>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tasks: BTreeMap::new(),
        }
    }

    /// Spawns a task in `Running` state. The parent, when given, must exist.
    pub fn spawn_task(
        &mut self,
        origin: ObjectId,
        parent: Option<TaskId>,
        name: impl Into<String>,
    ) -> Result<TaskRecord, TaskError> {
        if let Some(parent_id) = parent {
            if !self.tasks.contains_key(&parent_id) {
                return Err(TaskError::ParentNotFound(parent_id));
            }
        }

        let record = TaskRecord {
            id: self.next_id,
            origin,
            parent,
            children: Vec::new(),
            state: TaskState::Running,
            name: name.into(),
        };
        self.next_id += 1;

        if let Some(parent_id) = parent {
            if let Some(parent_record) = self.tasks.get_mut(&parent_id) {
                parent_record.children.push(record.id);
            }
        }
        self.tasks.insert(record.id, record.clone());
        Ok(record)
    }

    /// Suspends a running task.
    pub fn wait_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.transition(id, &[TaskState::Running], TaskState::Waiting)
    }

    /// Resumes a waiting task.
    pub fn resume_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.transition(id, &[TaskState::Waiting], TaskState::Running)
    }

    /// Requests cancellation. The task keeps running (or waiting) until it
    /// observes the request.
    pub fn cancel_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.transition(
            id,
            &[TaskState::Running, TaskState::Waiting],
            TaskState::CancelRequested,
        )
    }

    /// Converts an observed cancellation request into the terminal state.
    pub fn mark_canceled(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.transition(id, &[TaskState::CancelRequested], TaskState::Canceled)
    }

    /// Forcibly stops a running or waiting task.
    pub fn kill_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.transition(
            id,
            &[TaskState::Running, TaskState::Waiting],
            TaskState::Killed,
        )
    }

    /// Finishes a running task normally.
    pub fn complete_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.transition(id, &[TaskState::Running], TaskState::Completed)
    }

    /// Fails a running task. A nonempty reason replaces the display name.
    pub fn fail_task(&mut self, id: TaskId, reason: impl Into<String>) -> Result<(), TaskError> {
        self.transition(id, &[TaskState::Running], TaskState::Failed)?;
        let reason = reason.into();
        if !reason.is_empty() {
            if let Some(record) = self.tasks.get_mut(&id) {
                record.name = reason;
            }
        }
        Ok(())
    }

    /// Looks up a task.
    #[must_use]
    pub fn get_task(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(&id)
    }

    /// All tasks, ascending by id.
    #[must_use]
    pub fn list_tasks(&self) -> Vec<TaskRecord> {
        self.tasks.values().cloned().collect()
    }

    fn transition(
        &mut self,
        id: TaskId,
        allowed_from: &[TaskState],
        to: TaskState,
    ) -> Result<(), TaskError> {
        let record = self
            .tasks
            .get_mut(&id)
            .ok_or(TaskError::TaskNotFound(id))?;
        if !allowed_from.contains(&record.state) {
            return Err(TaskError::IllegalTransition {
                from: record.state,
                to,
            });
        }
        record.state = to;
        Ok(())
    }
}
