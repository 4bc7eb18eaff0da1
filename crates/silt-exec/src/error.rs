// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Task-layer error taxonomy.

use thiserror::Error;

use crate::task::{TaskId, TaskState};

/// Errors produced by the task registry and the await layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// No task with this id exists.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A spawn named a parent that does not exist.
    #[error("parent task {0} not found")]
    ParentNotFound(TaskId),

    /// The requested transition is not an edge of the state machine.
    /// Terminal states are sticky.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        /// State the task was in.
        from: TaskState,
        /// State the caller asked for.
        to: TaskState,
    },
}
