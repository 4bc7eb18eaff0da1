// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Await coupling and the I/O reactor.
//!
//! [`await_task`] ties a wait on any waitable to the task's suspension, and
//! is the point where a pending cancellation is observed: a task in
//! `CancelRequested` is marked `Canceled` before the waitable is ever
//! consulted, and the caller reads the ready result as "stop immediately".
//!
//! [`IoReactor`] applies the same pattern to the three I/O waitables with
//! one monomorphic entry point per primitive, so no trait objects sit on the wake
//! path. It spawns no threads; it is a coordination surface for a
//! single-threaded cooperative scheduler.

use tracing::debug;

use crate::error::TaskError;
use crate::io::{ByteStream, Channel, DatagramPort};
use crate::task::{TaskId, TaskRegistry, TaskState};
use crate::waitable::{WaitResult, Waitable};

/// How a processed woken list split into resumed and canceled tasks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AwaitOutcome {
    /// Tasks moved back to `Running`.
    pub resumed: Vec<TaskId>,
    /// Tasks whose pending cancellation was finalized.
    pub canceled: Vec<TaskId>,
}

/// Waits on `waitable` for `task`, recording the suspension.
///
/// A pending cancellation short-circuits: the task ends `Canceled`, the
/// waitable is never consulted, and the ready result tells the caller to
/// stop. Otherwise the task transitions to `Waiting` when the waitable
/// reports not-ready.
pub fn await_task<W: Waitable>(
    waitable: &mut W,
    registry: &mut TaskRegistry,
    task: TaskId,
) -> Result<WaitResult, TaskError> {
    let record = registry.get_task(task).ok_or(TaskError::TaskNotFound(task))?;
    if record.state == TaskState::CancelRequested {
        registry.mark_canceled(task)?;
        return Ok(WaitResult::ready_now());
    }

    let result = waitable.wait(task);
    if !result.ready {
        registry.wait_task(task)?;
    }
    Ok(result)
}

/// Converts a woken list into resumed and canceled sets.
///
/// Missing tasks and failed transitions are dropped silently: a woken id
/// may belong to a task that was killed or completed since it parked.
pub fn handle_wait_result(registry: &mut TaskRegistry, result: &WaitResult) -> AwaitOutcome {
    let mut outcome = AwaitOutcome::default();
    for &task_id in &result.woken {
        let Some(record) = registry.get_task(task_id) else {
            continue;
        };
        if record.state == TaskState::CancelRequested {
            if registry.mark_canceled(task_id).is_ok() {
                outcome.canceled.push(task_id);
            }
            continue;
        }
        if registry.resume_task(task_id).is_ok() {
            outcome.resumed.push(task_id);
        }
    }
    if !outcome.resumed.is_empty() || !outcome.canceled.is_empty() {
        debug!(
            resumed = outcome.resumed.len(),
            canceled = outcome.canceled.len(),
            "wait result processed"
        );
    }
    outcome
}

/// Couples the I/O waitables to a task registry.
pub struct IoReactor<'a> {
    registry: &'a mut TaskRegistry,
}

impl<'a> IoReactor<'a> {
    /// Borrows a registry for reactor operations.
    pub fn new(registry: &'a mut TaskRegistry) -> Self {
        Self { registry }
    }

    /// Awaits readability of a byte stream.
    pub fn await_stream_readable(
        &mut self,
        stream: &mut ByteStream,
        task: TaskId,
    ) -> Result<WaitResult, TaskError> {
        await_task(stream, self.registry, task)
    }

    /// Awaits readability of a channel's incoming stream.
    pub fn await_channel_readable(
        &mut self,
        channel: &mut Channel,
        task: TaskId,
    ) -> Result<WaitResult, TaskError> {
        await_task(channel, self.registry, task)
    }

    /// Awaits readability of a datagram port's inbox.
    pub fn await_port_readable(
        &mut self,
        port: &mut DatagramPort,
        task: TaskId,
    ) -> Result<WaitResult, TaskError> {
        await_task(port, self.registry, task)
    }

    /// Processes a woken list produced outside the reactor.
    pub fn handle_result(&mut self, result: &WaitResult) -> AwaitOutcome {
        handle_wait_result(self.registry, result)
    }

    /// Pushes bytes into a stream and resumes whoever that wakes.
    pub fn push(&mut self, stream: &mut ByteStream, data: &[u8]) -> AwaitOutcome {
        let result = stream.push(data);
        self.handle_result(&result)
    }

    /// Sends bytes over a channel and resumes whoever that wakes.
    pub fn send(&mut self, channel: &Channel, data: &[u8]) -> AwaitOutcome {
        let result = channel.send(data);
        self.handle_result(&result)
    }

    /// Sends one datagram and resumes whoever that wakes.
    pub fn send_datagram(&mut self, port: &DatagramPort, data: &[u8]) -> AwaitOutcome {
        let result = port.send(data);
        self.handle_result(&result)
    }
}
