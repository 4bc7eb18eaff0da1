// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Waitable primitives: event, semaphore, mutex, future.
//!
//! Every primitive exposes the single capability `wait(task) -> WaitResult`.
//! `ready = true` means the caller proceeds; `ready = false` means the task
//! was parked and the caller should suspend it. Operations that release
//! capacity return the tasks to resume in `woken`.
//!
//! Parked queues are FIFO. Capacity-limited primitives (semaphore, mutex)
//! wake one task per released unit, in park order; level-triggered
//! primitives (event, future) wake every parked task at once. No ordering
//! holds across different waitables.

use std::collections::VecDeque;

use crate::task::TaskId;

/// Outcome of a wait or a releasing operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaitResult {
    /// True when the caller need not suspend.
    pub ready: bool,
    /// Tasks that should be resumed as a consequence of this call.
    pub woken: Vec<TaskId>,
}

impl WaitResult {
    /// A ready result with nothing woken.
    #[must_use]
    pub fn ready_now() -> Self {
        Self {
            ready: true,
            woken: Vec::new(),
        }
    }

    /// A not-ready result: the caller parked.
    #[must_use]
    pub fn parked() -> Self {
        Self {
            ready: false,
            woken: Vec::new(),
        }
    }
}

/// The one capability every waitable has.
///
/// Concrete primitives implement this directly; reactor entry points are
/// written per primitive, so no trait objects sit on the wait path.
pub trait Waitable {
    /// Attempts to pass the waitable; parks `task` on failure.
    fn wait(&mut self, task: TaskId) -> WaitResult;
}

/// Level-triggered boolean event.
///
/// While set, waits pass without parking. `signal` sets the flag and wakes
/// every parked task; `reset` clears the flag without waking or parking
/// anyone.
#[derive(Debug, Default)]
pub struct Event {
    set: bool,
    waiters: VecDeque<TaskId>,
}

impl Event {
    /// Creates an event, optionally already set.
    #[must_use]
    pub fn new(initially_set: bool) -> Self {
        Self {
            set: initially_set,
            waiters: VecDeque::new(),
        }
    }

    /// Whether the event is currently set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set
    }

    /// Sets the event and wakes every parked task.
    pub fn signal(&mut self) -> WaitResult {
        self.set = true;
        WaitResult {
            ready: true,
            woken: self.waiters.drain(..).collect(),
        }
    }

    /// Clears the flag. Nobody is parked or woken by this.
    pub fn reset(&mut self) {
        self.set = false;
    }
}

impl Waitable for Event {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        if self.set {
            return WaitResult::ready_now();
        }
        self.waiters.push_back(task);
        WaitResult::parked()
    }
}

/// Counting semaphore with FIFO wake order.
#[derive(Debug, Default)]
pub struct Semaphore {
    count: u64,
    waiters: VecDeque<TaskId>,
}

impl Semaphore {
    /// Creates a semaphore with `initial` available units.
    #[must_use]
    pub fn new(initial: u64) -> Self {
        Self {
            count: initial,
            waiters: VecDeque::new(),
        }
    }

    /// Units currently available.
    #[must_use]
    pub fn available(&self) -> u64 {
        self.count
    }

    /// Releases `count` units: parked tasks are woken FIFO, one per unit;
    /// any surplus is added to the available pool. A zero release is a
    /// no-op reporting not-ready.
    pub fn signal(&mut self, count: u64) -> WaitResult {
        let mut out = WaitResult::default();
        if count == 0 {
            return out;
        }
        let mut remaining = count;
        while remaining > 0 {
            let Some(task) = self.waiters.pop_front() else {
                break;
            };
            out.woken.push(task);
            remaining -= 1;
        }
        self.count += remaining;
        out.ready = true;
        out
    }
}

impl Waitable for Semaphore {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        if self.count > 0 {
            self.count -= 1;
            return WaitResult::ready_now();
        }
        self.waiters.push_back(task);
        WaitResult::parked()
    }
}

/// Cooperative mutex with FIFO handoff.
///
/// Reentrant for equality only: the owner passing `wait` again succeeds but
/// no lock count is kept, so one `unlock` releases it.
#[derive(Debug, Default)]
pub struct Mutex {
    owner: Option<TaskId>,
    waiters: VecDeque<TaskId>,
}

impl Mutex {
    /// Creates an unowned mutex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<TaskId> {
        self.owner
    }

    /// Releases the mutex. A non-owner call is a no-op reporting not-ready.
    /// Otherwise ownership transfers to the front of the waiter queue (that
    /// task is the one entry in `woken`), or clears when nobody waits.
    pub fn unlock(&mut self, task: TaskId) -> WaitResult {
        if self.owner != Some(task) {
            return WaitResult::parked();
        }
        let Some(next) = self.waiters.pop_front() else {
            self.owner = None;
            return WaitResult::ready_now();
        };
        self.owner = Some(next);
        WaitResult {
            ready: true,
            woken: vec![next],
        }
    }
}

impl Waitable for Mutex {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        match self.owner {
            None => {
                self.owner = Some(task);
                WaitResult::ready_now()
            }
            Some(owner) if owner == task => WaitResult::ready_now(),
            Some(_) => {
                self.waiters.push_back(task);
                WaitResult::parked()
            }
        }
    }
}

/// One-shot future carrying a string value.
#[derive(Debug, Default)]
pub struct Future {
    value: Option<String>,
    waiters: VecDeque<TaskId>,
}

impl Future {
    /// Creates an unresolved future.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value has been set.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    /// The resolved value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Resolves the future. Succeeds at most once; a repeat set is a no-op
    /// reporting not-ready with nothing woken. The first success wakes every
    /// parked task.
    pub fn set_value(&mut self, value: impl Into<String>) -> WaitResult {
        if self.value.is_some() {
            return WaitResult::parked();
        }
        self.value = Some(value.into());
        WaitResult {
            ready: true,
            woken: self.waiters.drain(..).collect(),
        }
    }
}

impl Waitable for Future {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        if self.value.is_some() {
            return WaitResult::ready_now();
        }
        self.waiters.push_back(task);
        WaitResult::parked()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn event_is_level_triggered() {
        let mut event = Event::new(false);
        assert!(!event.wait(1).ready);
        assert!(!event.wait(2).ready);
        let signaled = event.signal();
        assert!(signaled.ready);
        assert_eq!(signaled.woken, vec![1, 2]);
        // Still set: later waits pass through.
        assert!(event.wait(3).ready);
        event.reset();
        assert!(!event.wait(3).ready);
    }

    #[test]
    fn semaphore_counts_and_wakes_fifo() {
        let mut sem = Semaphore::new(1);
        assert!(sem.wait(1).ready);
        assert_eq!(sem.available(), 0);
        assert!(!sem.wait(2).ready);
        assert!(!sem.wait(3).ready);

        let released = sem.signal(1);
        assert!(released.ready);
        assert_eq!(released.woken, vec![2]);

        // Two units, one waiter: surplus lands in the pool.
        let released = sem.signal(2);
        assert_eq!(released.woken, vec![3]);
        assert_eq!(sem.available(), 1);

        assert_eq!(sem.signal(0), WaitResult::default());
    }

    #[test]
    fn mutex_grants_reenters_and_hands_off() {
        let mut mutex = Mutex::new();
        assert!(mutex.wait(1).ready);
        assert!(mutex.wait(1).ready, "equality-reentrant");
        assert!(!mutex.wait(2).ready);
        assert!(!mutex.wait(3).ready);

        // A non-owner unlock does nothing.
        assert!(!mutex.unlock(2).ready);
        assert_eq!(mutex.owner(), Some(1));

        let handoff = mutex.unlock(1);
        assert_eq!(handoff.woken, vec![2]);
        assert_eq!(mutex.owner(), Some(2));

        let handoff = mutex.unlock(2);
        assert_eq!(handoff.woken, vec![3]);
        let cleared = mutex.unlock(3);
        assert!(cleared.ready);
        assert!(cleared.woken.is_empty());
        assert_eq!(mutex.owner(), None);
    }

    #[test]
    fn future_resolves_once() {
        let mut future = Future::new();
        assert!(!future.wait(1).ready);
        let first = future.set_value("done");
        assert!(first.ready);
        assert_eq!(first.woken, vec![1]);
        assert_eq!(future.value(), Some("done"));

        let second = future.set_value("again");
        assert!(!second.ready);
        assert!(second.woken.is_empty());
        assert_eq!(future.value(), Some("done"));
        assert!(future.wait(2).ready);
    }
}
