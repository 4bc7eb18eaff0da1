// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! silt-exec: cooperative tasks, waitable primitives, and the reactor that
//! couples them.
//!
//! The layer is storage-independent: it uses the identifier types from
//! silt-store but never the storage engine. Scheduling is single-threaded
//! and cooperative: no preemption, no background workers, no locks. A task
//! suspends exactly when a waitable's `wait` returns not-ready, and resumes
//! when a later operation's woken list is fed through the reactor.
//!
//! Cancellation is cooperative and idempotent: `cancel_task` only requests;
//! the request converts to `Canceled` when the task next reaches
//! [`await_task`] or appears in a processed woken set.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

mod error;
mod io;
mod reactor;
mod task;
mod waitable;

pub use error::TaskError;
/// Byte streams, channels, and datagram ports.
pub use io::{ByteStream, Channel, DatagramPort};
/// Await coupling and the I/O reactor.
pub use reactor::{await_task, handle_wait_result, AwaitOutcome, IoReactor};
/// Task registry and its state machine.
pub use task::{TaskId, TaskRecord, TaskRegistry, TaskState};
/// Waitable primitives and the wait contract.
pub use waitable::{Event, Future, Mutex, Semaphore, WaitResult, Waitable};
