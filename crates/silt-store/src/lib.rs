// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! silt-store: append-only segment storage for typed immutable objects and
//! typed directed edges.
//!
//! The store is a durable log. Objects and edges are framed records appended
//! to two segment files; four line-oriented index side-files record
//! `(key, offset)` pairs as each record lands. The authoritative read path is
//! a set of in-memory maps rebuilt by a full forward scan on [`SegmentStore::open`].
//! The special path `:memory:` elides all disk I/O and keeps the same maps.
//!
//! # Immutability Invariant
//!
//! Once a record is appended its bytes never change and it is never deleted
//! while the segment file persists. `(ObjectId, Version)` is unique; a second
//! append for the same pair is rejected rather than shadowed.
//!
//! # Concurrency Contract
//!
//! A store handle is a single-writer resource. All mutation happens on the
//! caller's stack; there are no background threads and no locks. Handing one
//! handle to two concurrent contexts is undefined.
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
    clippy::doc_markdown,
    // Segment framing converts between usize buffer lengths and the u32/u64
    // on-disk fields; lengths are bounded by the frame-limit checks.
    clippy::cast_possible_truncation
)]

mod error;
mod ident;
mod payload;
mod record;
mod segment;
mod store;

pub use error::StoreError;
/// Identifier types and the millisecond wall clock.
pub use ident::{now_ms, ObjectId, ObjectRef, TypeId, Version};
/// Structured payload codec (CBOR value tree + JSON string bridge).
pub use payload::{cbor_from_json, cbor_kv, decode_value, encode_value, json_from_cbor, Value};
/// Durable record types.
pub use record::{EdgeRecord, ObjectRecord};
/// The append-only segment store.
pub use store::{SegmentStore, StoreConfig, MEMORY_PATH};
