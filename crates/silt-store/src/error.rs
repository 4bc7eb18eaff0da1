// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage-layer error taxonomy.

use crate::ident::ObjectId;
use thiserror::Error;

/// Errors produced by the storage layer.
///
/// Every fallible store operation returns exactly one of these; errors never
/// unwind across the crate boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Segment or index file I/O failed.
    #[error("segment i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A segment frame carried the wrong record tag, or its fields were
    /// truncated after a complete tag was read. Carries the byte offset of
    /// the offending frame.
    #[error("corrupt segment record at offset {offset}")]
    CorruptSegment {
        /// Byte offset of the frame that failed to decode.
        offset: u64,
    },

    /// Operation invoked before `open` or after `close`.
    #[error("store is not open")]
    NotOpen,

    /// `begin` was called while a transaction was already open on this
    /// handle.
    #[error("transaction already open")]
    TxnAlreadyOpen,

    /// `commit` or `rollback` was called with no open transaction.
    #[error("no open transaction")]
    TxnNotOpen,

    /// An object with this id and version has already been appended.
    #[error("object {id} v{version} already exists")]
    DuplicateObject {
        /// Identifier of the conflicting object.
        id: ObjectId,
        /// Version of the conflicting object.
        version: u64,
    },

    /// Identifier hex form was malformed.
    #[error("invalid object id hex: {0:?}")]
    InvalidHex(String),

    /// Structured payload bytes failed to encode or decode.
    #[error("payload codec failed: {0}")]
    Decode(String),
}
