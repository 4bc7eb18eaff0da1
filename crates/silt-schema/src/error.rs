// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Registry and dispatch error taxonomy.

use silt_store::StoreError;
use thiserror::Error;

/// Errors produced by the schema registry and operation dispatch.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A definition was rejected before it reached the store (empty name,
    /// zero type id, migration hook without a supersedes target, missing
    /// supersedes target).
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// An object resolved by id is not of the meta-type.
    #[error("object is not a type definition")]
    NotADefinition,

    /// A definition lookup by id or type found nothing where one was
    /// required.
    #[error("definition not found")]
    DefinitionNotFound,

    /// The supersedes walk found multiple outgoing edges or conflicting
    /// migration hooks.
    #[error("corrupt supersedes chain: {0}")]
    CorruptChain(String),

    /// Dispatch found no eligible operation.
    #[error("no matching operation")]
    NoMatchingOperation,

    /// Dispatch found more than one best candidate. The message lists every
    /// tied signature.
    #[error("ambiguous operation: {0}")]
    AmbiguousOperation(String),
}
