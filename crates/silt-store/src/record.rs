// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Durable record types for the object and edge segment logs.

use crate::ident::{ObjectId, ObjectRef, TypeId};

/// One immutable typed object in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Identity and revision of this object.
    pub object_ref: ObjectRef,
    /// Logical type of the payload.
    pub type_id: TypeId,
    /// Definition object describing `type_id` (the registry's anchor; an
    /// all-zero id when the object is untyped by a stored definition).
    pub definition_id: ObjectId,
    /// Structured-binary payload bytes. Opaque to the store.
    pub payload: Vec<u8>,
    /// Wall-clock creation stamp in milliseconds since the epoch.
    pub created_at_ms: u64,
}

/// One immutable directed edge between two object revisions.
///
/// Multiple edges with the same endpoint/name/role tuple are legal; creation
/// order is preserved by segment offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Source object revision.
    pub from: ObjectRef,
    /// Destination object revision.
    pub to: ObjectRef,
    /// Edge name; empty allowed.
    pub name: String,
    /// Edge role; empty allowed.
    pub role: String,
    /// Structured-binary properties; empty allowed.
    pub props: Vec<u8>,
    /// Wall-clock creation stamp in milliseconds since the epoch.
    pub created_at_ms: u64,
}
