// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! silt-schema: a reflective type system whose definitions are themselves
//! objects in the silt store.
//!
//! Type definitions are encoded as CBOR payloads and appended as ordinary
//! objects of the single distinguished meta-type
//! ([`TYPE_DEFINITION_TYPE`]). That makes the substrate self-describing:
//! tools iterate types the same way they iterate any data, and the meta-type
//! constant is the only bootstrap anchor.
//!
//! Schema evolution is recorded structurally: registering a definition that
//! supersedes a prior one appends `supersedes` (and optionally
//! `migration_hook`) edges from the new definition to the old, forming a
//! walkable chain.
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

mod bootstrap;
mod codec;
mod dispatch;
mod error;
mod registry;
mod types;

/// Deterministic core-schema bootstrap.
pub use bootstrap::{
    bootstrap_core_schema, core_schema_definitions, definition_id_for, BootstrapStats, TYPE_ARRAY,
    TYPE_BOOL, TYPE_BYTES, TYPE_F64, TYPE_FIELD_DEFINITION, TYPE_LIST, TYPE_MAP, TYPE_OBJECT_ID,
    TYPE_OPERATION_DEFINITION, TYPE_RELATIONSHIP_SPEC, TYPE_SET, TYPE_SIGNATURE_DEFINITION,
    TYPE_STORE_EDGE, TYPE_STORE_OBJECT, TYPE_STRING, TYPE_TUPLE, TYPE_TYPE_ID, TYPE_U64,
    TYPE_VERSION,
};
/// Definition payload codec.
pub use codec::{decode_definition, encode_definition};
/// Operation listing and overload resolution.
pub use dispatch::{
    DispatchEngine, DispatchMatch, InheritanceResolver, NoInheritance, OperationRegistry,
};
pub use error::SchemaError;
/// The registry itself.
pub use registry::SchemaRegistry;
/// Definition model types and the meta-type anchor.
pub use types::{
    DefinitionRecord, FieldDefinition, OperationDefinition, OperationScope, ParameterDefinition,
    RelationshipSpec, SignatureDefinition, SupersedesLink, TypeDefinition, TypeSummary,
    TYPE_DEFINITION_TYPE,
};
