// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic core-schema bootstrap.
//!
//! Primitive and built-in definitions are registered under definition ids
//! derived from their TypeId: a fixed 8-byte tag in the high bytes, the
//! TypeId in the low bytes with its least-significant byte last. The
//! derivation is a wire-compatibility anchor: ids must match across
//! implementations and replays, so the byte layout here never changes.

use silt_store::{ObjectId, TypeId};
use tracing::debug;

use crate::error::SchemaError;
use crate::registry::SchemaRegistry;
use crate::types::{
    FieldDefinition, OperationDefinition, OperationScope, ParameterDefinition, SignatureDefinition,
    TypeDefinition, TYPE_DEFINITION_TYPE,
};

/// Primitive: UTF-8 text.
pub const TYPE_STRING: TypeId = TypeId(0x1001);
/// Primitive: unsigned 64-bit integer.
pub const TYPE_U64: TypeId = TypeId(0x1002);
/// Primitive: boolean.
pub const TYPE_BOOL: TypeId = TypeId(0x1003);
/// Primitive: 128-bit object identifier.
pub const TYPE_OBJECT_ID: TypeId = TypeId(0x1004);
/// Primitive: 64-bit type identifier.
pub const TYPE_TYPE_ID: TypeId = TypeId(0x1005);
/// Primitive: 64-bit version number.
pub const TYPE_VERSION: TypeId = TypeId(0x1006);
/// Primitive: opaque byte string.
pub const TYPE_BYTES: TypeId = TypeId(0x1007);
/// Primitive: IEEE-754 double.
pub const TYPE_F64: TypeId = TypeId(0x1008);

/// Parametric container: fixed-length array.
pub const TYPE_ARRAY: TypeId = TypeId(0x4352_4154_0000_0001);
/// Parametric container: growable list.
pub const TYPE_LIST: TypeId = TypeId(0x4352_4154_0000_0002);
/// Parametric container: unordered set.
pub const TYPE_SET: TypeId = TypeId(0x4352_4154_0000_0003);
/// Parametric container: key/value map.
pub const TYPE_MAP: TypeId = TypeId(0x4352_4154_0000_0004);
/// Parametric container: heterogeneous tuple.
pub const TYPE_TUPLE: TypeId = TypeId(0x4352_4154_0000_0005);

/// Reflective: a field inside a type definition.
pub const TYPE_FIELD_DEFINITION: TypeId = TypeId(0x5246_5243_4600_0001);
/// Reflective: an operation inside a type definition.
pub const TYPE_OPERATION_DEFINITION: TypeId = TypeId(0x5246_5243_4600_0002);
/// Reflective: an operation signature.
pub const TYPE_SIGNATURE_DEFINITION: TypeId = TypeId(0x5246_5243_4600_0003);
/// Reflective: a declared relationship.
pub const TYPE_RELATIONSHIP_SPEC: TypeId = TypeId(0x5246_5243_4600_0004);

/// Store record shape: an object.
pub const TYPE_STORE_OBJECT: TypeId = TypeId(0x5245_4645_0000_0001);
/// Store record shape: an edge.
pub const TYPE_STORE_EDGE: TypeId = TypeId(0x5245_4645_0000_0002);

const DEFINITION_ID_TAG: &[u8; 8] = b"REFRACT0";

/// Derives the deterministic definition id for a built-in type.
#[must_use]
pub fn definition_id_for(type_id: TypeId) -> ObjectId {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(DEFINITION_ID_TAG);
    bytes[8..].copy_from_slice(&type_id.0.to_be_bytes());
    ObjectId(bytes)
}

/// Counts from one bootstrap pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapStats {
    /// Definitions registered by this pass.
    pub inserted: usize,
    /// Definitions that were already present and left untouched.
    pub existing: usize,
}

fn required(name: &str, type_id: TypeId) -> FieldDefinition {
    FieldDefinition {
        name: name.into(),
        type_id,
        required: true,
        default_json: None,
    }
}

fn optional(name: &str, type_id: TypeId) -> FieldDefinition {
    FieldDefinition {
        name: name.into(),
        type_id,
        required: false,
        default_json: None,
    }
}

fn output(name: &str, type_id: TypeId) -> ParameterDefinition {
    ParameterDefinition {
        name: name.into(),
        type_id,
        optional: false,
    }
}

fn param(name: &str, type_id: TypeId) -> ParameterDefinition {
    ParameterDefinition {
        name: name.into(),
        type_id,
        optional: false,
    }
}

fn object_op(
    name: &str,
    params: Vec<ParameterDefinition>,
    outputs: Vec<ParameterDefinition>,
) -> OperationDefinition {
    OperationDefinition {
        name: name.into(),
        scope: OperationScope::Object,
        signature: SignatureDefinition { params, outputs },
    }
}

fn add_size_op(def: &mut TypeDefinition) {
    def.operations
        .push(object_op("size", Vec::new(), vec![output("count", TYPE_U64)]));
}

fn add_iterate_op(def: &mut TypeDefinition) {
    def.operations.push(object_op(
        "iterate",
        Vec::new(),
        vec![output("items", TYPE_BYTES)],
    ));
}

fn add_index_op(def: &mut TypeDefinition, index_type: TypeId, value_type: TypeId) {
    def.operations.push(object_op(
        "index",
        vec![param("index", index_type)],
        vec![output("value", value_type)],
    ));
}

fn add_contains_op(def: &mut TypeDefinition, value_type: TypeId) {
    def.operations.push(object_op(
        "contains",
        vec![param("value", value_type)],
        vec![output("present", TYPE_BOOL)],
    ));
}

fn primitive(type_id: TypeId, name: &str) -> TypeDefinition {
    TypeDefinition::new(type_id, name, "Core")
}

fn bytes_definition() -> TypeDefinition {
    let mut def = primitive(TYPE_BYTES, "Bytes");
    add_size_op(&mut def);
    add_iterate_op(&mut def);
    add_index_op(&mut def, TYPE_U64, TYPE_U64);
    add_contains_op(&mut def, TYPE_U64);
    def
}

fn container(type_id: TypeId, name: &str, type_params: &[&str]) -> TypeDefinition {
    let mut def = TypeDefinition::new(type_id, name, "Core");
    def.type_params = type_params.iter().map(|&p| p.to_owned()).collect();
    add_size_op(&mut def);
    add_iterate_op(&mut def);
    def
}

fn array_definition() -> TypeDefinition {
    let mut def = container(TYPE_ARRAY, "Array", &["T"]);
    add_index_op(&mut def, TYPE_U64, TYPE_BYTES);
    add_contains_op(&mut def, TYPE_BYTES);
    def
}

fn list_definition() -> TypeDefinition {
    let mut def = container(TYPE_LIST, "List", &["T"]);
    add_index_op(&mut def, TYPE_U64, TYPE_BYTES);
    add_contains_op(&mut def, TYPE_BYTES);
    def
}

fn set_definition() -> TypeDefinition {
    let mut def = container(TYPE_SET, "Set", &["T"]);
    add_contains_op(&mut def, TYPE_BYTES);
    def
}

fn map_definition() -> TypeDefinition {
    let mut def = container(TYPE_MAP, "Map", &["K", "V"]);
    add_index_op(&mut def, TYPE_BYTES, TYPE_BYTES);
    add_contains_op(&mut def, TYPE_BYTES);
    def
}

fn tuple_definition() -> TypeDefinition {
    let mut def = container(TYPE_TUPLE, "Tuple", &["Ts"]);
    add_index_op(&mut def, TYPE_U64, TYPE_BYTES);
    add_contains_op(&mut def, TYPE_BYTES);
    def
}

fn type_definition_definition() -> TypeDefinition {
    let mut def = TypeDefinition::new(TYPE_DEFINITION_TYPE, "TypeDefinition", "Schema");
    def.fields.push(required("type_id", TYPE_U64));
    def.fields.push(required("name", TYPE_STRING));
    def.fields.push(required("namespace", TYPE_STRING));
    def.fields.push(required("version", TYPE_U64));
    def
}

fn field_definition_definition() -> TypeDefinition {
    let mut def = TypeDefinition::new(TYPE_FIELD_DEFINITION, "FieldDefinition", "Schema");
    def.fields.push(required("name", TYPE_STRING));
    def.fields.push(required("type_id", TYPE_U64));
    def.fields.push(optional("required", TYPE_BOOL));
    def
}

fn signature_definition_definition() -> TypeDefinition {
    let mut def = TypeDefinition::new(TYPE_SIGNATURE_DEFINITION, "SignatureDefinition", "Schema");
    def.fields.push(optional("params", TYPE_BYTES));
    def.fields.push(optional("outputs", TYPE_BYTES));
    def
}

fn operation_definition_definition() -> TypeDefinition {
    let mut def = TypeDefinition::new(TYPE_OPERATION_DEFINITION, "OperationDefinition", "Schema");
    def.fields.push(required("name", TYPE_STRING));
    def.fields.push(optional("scope", TYPE_STRING));
    def.fields.push(optional("signature", TYPE_BYTES));
    def
}

fn relationship_spec_definition() -> TypeDefinition {
    TypeDefinition::new(TYPE_RELATIONSHIP_SPEC, "RelationshipSpec", "Schema")
}

fn store_object_definition() -> TypeDefinition {
    let mut def = TypeDefinition::new(TYPE_STORE_OBJECT, "Object", "Store");
    def.fields.push(required("object_id", TYPE_OBJECT_ID));
    def.fields.push(required("version", TYPE_VERSION));
    def.fields.push(required("type_id", TYPE_TYPE_ID));
    def.fields.push(required("definition_id", TYPE_OBJECT_ID));
    def.fields.push(optional("payload", TYPE_BYTES));
    def.fields.push(required("created_at_ms", TYPE_U64));
    def
}

fn store_edge_definition() -> TypeDefinition {
    let mut def = TypeDefinition::new(TYPE_STORE_EDGE, "Edge", "Store");
    def.fields.push(required("from_id", TYPE_OBJECT_ID));
    def.fields.push(required("from_version", TYPE_VERSION));
    def.fields.push(required("to_id", TYPE_OBJECT_ID));
    def.fields.push(required("to_version", TYPE_VERSION));
    def.fields.push(required("name", TYPE_STRING));
    def.fields.push(required("role", TYPE_STRING));
    def.fields.push(optional("props", TYPE_BYTES));
    def.fields.push(required("created_at_ms", TYPE_U64));
    def
}

/// The canonical core-schema definition set, in registration order.
#[must_use]
pub fn core_schema_definitions() -> Vec<TypeDefinition> {
    vec![
        primitive(TYPE_STRING, "String"),
        primitive(TYPE_U64, "U64"),
        primitive(TYPE_BOOL, "Bool"),
        primitive(TYPE_OBJECT_ID, "ObjectID"),
        primitive(TYPE_TYPE_ID, "TypeID"),
        primitive(TYPE_VERSION, "Version"),
        bytes_definition(),
        primitive(TYPE_F64, "F64"),
        array_definition(),
        list_definition(),
        set_definition(),
        map_definition(),
        tuple_definition(),
        type_definition_definition(),
        field_definition_definition(),
        signature_definition_definition(),
        operation_definition_definition(),
        relationship_spec_definition(),
        store_object_definition(),
        store_edge_definition(),
    ]
}

/// Ensures the core-schema definitions exist. Idempotent: definitions whose
/// TypeId already resolves are skipped, the rest are registered under their
/// deterministic definition ids.
pub fn bootstrap_core_schema(
    registry: &mut SchemaRegistry<'_>,
) -> Result<BootstrapStats, SchemaError> {
    let mut stats = BootstrapStats::default();
    for def in core_schema_definitions() {
        if registry.get_definition_by_type(def.type_id)?.is_some() {
            stats.existing += 1;
            continue;
        }
        registry.register_definition_with_id(&def, definition_id_for(def.type_id))?;
        stats.inserted += 1;
    }
    debug!(
        inserted = stats.inserted,
        existing = stats.existing,
        "core schema bootstrapped"
    );
    Ok(stats)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn definition_ids_are_deterministic_and_tagged() {
        let id = definition_id_for(TYPE_STRING);
        assert_eq!(&id.0[..8], b"REFRACT0");
        assert_eq!(id.0[15], 0x01);
        assert_eq!(id.0[14], 0x10);
        assert_eq!(definition_id_for(TYPE_STRING), id);
        assert_ne!(definition_id_for(TYPE_U64), id);
    }

    #[test]
    fn core_schema_type_ids_are_unique_and_nonzero() {
        let defs = core_schema_definitions();
        let mut seen = std::collections::HashSet::new();
        for def in &defs {
            assert_ne!(def.type_id.0, 0, "{}", def.name);
            assert!(seen.insert(def.type_id.0), "duplicate {}", def.name);
            assert!(!def.name.is_empty());
        }
        assert_eq!(defs.len(), 20);
    }
}
