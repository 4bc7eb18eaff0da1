// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Definition payload codec.
//!
//! Definitions are stored as CBOR maps with a fixed key set. Decoding is
//! deliberately lenient: absent optional sections default to empty, and the
//! legacy `return_type` signature form is still accepted (mapped to a single
//! required `result` output). Encoding always writes the current form.

use silt_store::{encode_value, StoreError, TypeId, Value};

use crate::error::SchemaError;
use crate::types::{
    FieldDefinition, OperationDefinition, OperationScope, ParameterDefinition, RelationshipSpec,
    SignatureDefinition, TypeDefinition,
};

fn decode_err(message: impl Into<String>) -> SchemaError {
    SchemaError::Store(StoreError::Decode(message.into()))
}

fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

fn unsigned(value: u64) -> Value {
    Value::Integer(value.into())
}

fn scope_label(scope: OperationScope) -> &'static str {
    match scope {
        OperationScope::Class => "class",
        OperationScope::Object => "object",
    }
}

fn scope_from_label(label: &str) -> OperationScope {
    if label == "class" {
        OperationScope::Class
    } else {
        OperationScope::Object
    }
}

fn parameter_value(param: &ParameterDefinition) -> Value {
    Value::Map(vec![
        (text("name"), text(param.name.clone())),
        (text("type_id"), unsigned(param.type_id.0)),
        (text("optional"), Value::Bool(param.optional)),
    ])
}

fn signature_value(signature: &SignatureDefinition) -> Value {
    Value::Map(vec![
        (
            text("params"),
            Value::Array(signature.params.iter().map(parameter_value).collect()),
        ),
        (
            text("outputs"),
            Value::Array(signature.outputs.iter().map(parameter_value).collect()),
        ),
    ])
}

fn operation_value(op: &OperationDefinition) -> Value {
    Value::Map(vec![
        (text("name"), text(op.name.clone())),
        (text("scope"), text(scope_label(op.scope))),
        (text("signature"), signature_value(&op.signature)),
    ])
}

fn field_value(field: &FieldDefinition) -> Value {
    let mut entries = vec![
        (text("name"), text(field.name.clone())),
        (text("type_id"), unsigned(field.type_id.0)),
        (text("required"), Value::Bool(field.required)),
    ];
    if let Some(default_json) = &field.default_json {
        entries.push((text("default_json"), text(default_json.clone())));
    }
    Value::Map(entries)
}

fn relationship_value(rel: &RelationshipSpec) -> Value {
    Value::Map(vec![
        (text("role"), text(rel.role.clone())),
        (text("cardinality"), text(rel.cardinality.clone())),
        (text("target"), text(rel.target.clone())),
    ])
}

/// Encodes a definition to its CBOR payload bytes.
///
/// `supersedes_definition_id` and `migration_hook` are not part of the
/// payload; they surface as edges at registration time.
pub fn encode_definition(def: &TypeDefinition) -> Result<Vec<u8>, SchemaError> {
    let mut entries = vec![
        (text("type_id"), unsigned(def.type_id.0)),
        (text("name"), text(def.name.clone())),
        (text("namespace"), text(def.namespace.clone())),
        (text("version"), unsigned(def.version)),
    ];
    if let Some(renderer) = &def.preferred_renderer {
        entries.push((text("preferred_renderer"), text(renderer.clone())));
    }
    if !def.type_params.is_empty() {
        entries.push((
            text("type_params"),
            Value::Array(def.type_params.iter().cloned().map(Value::Text).collect()),
        ));
    }
    entries.push((
        text("fields"),
        Value::Array(def.fields.iter().map(field_value).collect()),
    ));
    entries.push((
        text("operations"),
        Value::Array(def.operations.iter().map(operation_value).collect()),
    ));
    entries.push((
        text("relationships"),
        Value::Array(def.relationships.iter().map(relationship_value).collect()),
    ));
    Ok(encode_value(&Value::Map(entries))?)
}

fn entries_of(value: &Value, context: &str) -> Result<Vec<(Value, Value)>, SchemaError> {
    match value {
        Value::Map(entries) => Ok(entries.clone()),
        _ => Err(decode_err(format!("{context} is not a map"))),
    }
}

fn lookup<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries.iter().find_map(|(entry_key, entry_value)| {
        matches!(entry_key, Value::Text(name) if name == key).then_some(entry_value)
    })
}

fn lookup_text(entries: &[(Value, Value)], key: &str) -> Option<String> {
    match lookup(entries, key) {
        Some(Value::Text(value)) => Some(value.clone()),
        _ => None,
    }
}

fn lookup_u64(entries: &[(Value, Value)], key: &str) -> Option<u64> {
    match lookup(entries, key) {
        Some(Value::Integer(value)) => u64::try_from(i128::from(*value)).ok(),
        _ => None,
    }
}

fn lookup_bool(entries: &[(Value, Value)], key: &str) -> Option<bool> {
    match lookup(entries, key) {
        Some(Value::Bool(value)) => Some(*value),
        _ => None,
    }
}

fn lookup_array<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a [Value]> {
    match lookup(entries, key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn parameter_from(value: &Value) -> Result<ParameterDefinition, SchemaError> {
    let entries = entries_of(value, "parameter")?;
    Ok(ParameterDefinition {
        name: lookup_text(&entries, "name").unwrap_or_default(),
        type_id: TypeId(lookup_u64(&entries, "type_id").unwrap_or_default()),
        optional: lookup_bool(&entries, "optional").unwrap_or_default(),
    })
}

fn signature_from(value: &Value) -> Result<SignatureDefinition, SchemaError> {
    let entries = entries_of(value, "signature")?;
    let mut signature = SignatureDefinition::default();
    if let Some(items) = lookup_array(&entries, "params") {
        for item in items {
            signature.params.push(parameter_from(item)?);
        }
    }
    if let Some(items) = lookup_array(&entries, "outputs") {
        for item in items {
            signature.outputs.push(parameter_from(item)?);
        }
    } else if let Some(return_type) = lookup_u64(&entries, "return_type") {
        signature.outputs.push(ParameterDefinition {
            name: "result".into(),
            type_id: TypeId(return_type),
            optional: false,
        });
    }
    Ok(signature)
}

fn operation_from(value: &Value) -> Result<OperationDefinition, SchemaError> {
    let entries = entries_of(value, "operation")?;
    let scope = lookup_text(&entries, "scope")
        .map_or(OperationScope::Object, |label| scope_from_label(&label));
    let signature = match lookup(&entries, "signature") {
        Some(value) => signature_from(value)?,
        None => SignatureDefinition::default(),
    };
    Ok(OperationDefinition {
        name: lookup_text(&entries, "name").unwrap_or_default(),
        scope,
        signature,
    })
}

fn field_from(value: &Value) -> Result<FieldDefinition, SchemaError> {
    let entries = entries_of(value, "field")?;
    Ok(FieldDefinition {
        name: lookup_text(&entries, "name").unwrap_or_default(),
        type_id: TypeId(lookup_u64(&entries, "type_id").unwrap_or_default()),
        required: lookup_bool(&entries, "required").unwrap_or_default(),
        default_json: lookup_text(&entries, "default_json"),
    })
}

fn relationship_from(value: &Value) -> Result<RelationshipSpec, SchemaError> {
    let entries = entries_of(value, "relationship")?;
    Ok(RelationshipSpec {
        role: lookup_text(&entries, "role").unwrap_or_default(),
        cardinality: lookup_text(&entries, "cardinality").unwrap_or_default(),
        target: lookup_text(&entries, "target").unwrap_or_default(),
    })
}

/// Decodes a definition payload.
pub fn decode_definition(payload: &[u8]) -> Result<TypeDefinition, SchemaError> {
    let value = silt_store::decode_value(payload)?;
    let entries = entries_of(&value, "definition")?;

    let mut def = TypeDefinition::new(
        TypeId(lookup_u64(&entries, "type_id").unwrap_or_default()),
        lookup_text(&entries, "name").unwrap_or_default(),
        lookup_text(&entries, "namespace").unwrap_or_default(),
    );
    def.version = lookup_u64(&entries, "version").unwrap_or(1);
    def.preferred_renderer = lookup_text(&entries, "preferred_renderer");
    if let Some(items) = lookup_array(&entries, "type_params") {
        for item in items {
            match item {
                Value::Text(param) => def.type_params.push(param.clone()),
                _ => return Err(decode_err("type_params entry is not a string")),
            }
        }
    }
    if let Some(items) = lookup_array(&entries, "fields") {
        for item in items {
            def.fields.push(field_from(item)?);
        }
    }
    if let Some(items) = lookup_array(&entries, "operations") {
        for item in items {
            def.operations.push(operation_from(item)?);
        }
    }
    if let Some(items) = lookup_array(&entries, "relationships") {
        for item in items {
            def.relationships.push(relationship_from(item)?);
        }
    }
    Ok(def)
}

/// Reads a migration hook label from supersedes-link edge props.
pub(crate) fn migration_hook_from_props(props: &[u8]) -> Result<Option<String>, SchemaError> {
    if props.is_empty() {
        return Ok(None);
    }
    let value = silt_store::decode_value(props)?;
    let entries = entries_of(&value, "migration hook props")?;
    lookup_text(&entries, "hook")
        .map(Some)
        .ok_or_else(|| decode_err("migration hook props missing hook"))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_definition() -> TypeDefinition {
        let mut def = TypeDefinition::new(TypeId(0xDADA), "Probe", "Demo");
        def.version = 3;
        def.preferred_renderer = Some("table".into());
        def.type_params = vec!["T".into()];
        def.fields.push(FieldDefinition {
            name: "label".into(),
            type_id: TypeId(0x1001),
            required: true,
            default_json: None,
        });
        def.fields.push(FieldDefinition {
            name: "count".into(),
            type_id: TypeId(0x1002),
            required: false,
            default_json: Some("0".into()),
        });
        def.operations.push(OperationDefinition {
            name: "emit".into(),
            scope: OperationScope::Object,
            signature: SignatureDefinition {
                params: vec![
                    ParameterDefinition {
                        name: "target".into(),
                        type_id: TypeId(0x1001),
                        optional: false,
                    },
                    ParameterDefinition {
                        name: "level".into(),
                        type_id: TypeId(0x1002),
                        optional: true,
                    },
                ],
                outputs: vec![ParameterDefinition {
                    name: "ok".into(),
                    type_id: TypeId(0x1003),
                    optional: false,
                }],
            },
        });
        def.operations.push(OperationDefinition {
            name: "reset".into(),
            scope: OperationScope::Class,
            signature: SignatureDefinition::default(),
        });
        def.relationships.push(RelationshipSpec {
            role: "owner".into(),
            cardinality: "one".into(),
            target: "Session".into(),
        });
        def
    }

    #[test]
    fn definition_round_trips() {
        let def = sample_definition();
        let bytes = encode_definition(&def).unwrap();
        assert_eq!(decode_definition(&bytes).unwrap(), def);
    }

    #[test]
    fn supersedes_inputs_are_not_encoded() {
        let mut def = sample_definition();
        def.supersedes_definition_id = Some(silt_store::ObjectId::random());
        def.migration_hook = Some("rename".into());
        let bytes = encode_definition(&def).unwrap();
        let decoded = decode_definition(&bytes).unwrap();
        assert!(decoded.supersedes_definition_id.is_none());
        assert!(decoded.migration_hook.is_none());
    }

    #[test]
    fn legacy_return_type_signature_is_accepted() {
        let payload = encode_value(&Value::Map(vec![
            (Value::Text("type_id".into()), Value::Integer(9.into())),
            (Value::Text("name".into()), Value::Text("Legacy".into())),
            (Value::Text("namespace".into()), Value::Text("Demo".into())),
            (Value::Text("version".into()), Value::Integer(1.into())),
            (
                Value::Text("operations".into()),
                Value::Array(vec![Value::Map(vec![
                    (Value::Text("name".into()), Value::Text("poll".into())),
                    (
                        Value::Text("signature".into()),
                        Value::Map(vec![(
                            Value::Text("return_type".into()),
                            Value::Integer(0x1002.into()),
                        )]),
                    ),
                ])]),
            ),
        ]))
        .unwrap();
        let decoded = decode_definition(&payload).unwrap();
        assert_eq!(decoded.operations.len(), 1);
        let op = &decoded.operations[0];
        assert_eq!(op.scope, OperationScope::Object);
        assert_eq!(op.signature.outputs.len(), 1);
        assert_eq!(op.signature.outputs[0].name, "result");
        assert_eq!(op.signature.outputs[0].type_id, TypeId(0x1002));
    }

    #[test]
    fn non_map_payload_is_a_decode_error() {
        let bytes = encode_value(&Value::Integer(5.into())).unwrap();
        assert!(decode_definition(&bytes).is_err());
    }

    #[test]
    fn hook_props_round_trip() {
        let props = silt_store::cbor_kv("hook", "rename_foo_to_bar").unwrap();
        assert_eq!(
            migration_hook_from_props(&props).unwrap().as_deref(),
            Some("rename_foo_to_bar")
        );
        assert_eq!(migration_hook_from_props(&[]).unwrap(), None);
        let wrong = silt_store::cbor_kv("other", "x").unwrap();
        assert!(migration_hook_from_props(&wrong).is_err());
    }
}
