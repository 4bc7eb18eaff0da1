// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structured payload codec.
//!
//! Every payload and edge-property blob in the store is the CBOR encoding of
//! a JSON-shaped value tree (null, bool, integer, float, string, array,
//! map). [`encode_value`] / [`decode_value`] are exact inverses; the JSON
//! string bridge exists for authoring layers that speak JSON text.

use crate::error::StoreError;

/// The JSON-like value tree payloads are built from.
pub use ciborium::value::Value;

/// Encodes a value tree to CBOR bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|err| StoreError::Decode(err.to_string()))?;
    Ok(out)
}

/// Decodes CBOR bytes back into a value tree.
pub fn decode_value(bytes: &[u8]) -> Result<Value, StoreError> {
    ciborium::from_reader(bytes).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Parses JSON text and encodes the resulting tree as CBOR.
pub fn cbor_from_json(json_text: &str) -> Result<Vec<u8>, StoreError> {
    let value: Value =
        serde_json::from_str(json_text).map_err(|err| StoreError::Decode(err.to_string()))?;
    encode_value(&value)
}

/// Decodes CBOR bytes and renders the tree as compact JSON text.
pub fn json_from_cbor(bytes: &[u8]) -> Result<String, StoreError> {
    let value = decode_value(bytes)?;
    serde_json::to_string(&value).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Encodes a one-entry string map, the common shape for small edge props.
pub fn cbor_kv(key: &str, value: &str) -> Result<Vec<u8>, StoreError> {
    encode_value(&Value::Map(vec![(
        Value::Text(key.to_owned()),
        Value::Text(value.to_owned()),
    )]))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn json_bridge_round_trips_a_document() {
        let json = r#"{"name":"probe","count":3,"live":true,"tags":["a","b"],"extra":null}"#;
        let bytes = cbor_from_json(json).unwrap();
        let back = json_from_cbor(&bytes).unwrap();
        let lhs: serde_json::Value = serde_json::from_str(json).unwrap();
        let rhs: serde_json::Value = serde_json::from_str(&back).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn kv_helper_produces_a_single_entry_map() {
        let bytes = cbor_kv("hook", "rename_foo_to_bar").unwrap();
        let Value::Map(entries) = decode_value(&bytes).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Value::Text("hook".into()));
        assert_eq!(entries[0].1, Value::Text("rename_foo_to_bar".into()));
    }

    #[test]
    fn malformed_bytes_surface_decode_errors() {
        assert!(matches!(
            decode_value(&[0xff, 0x00, 0x01]),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            cbor_from_json("{not json"),
            Err(StoreError::Decode(_))
        ));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Integer(n.into())),
            any::<f64>()
                .prop_filter("finite floats only", |f| f.is_finite())
                .prop_map(Value::Float),
            "[a-z0-9 ]{0,12}".prop_map(Value::Text),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}".prop_map(Value::Text), inner), 0..4)
                    .prop_map(Value::Map),
            ]
        })
    }

    proptest! {
        #[test]
        fn encode_decode_round_trips(value in arb_value()) {
            let bytes = encode_value(&value).unwrap();
            prop_assert_eq!(decode_value(&bytes).unwrap(), value);
        }
    }
}
