//! Shared proptest strategies for JSON documents.
use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Arbitrary JSON values: finite numbers, short keys, bounded depth.
pub(crate) fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-zA-Z0-9_ ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            json_object_of(inner),
        ]
    })
}

/// Arbitrary JSON objects whose members come from `member`.
pub(crate) fn json_object_of(member: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,6}", member, 0..6)
        .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>()))
}

pub(crate) fn json_object() -> impl Strategy<Value = Value> {
    json_object_of(json_value())
}
