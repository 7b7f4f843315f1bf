//! Property-based tests using proptest

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use tagwire_codec::{decode, encode, encoded_len, Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<f64>().prop_map(Value::number),
        ".{0,24}".prop_map(Value::Text),
    ]
}

// Short keys from a small alphabet make tag, count and key bytes overlap often.
fn key() -> impl Strategy<Value = String> {
    "[a-c]{0,3}"
}

fn tree() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec((key(), inner), 0..6)
                .prop_map(|entries| Value::Map(entries.into_iter().collect::<Map>())),
        ]
    })
}

// Property: flat lists decode to exactly what was encoded
proptest! {
    #[test]
    fn prop_flat_list_roundtrip(items in prop::collection::vec(leaf(), 0..64)) {
        let value = Value::List(items);
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }
}

// Property: flat maps decode to exactly what was encoded, in order
proptest! {
    #[test]
    fn prop_flat_map_roundtrip(entries in prop::collection::vec((".{0,12}", leaf()), 0..32)) {
        let map: Map = entries.into_iter().collect();
        let value = Value::Map(map);
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }
}

// Property: encoder output always decodes, to a tree with the same encoding.
// Nested 0x01/0x02 tags are ambiguous, so the tree itself may differ.
proptest! {
    #[test]
    fn prop_nested_messages_decode(items in prop::collection::vec(tree(), 0..8)) {
        let value = Value::List(items);
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(encoded_len(&value).unwrap(), bytes.len());
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(encode(&decoded).unwrap(), bytes);
    }
}

// Property: lists of text lists decode to exactly what was encoded
proptest! {
    #[test]
    fn prop_nested_lists_of_text_roundtrip(
        rows in prop::collection::vec(prop::collection::vec(".{0,12}", 0..8), 0..32),
    ) {
        let value: Value = rows
            .into_iter()
            .map(|row| row.into_iter().map(Value::Text).collect::<Value>())
            .collect();
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }
}

// Property: encoding is deterministic
proptest! {
    #[test]
    fn prop_encoding_deterministic(items in prop::collection::vec(tree(), 0..8)) {
        let value = Value::List(items);
        prop_assert_eq!(encode(&value).unwrap(), encode(&value).unwrap());
    }
}

// Property: arbitrary bytes never panic the decoder
proptest! {
    #[test]
    fn prop_decode_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode(&data);
    }
}

// Property: arbitrary bytes behind a list header never panic the decoder
proptest! {
    #[test]
    fn prop_decode_arbitrary_list_body(
        count in 0u32..16,
        body in prop::collection::vec(0u8..8, 0..256),
    ) {
        let mut data = vec![0x01];
        data.extend_from_slice(&count.to_be_bytes());
        data.extend_from_slice(&body);
        let _ = decode(&data);
    }
}
