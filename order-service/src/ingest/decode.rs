//! Payload decoding
//!
//! A message carries either a JSON array of orders or one order object.
//! Fields missing from an order decode to zero values and are caught by
//! validation, so only the payload shape can make a message malformed.

use serde_json::Value;
use shared::Order;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid order JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("order array is empty")]
    EmptyBatch,

    /// Top level, or an array element, is not a JSON object
    #[error("expected an order object, found {0}")]
    NotAnObject(&'static str),
}

/// Decode an order array, or a single order object as a one-element batch
pub fn decode_orders(payload: &[u8]) -> Result<Vec<Order>, DecodeError> {
    match serde_json::from_slice::<Value>(payload)? {
        Value::Array(items) if items.is_empty() => Err(DecodeError::EmptyBatch),
        Value::Array(items) => items.into_iter().map(decode_order).collect(),
        value => decode_order(value).map(|order| vec![order]),
    }
}

fn decode_order(value: Value) -> Result<Order, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject(kind(&value)));
    }
    Ok(serde_json::from_value(value)?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Best-effort `order_uid` of a payload that may not decode as an order
pub fn peek_order_uid(payload: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    let uid = match &value {
        Value::Array(items) => items.first()?.get("order_uid")?,
        other => other.get("order_uid")?,
    };
    uid.as_str()
        .filter(|uid| !uid.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_order;

    #[test]
    fn test_single_object_equals_one_element_array() {
        let order = sample_order("equiv");
        let single = serde_json::to_vec(&order).unwrap();
        let array = serde_json::to_vec(&vec![order.clone()]).unwrap();

        let from_single = decode_orders(&single).unwrap();
        let from_array = decode_orders(&array).unwrap();
        assert_eq!(from_single, from_array);
        assert_eq!(from_single, vec![order]);
    }

    #[test]
    fn test_array_keeps_order() {
        let orders = vec![sample_order("a"), sample_order("b"), sample_order("c")];
        let decoded = decode_orders(&serde_json::to_vec(&orders).unwrap()).unwrap();
        let uids: Vec<&str> = decoded.iter().map(|o| o.order_uid.as_str()).collect();
        assert_eq!(uids, ["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(decode_orders(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_orders(b""), Err(DecodeError::Json(_))));
        assert!(matches!(decode_orders(b"[]"), Err(DecodeError::EmptyBatch)));
        assert!(matches!(decode_orders(b"[[]]"), Err(DecodeError::NotAnObject("an array"))));
        assert!(matches!(decode_orders(b"42"), Err(DecodeError::NotAnObject("a number"))));
        assert!(matches!(
            decode_orders(br#"[{"order_uid": "x"}, "oops"]"#),
            Err(DecodeError::NotAnObject("a string"))
        ));
        // Present but mistyped is still a decode failure
        assert!(matches!(
            decode_orders(br#"{"order_uid": "x", "sm_id": "many"}"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_incomplete_order_decodes_with_zero_values() {
        let mut incomplete = serde_json::to_value(sample_order("partial")).unwrap();
        incomplete.as_object_mut().unwrap().remove("entry");
        incomplete.as_object_mut().unwrap().remove("delivery");
        let payload = serde_json::to_vec(&vec![
            serde_json::to_value(sample_order("whole")).unwrap(),
            incomplete,
        ])
        .unwrap();

        let decoded = decode_orders(&payload).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], sample_order("whole"));
        assert!(decoded[1].entry.is_empty());
        assert_eq!(decoded[1].delivery, shared::models::Delivery::default());
    }

    #[test]
    fn test_peek_order_uid() {
        assert_eq!(
            peek_order_uid(br#"{"order_uid": "abc", "payment": 1}"#).as_deref(),
            Some("abc")
        );
        assert_eq!(
            peek_order_uid(br#"[{"order_uid": "first"}, {"order_uid": "second"}]"#).as_deref(),
            Some("first")
        );
        assert_eq!(peek_order_uid(br#"{"order_uid": ""}"#), None);
        assert_eq!(peek_order_uid(br#"{"order_uid": 5}"#), None);
        assert_eq!(peek_order_uid(b"garbage"), None);
    }
}
