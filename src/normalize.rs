use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::VecDeque;

use crate::gateway::ApiError;

/// Envelope keys tried first on every node, in priority order. Only when none
/// of them is present does the search fall back to scanning all keys.
const LIST_KEYS: [&str; 10] = [
    "items", "data", "result", "results", "value", "values", "records", "entities", "content",
    "list",
];

/// Finds the payload array inside an arbitrary backend envelope.
///
/// The backend is not consistent about response shapes: some endpoints answer
/// a bare array, some wrap it as `{data: [...]}` or `{items: [...]}`, some
/// nest the wrapper a level deeper. Rather than teach every call site its
/// endpoint's quirk, this walks the response breadth-first: conventional
/// envelope keys are checked on each node before any other key, an array ends
/// the search, an object is queued for the next level. Values are trees, so
/// no revisit guard is needed, and the FIFO queue plus fixed key order keep
/// the result deterministic for a given input.
///
/// Returns an empty vec when no array is reachable at all.
pub fn extract_list(payload: &Value) -> Vec<Value> {
    if let Value::Array(items) = payload {
        return items.clone();
    }
    let Value::Object(root) = payload else {
        return Vec::new();
    };

    let mut queue: VecDeque<&Map<String, Value>> = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        let mut matched_priority = false;
        for key in LIST_KEYS {
            match node.get(key) {
                Some(Value::Array(items)) => return items.clone(),
                Some(Value::Object(inner)) => {
                    queue.push_back(inner);
                    matched_priority = true;
                }
                _ => {}
            }
        }
        if matched_priority {
            continue;
        }
        for (_, child) in node {
            match child {
                Value::Array(items) => return items.clone(),
                Value::Object(inner) => queue.push_back(inner),
                _ => {}
            }
        }
    }

    Vec::new()
}

/// Single-object counterpart of [`extract_list`]: peels one envelope layer by
/// trying a fixed set of field names and taking the first that holds an
/// object. Payloads that are not wrapped come back unchanged.
pub fn unwrap_entity<'a>(payload: &'a Value, keys: &[&str]) -> &'a Value {
    for key in keys {
        if let Some(inner) = payload.get(key) {
            if inner.is_object() {
                return inner;
            }
        }
    }
    payload
}

/// Generic envelope field names for single-entity responses.
pub const ENTITY_KEYS: [&str; 4] = ["data", "result", "record", "entity"];

pub fn parse_list<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>, ApiError> {
    extract_list(&payload)
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| ApiError::Parse(e.to_string())))
        .collect()
}

pub fn parse_entity<T: DeserializeOwned>(payload: Value, keys: &[&str]) -> Result<T, ApiError> {
    let inner = unwrap_entity(&payload, keys).clone();
    serde_json::from_value(inner).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_array_passes_through() {
        let payload = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(extract_list(&payload), payload.as_array().unwrap().clone());
    }

    #[test]
    fn priority_key_wins_over_sibling_order() {
        // "data" precedes "records" in the priority list even though the
        // object enumerates "records" first.
        let payload = json!({
            "records": [{"id": "wrong"}],
            "data": [{"id": "right"}],
        });
        let out = extract_list(&payload);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "right");

        // "items" outranks "data".
        let payload = json!({
            "data": [{"id": "wrong"}],
            "items": [{"id": "right"}],
        });
        assert_eq!(extract_list(&payload)[0]["id"], "right");
    }

    #[test]
    fn nested_envelope_is_found_breadth_first() {
        let payload = json!({"data": {"items": [{"id": 7}]}});
        let out = extract_list(&payload);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 7);
    }

    #[test]
    fn shallower_array_beats_deeper_one() {
        let payload = json!({
            "meta": {"paging": {"rows": [{"id": "deep"}]}},
            "data": {"values": [{"id": "shallow"}]},
        });
        assert_eq!(extract_list(&payload)[0]["id"], "shallow");
    }

    #[test]
    fn fallback_scans_unconventional_keys() {
        let payload = json!({"roomsById": {"collection": [{"id": 3}]}});
        let out = extract_list(&payload);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 3);
    }

    #[test]
    fn no_reachable_array_yields_empty() {
        assert!(extract_list(&json!({"a": {"b": {"c": 1}}})).is_empty());
        assert!(extract_list(&json!("just a string")).is_empty());
        assert!(extract_list(&json!(null)).is_empty());
        assert!(extract_list(&json!(42)).is_empty());
    }

    #[test]
    fn deterministic_for_same_input() {
        let payload = json!({
            "alpha": {"x": [1, 2]},
            "beta": {"y": [3, 4]},
        });
        let first = extract_list(&payload);
        for _ in 0..10 {
            assert_eq!(extract_list(&payload), first);
        }
    }

    #[test]
    fn unwrap_entity_takes_first_present_object() {
        let payload = json!({"deanProfile": {"name": "A"}, "data": {"name": "B"}});
        let inner = unwrap_entity(&payload, &["deanProfile", "profile", "data"]);
        assert_eq!(inner["name"], "A");
    }

    #[test]
    fn unwrap_entity_keeps_unwrapped_payload() {
        let payload = json!({"name": "plain"});
        assert_eq!(unwrap_entity(&payload, &ENTITY_KEYS), &payload);
    }

    #[test]
    fn unwrap_entity_skips_non_object_candidates() {
        let payload = json!({"data": null, "result": {"name": "C"}});
        assert_eq!(unwrap_entity(&payload, &ENTITY_KEYS)["name"], "C");
    }
}
