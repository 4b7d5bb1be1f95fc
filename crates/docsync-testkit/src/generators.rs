//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use docsync_core::Body;
use docsync_replicate::ConflictPolicy;

/// Generate a document id.
pub fn doc_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate an attachment name.
pub fn attachment_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._]{0,11}".prop_map(String::from)
}

/// Generate a scalar JSON value.
pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::String),
    ]
}

/// Generate a JSON value nested up to three levels.
pub fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Generate a document body (always a JSON object).
pub fn body() -> impl Strategy<Value = Body> {
    prop::collection::btree_map("[a-z_]{1,8}", value(), 0..5)
        .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>()))
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a conflict policy.
pub fn conflict_policy() -> impl Strategy<Value = ConflictPolicy> {
    prop_oneof![
        Just(ConflictPolicy::Raise),
        Just(ConflictPolicy::KeepLocal),
        Just(ConflictPolicy::KeepRemote),
        Just(ConflictPolicy::Continue),
    ]
}

/// Initial state of one document on both sides before a first repair.
#[derive(Debug, Clone)]
pub struct DocumentScenario {
    pub id: String,
    pub local: Option<Body>,
    pub remote: Option<Body>,
}

/// Generate a document present on at least one side.
///
/// Roughly a third of the generated documents hold the same body on both
/// sides.
pub fn document_scenario() -> impl Strategy<Value = DocumentScenario> {
    (doc_id(), body(), body(), 0u8..5).prop_map(|(id, a, b, shape)| {
        let (local, remote) = match shape {
            0 => (Some(a), None),
            1 => (None, Some(a)),
            2 => (Some(a), Some(b)),
            _ => (Some(a.clone()), Some(a)),
        };
        DocumentScenario { id, local, remote }
    })
}

/// Generate a set of scenarios with distinct ids.
pub fn scenarios(max: usize) -> impl Strategy<Value = Vec<DocumentScenario>> {
    prop::collection::vec(document_scenario(), 0..=max).prop_map(|mut items| {
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items.dedup_by(|a, b| a.id == b.id);
        items
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_bodies_are_objects(body in body()) {
            prop_assert!(body.is_object());
            prop_assert!(docsync_core::ensure_object(&body).is_ok());
        }

        #[test]
        fn scenarios_have_unique_ids(items in scenarios(8)) {
            let mut ids: Vec<_> = items.iter().map(|s| s.id.clone()).collect();
            ids.dedup();
            prop_assert_eq!(ids.len(), items.len());
            for item in &items {
                prop_assert!(item.local.is_some() || item.remote.is_some());
            }
        }
    }
}
