#![allow(dead_code)]

use edgetree::model::Record;
use serde_json::{Value, json};

pub const KEY: &str = "nodeKey";
pub const CHILD_KEY: &str = "childNodeKey";

/// Creates a record with the standard key fields and a small payload.
pub fn record(level: usize, key: &str, child: Option<&str>) -> Record {
    Record::from_value(
        level,
        json!({
            KEY: key,
            CHILD_KEY: child,
            "someProperty": { "someKey": level },
        }),
    )
    .unwrap()
}

/// root -> {child0, child1}, child1 -> child2 -> child3
pub fn chain_records() -> Vec<Record> {
    vec![
        record(0, "root", Some("child0")),
        record(0, "root", Some("child1")),
        record(1, "child0", None),
        record(1, "child1", Some("child2")),
        record(2, "child2", Some("child3")),
        record(3, "child3", None),
    ]
}

/// root -> {child0, child1, child2, child3}, all leaves
pub fn flat_records() -> Vec<Record> {
    let mut records: Vec<Record> = (0..4)
        .map(|i| record(0, "root", Some(&format!("child{i}"))))
        .collect();
    records.extend((0..4).map(|i| record(1, &format!("child{i}"), None)));
    records
}

/// root -> {child1, child2}, child2 -> {grandChild1, grandChild2, grandChild3}
pub fn wide_records() -> Vec<Record> {
    vec![
        record(0, "root", Some("child1")),
        record(0, "root", Some("child2")),
        record(1, "child1", None),
        record(1, "child2", Some("grandChild1")),
        record(1, "child2", Some("grandChild2")),
        record(1, "child2", Some("grandChild3")),
        record(2, "grandChild1", None),
        record(2, "grandChild2", None),
        record(2, "grandChild3", None),
    ]
}

/// root -> {a, b}, a -> shared -> leaf, b -> shared -> leaf
///
/// Key `shared` (and `leaf`) appear in two branches on the same level.
pub fn repeated_key_records() -> Vec<Record> {
    vec![
        record(0, "root", Some("a")),
        record(0, "root", Some("b")),
        record(1, "a", Some("shared")),
        record(1, "b", Some("shared")),
        record(2, "shared", Some("leaf")),
        record(2, "shared", Some("leaf")),
        record(3, "leaf", None),
        record(3, "leaf", None),
    ]
}

/// Payload for a node added by hand.
pub fn payload(key: &str) -> serde_json::Map<String, Value> {
    match json!({ KEY: key, "someProperty": { "someKey": 42 } }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}
