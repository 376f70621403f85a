/*
    codec.rs - Plain <-> document value transcoding

    to_crdt: strings become atomic, containers are converted element-wise,
    other scalars pass through.
    to_plain: atomic strings and text become plain strings, counters become
    numbers, recursively.
*/

use crate::core_doc::{AtomicString, CrdtValue, Document};
use crate::core_records::{Record, RecordId, StoreSnapshot};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::warn;

pub fn to_crdt(value: &Value) -> CrdtValue {
    match value {
        Value::Null => CrdtValue::Null,
        Value::Bool(b) => CrdtValue::Bool(*b),
        Value::Number(n) => CrdtValue::Number(n.clone()),
        Value::String(s) => CrdtValue::Atomic(AtomicString::new(s.as_str())),
        Value::Array(items) => CrdtValue::List(items.iter().map(to_crdt).collect()),
        Value::Object(map) => CrdtValue::Map(map.iter().map(|(k, v)| (k.clone(), to_crdt(v))).collect()),
    }
}

pub fn to_plain(value: &CrdtValue) -> Value {
    match value {
        CrdtValue::Null => Value::Null,
        CrdtValue::Bool(b) => Value::Bool(*b),
        CrdtValue::Number(n) => Value::Number(n.clone()),
        CrdtValue::Atomic(s) => Value::String(s.as_str().to_string()),
        CrdtValue::Text(s) => Value::String(s.clone()),
        CrdtValue::Counter(c) => Value::Number(Number::from(*c)),
        CrdtValue::List(items) => Value::Array(items.iter().map(to_plain).collect()),
        CrdtValue::Map(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), to_plain(v))).collect::<Map<_, _>>())
        }
    }
}

impl From<Value> for CrdtValue {
    fn from(value: Value) -> Self {
        to_crdt(&value)
    }
}

impl From<CrdtValue> for Value {
    fn from(value: CrdtValue) -> Self {
        to_plain(&value)
    }
}

pub fn record_to_crdt(record: &Record) -> CrdtValue {
    CrdtValue::Map(record.as_map().iter().map(|(k, v)| (k.clone(), to_crdt(v))).collect())
}

/// Decode a document-side record; `None` unless it is a map
pub fn record_from_crdt(value: &CrdtValue) -> Option<Record> {
    Record::from_value(to_plain(value))
}

/// The document holding exactly the records of `snapshot`
pub fn document_from_snapshot(snapshot: &StoreSnapshot) -> Document {
    let store: BTreeMap<RecordId, CrdtValue> =
        snapshot.store.iter().map(|(id, record)| (id.clone(), record_to_crdt(record))).collect();
    Document { store: Some(store), schema: snapshot.schema.clone() }
}

/// Decode every record of the document's store. `None` when the store is absent.
pub fn snapshot_from_document(doc: &Document) -> Option<StoreSnapshot> {
    let store = doc.store.as_ref()?;
    let mut records = BTreeMap::new();
    for (id, value) in store {
        match record_from_crdt(value) {
            Some(record) => {
                records.insert(id.clone(), record);
            }
            None => warn!(id = %id, kind = value.kind(), "skipping non-object record in document"),
        }
    }
    Some(StoreSnapshot { store: records, schema: doc.schema.clone() })
}
