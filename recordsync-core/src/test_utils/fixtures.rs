//! Test fixtures built from JSON literals

use crate::core_doc::{Document, Patch, Path};
use crate::core_records::{MemoryRecordStore, Record, RecordId};
use crate::core_sync::record_to_crdt;
use serde_json::Value;
use std::collections::BTreeMap;

/// A record from a JSON object literal
pub fn rec(value: Value) -> Record {
    Record::from_value(value).expect("record fixture must be a JSON object")
}

/// A path from a JSON array such as `["store", "shape:1", "points", 0]`
pub fn path(value: Value) -> Path {
    serde_json::from_value(value).expect("path fixture must be an array of keys and indices")
}

/// A patch batch from its JSON wire form
pub fn patches(value: Value) -> Vec<Patch> {
    serde_json::from_value(value).expect("patch fixture must be an array of patches")
}

fn keyed(records: Vec<Value>) -> BTreeMap<RecordId, Record> {
    records
        .into_iter()
        .map(|value| {
            let record = rec(value);
            let id = record.id().expect("record fixture needs an id");
            (id, record)
        })
        .collect()
}

/// A lookup map keyed by each record's own `id`
pub fn store_of(records: Vec<Value>) -> BTreeMap<RecordId, Record> {
    keyed(records)
}

pub fn memory_store_of(records: Vec<Value>) -> MemoryRecordStore {
    MemoryRecordStore::with_records(keyed(records))
}

/// A document whose store holds `records`
pub fn doc_of(records: Vec<Value>) -> Document {
    let mut doc = Document::new();
    for (id, record) in keyed(records) {
        doc.store_mut().insert(id, record_to_crdt(&record));
    }
    doc
}

/// Builder for record fixtures
pub struct TestRecordBuilder {
    record: Record,
}

impl TestRecordBuilder {
    pub fn new(id: &str) -> Self {
        Self { record: Record::with_id(&RecordId::from(id)) }
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.record.insert(key, value);
        self
    }

    pub fn locked(self) -> Self {
        self.field("isLocked", Value::Bool(true))
    }

    pub fn build(self) -> Record {
        self.record
    }
}
