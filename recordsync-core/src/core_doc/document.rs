/*
    document.rs - The replicated document

    Top level: `store` maps record identifiers to record-shaped value trees,
    `schema` is carried along untouched.
*/

use super::value::CrdtValue;
use crate::core_records::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key of the record map at the document root
pub const STORE_KEY: &str = "store";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<BTreeMap<RecordId, CrdtValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Document {
    /// A document with an empty, present `store`
    pub fn new() -> Self {
        Document { store: Some(BTreeMap::new()), schema: None }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The record map, created on first mutable access
    pub fn store_mut(&mut self) -> &mut BTreeMap<RecordId, CrdtValue> {
        self.store.get_or_insert_with(BTreeMap::new)
    }

    pub fn record(&self, id: &RecordId) -> Option<&CrdtValue> {
        self.store.as_ref().and_then(|store| store.get(id))
    }

    pub fn record_mut(&mut self, id: &RecordId) -> Option<&mut CrdtValue> {
        self.store.as_mut().and_then(|store| store.get_mut(id))
    }

    pub fn record_count(&self) -> usize {
        self.store.as_ref().map_or(0, BTreeMap::len)
    }
}
