/*
    diff_encoder.rs - Record store change sets -> document mutations

    Added and removed records are written wholesale. Updated records are
    reconciled field by field so that only the values that actually changed
    produce document patches.

    Records flagged with the locked field are local-only and are never
    written into the document.
*/

use super::codec::{record_to_crdt, to_crdt};
use crate::core_doc::{CrdtValue, Document};
use crate::core_records::ChangeSet;
use serde_json::Value;
use tracing::{debug, warn};

/// Counts of what one `encode` call wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped_locked: usize,
}

#[derive(Debug, Clone)]
pub struct DiffEncoder {
    locked_field: String,
}

impl Default for DiffEncoder {
    fn default() -> Self {
        DiffEncoder::new("isLocked")
    }
}

impl DiffEncoder {
    pub fn new(locked_field: impl Into<String>) -> Self {
        DiffEncoder { locked_field: locked_field.into() }
    }

    pub fn locked_field(&self) -> &str {
        &self.locked_field
    }

    /// Mirror `changes` into `doc`. Must run inside the engine's transaction.
    pub fn encode(&self, doc: &mut Document, changes: &ChangeSet) -> EncodeStats {
        let mut stats = EncodeStats::default();
        let store = doc.store_mut();

        for (id, record) in &changes.added {
            if record.is_locked(&self.locked_field) {
                debug!(id = %id, "locked record not synchronized");
                stats.skipped_locked += 1;
                continue;
            }
            store.insert(id.clone(), record_to_crdt(record));
            stats.added += 1;
        }

        for (id, (_, record)) in &changes.updated {
            match store.get_mut(id) {
                Some(current) => reconcile(current, &record.clone().into_value()),
                None if record.is_locked(&self.locked_field) => {
                    debug!(id = %id, "locked record not synchronized");
                    stats.skipped_locked += 1;
                    continue;
                }
                None => {
                    warn!(id = %id, "updated record absent from the document, inserting it whole");
                    store.insert(id.clone(), record_to_crdt(record));
                }
            }
            stats.updated += 1;
        }

        for id in changes.removed.keys() {
            if store.remove(id).is_some() {
                stats.removed += 1;
            }
        }

        debug!(
            added = stats.added,
            updated = stats.updated,
            removed = stats.removed,
            skipped = stats.skipped_locked,
            "encoded store changes"
        );
        stats
    }
}

/// Bring `current` to the plain value `desired` with as few writes as possible
pub fn reconcile(current: &mut CrdtValue, desired: &Value) {
    match desired {
        Value::Array(items) => {
            let list = match current {
                CrdtValue::List(list) => list,
                other => {
                    *other = to_crdt(desired);
                    return;
                }
            };
            for (index, item) in items.iter().enumerate() {
                match list.get_mut(index) {
                    Some(existing) => reconcile(existing, item),
                    None => list.push(to_crdt(item)),
                }
            }
            list.truncate(items.len());
        }
        Value::Object(fields) => {
            let map = match current {
                CrdtValue::Map(map) => map,
                other => {
                    *other = to_crdt(desired);
                    return;
                }
            };
            for (key, value) in fields {
                match map.get_mut(key) {
                    Some(existing) => reconcile(existing, value),
                    None => {
                        map.insert(key.clone(), to_crdt(value));
                    }
                }
            }
            map.retain(|key, _| fields.contains_key(key));
        }
        scalar => {
            if !current.plain_eq(scalar) {
                *current = overwrite(current, scalar);
            }
        }
    }
}

// Text stays text and counters stay counters
fn overwrite(current: &CrdtValue, desired: &Value) -> CrdtValue {
    match (current, desired) {
        (CrdtValue::Text(_), Value::String(s)) => CrdtValue::Text(s.clone()),
        (CrdtValue::Counter(_), Value::Number(n)) => match n.as_i64() {
            Some(count) => CrdtValue::Counter(count),
            None => to_crdt(desired),
        },
        _ => to_crdt(desired),
    }
}
