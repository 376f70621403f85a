/*
    patch_interpreter.rs - Document patches -> record store mutations

    Patches of one batch are applied in order onto per-record working
    copies; each record is committed once, as a whole replacement.

    Paths are split as  ["store", id, ..rest]  and `rest` addresses a
    location inside the record:
    - put     rest = [..parents, target, property]; missing `target` under a
              map becomes an empty map, then `property` is set
    - insert  rest = [..parents, list, index]
    - update  rest = [..parents, leaf]
    - splice  rest = [..parents, target, 0]; only position 0 is supported
    - del     rest = [] removes the record, otherwise removes a key or
              `length` list elements from the working copy; a nested del
              in a record neither stored nor touched by the batch is a no-op
    Deleted records never appear among the upserts of the same batch.
*/

use super::codec::to_plain;
use super::errors::{SyncError, SyncResult};
use crate::core_doc::{format_path, Patch, PathSegment};
use crate::core_records::{Record, RecordId, RecordLookup};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

/// Record store mutations produced by one patch batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreUpdate {
    pub upserts: BTreeMap<RecordId, Record>,
    pub deletions: BTreeSet<RecordId>,
}

impl StoreUpdate {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }
}

/// Translate `patches` against the current contents of the store
pub fn interpret<L: RecordLookup + ?Sized>(patches: &[Patch], lookup: &L) -> SyncResult<StoreUpdate> {
    let mut interpreter = PatchInterpreter::new(lookup);
    for patch in patches {
        interpreter.apply(patch)?;
    }
    let update = interpreter.finish();
    debug!(
        patches = patches.len(),
        upserts = update.upserts.len(),
        deletions = update.deletions.len(),
        "interpreted patch batch"
    );
    Ok(update)
}

/// Accumulates working copies for one batch
pub struct PatchInterpreter<'a, L: RecordLookup + ?Sized> {
    lookup: &'a L,
    working: BTreeMap<RecordId, Value>,
    deletions: BTreeSet<RecordId>,
}

impl<'a, L: RecordLookup + ?Sized> PatchInterpreter<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        PatchInterpreter { lookup, working: BTreeMap::new(), deletions: BTreeSet::new() }
    }

    pub fn apply(&mut self, patch: &Patch) -> SyncResult<()> {
        if let Patch::Unsupported { action, path } = patch {
            let err = SyncError::UnsupportedPatchAction { action: action.clone() };
            warn!(action = %action, path = %format_path(path), error = %err, "skipping patch");
            return Ok(());
        }

        let id = match patch.target_id() {
            Some(id) => id,
            None => {
                trace!(action = patch.action(), path = %format_path(patch.path()), "ignoring patch outside the store");
                return Ok(());
            }
        };
        let rest = &patch.path()[2..];

        if let Patch::Del { .. } = patch {
            if rest.is_empty() {
                self.deletions.insert(id);
                return Ok(());
            }
            if !self.working.contains_key(&id) {
                match self.lookup.get(&id) {
                    Some(existing) => {
                        self.working.insert(id.clone(), existing.into_value());
                    }
                    None => {
                        trace!(id = %id, path = %format_path(patch.path()), "ignoring nested delete in unknown record");
                        return Ok(());
                    }
                }
            }
        }

        let lookup = self.lookup;
        let record = self.working.entry(id.clone()).or_insert_with(|| {
            lookup.get(&id).map(Record::into_value).unwrap_or_else(|| Value::Object(Map::new()))
        });

        apply_to_record(record, patch, rest).map_err(|reason| match reason {
            Failure::Splice(index) => SyncError::UnsupportedSplice { path: format_path(patch.path()), index },
            Failure::Path(reason) => SyncError::PathTraversal {
                id: id.to_string(),
                path: format_path(patch.path()),
                reason,
            },
        })
    }

    pub fn finish(self) -> StoreUpdate {
        let deletions = self.deletions;
        let upserts = self
            .working
            .into_iter()
            .filter(|(id, _)| !deletions.contains(id))
            .filter_map(|(id, value)| Record::from_value(value).map(|record| (id, record)))
            .collect();
        StoreUpdate { upserts, deletions }
    }
}

enum Failure {
    Path(String),
    Splice(usize),
}

impl From<String> for Failure {
    fn from(reason: String) -> Self {
        Failure::Path(reason)
    }
}

fn apply_to_record(record: &mut Value, patch: &Patch, rest: &[PathSegment]) -> Result<(), Failure> {
    match patch {
        Patch::Put { value, .. } => match rest {
            // record creation, already covered by the working copy
            [] => Ok(()),
            [property] => Ok(set_child(record, property, to_plain(value))?),
            [parents @ .., target, property] => {
                let container = child_or_empty_map(descend(record, parents)?, target)?;
                Ok(set_child(container, property, to_plain(value))?)
            }
        },
        Patch::Insert { values, .. } => match rest {
            [parents @ .., list, index] => {
                let container = child_mut(descend(record, parents)?, list)?;
                let values = values.iter().map(to_plain).collect();
                Ok(insert_into(container, index, values)?)
            }
            _ => Err(Failure::Path("insert must address a list element".to_string())),
        },
        Patch::Update { value, .. } => match rest {
            [parents @ .., leaf] => Ok(set_child(descend(record, parents)?, leaf, to_plain(value))?),
            [] => Err(Failure::Path("update cannot replace a whole record".to_string())),
        },
        Patch::Splice { value, .. } => match rest {
            [parents @ .., target, PathSegment::Index(0)] => {
                Ok(set_child(descend(record, parents)?, target, to_plain(value))?)
            }
            [_, .., PathSegment::Index(index)] => Err(Failure::Splice(*index)),
            _ => Err(Failure::Path("splice must end with a text position".to_string())),
        },
        Patch::Del { length, .. } => match rest {
            [parents @ .., last] => Ok(remove_child(descend(record, parents)?, last, *length)?),
            [] => Ok(()),
        },
        Patch::Unsupported { .. } => Ok(()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn descend<'v>(mut current: &'v mut Value, segments: &[PathSegment]) -> Result<&'v mut Value, String> {
    for segment in segments {
        current = child_mut(current, segment)?;
    }
    Ok(current)
}

fn child_mut<'v>(container: &'v mut Value, segment: &PathSegment) -> Result<&'v mut Value, String> {
    match (container, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.get_mut(key).ok_or_else(|| format!("missing container '{}'", key))
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            items.get_mut(*index).ok_or_else(|| format!("index {} out of bounds (len {})", index, len))
        }
        (other, segment) => Err(format!("cannot address '{}' inside a {}", segment, kind(other))),
    }
}

fn child_or_empty_map<'v>(container: &'v mut Value, segment: &PathSegment) -> Result<&'v mut Value, String> {
    match container {
        Value::Object(map) => match segment {
            PathSegment::Key(key) => Ok(map.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()))),
            PathSegment::Index(index) => Err(format!("cannot address index {} inside a map", index)),
        },
        other => child_mut(other, segment),
    }
}

fn set_child(container: &mut Value, segment: &PathSegment, value: Value) -> Result<(), String> {
    match (container, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            if *index < items.len() {
                items[*index] = value;
            } else if *index == items.len() {
                items.push(value);
            } else {
                return Err(format!("index {} out of bounds (len {})", index, items.len()));
            }
            Ok(())
        }
        (other, segment) => Err(format!("cannot set '{}' inside a {}", segment, kind(other))),
    }
}

fn insert_into(container: &mut Value, segment: &PathSegment, values: Vec<Value>) -> Result<(), String> {
    let items = match container {
        Value::Array(items) => items,
        other => return Err(format!("insert target is a {}, not a list", kind(other))),
    };
    let index = match segment {
        PathSegment::Index(index) if *index <= items.len() => *index,
        segment => return Err(format!("insert position '{}' invalid for list of len {}", segment, items.len())),
    };
    items.splice(index..index, values);
    Ok(())
}

fn remove_child(container: &mut Value, segment: &PathSegment, length: usize) -> Result<(), String> {
    match (container, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.remove(key);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let start = (*index).min(items.len());
            let end = index.saturating_add(length).min(items.len());
            items.drain(start..end);
            Ok(())
        }
        (other, segment) => Err(format!("cannot delete '{}' inside a {}", segment, kind(other))),
    }
}
