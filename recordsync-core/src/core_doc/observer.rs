/*
    observer.rs - Derive a patch batch from two document states

    Used by the in-memory engine to report what a transaction changed, in the
    same vocabulary a real engine emits:
    - new record:           put [store, id] = {} then put [store, id, key] per field
    - removed record:       del [store, id]
    - changed leaf:         put [.., key]
    - removed map key:      del [.., key]
    - appended elements:    insert [.., list, old_len] values
    - truncated elements:   del [.., list, new_len] length n
    - changed text:         splice [.., key, 0] with the full new text
    - changed counter:      update [.., key]
*/

use super::document::{Document, STORE_KEY};
use super::patch::{Patch, Path, PathSegment};
use super::value::CrdtValue;
use std::collections::BTreeMap;

/// Patches that turn `before` into `after`
pub fn observe_changes(before: &Document, after: &Document) -> Vec<Patch> {
    let mut patches = Vec::new();
    let root: Path = vec![PathSegment::key(STORE_KEY)];

    let empty = BTreeMap::new();
    let old_store = before.store.as_ref().unwrap_or(&empty);
    let new_store = match after.store.as_ref() {
        Some(store) => store,
        None => {
            if before.store.is_some() {
                patches.push(Patch::Del { path: root, length: 1 });
            }
            return patches;
        }
    };

    if before.store.is_none() {
        patches.push(Patch::Put { path: root.clone(), value: CrdtValue::empty_map() });
    }

    for id in old_store.keys().filter(|id| !new_store.contains_key(*id)) {
        patches.push(Patch::Del { path: child(&root, id.into()), length: 1 });
    }

    for (id, new_record) in new_store {
        let path = child(&root, id.into());
        match old_store.get(id) {
            None => create_record(&path, new_record, &mut patches),
            Some(old_record) => diff_value(&path, old_record, new_record, &mut patches),
        }
    }

    patches
}

fn child(path: &Path, segment: PathSegment) -> Path {
    let mut path = path.clone();
    path.push(segment);
    path
}

fn create_record(path: &Path, record: &CrdtValue, patches: &mut Vec<Patch>) {
    match record {
        CrdtValue::Map(fields) => {
            patches.push(Patch::Put { path: path.clone(), value: CrdtValue::empty_map() });
            for (key, value) in fields {
                patches.push(Patch::Put {
                    path: child(path, PathSegment::key(key.as_str())),
                    value: value.clone(),
                });
            }
        }
        other => patches.push(Patch::Put { path: path.clone(), value: other.clone() }),
    }
}

fn diff_value(path: &Path, old: &CrdtValue, new: &CrdtValue, patches: &mut Vec<Patch>) {
    match (old, new) {
        (CrdtValue::Map(old_map), CrdtValue::Map(new_map)) => {
            for key in old_map.keys().filter(|key| !new_map.contains_key(*key)) {
                patches.push(Patch::Del { path: child(path, PathSegment::key(key.as_str())), length: 1 });
            }
            for (key, new_value) in new_map {
                let key_path = child(path, PathSegment::key(key.as_str()));
                match old_map.get(key) {
                    None => patches.push(Patch::Put { path: key_path, value: new_value.clone() }),
                    Some(old_value) => diff_value(&key_path, old_value, new_value, patches),
                }
            }
        }
        (CrdtValue::List(old_list), CrdtValue::List(new_list)) => {
            for (index, (old_item, new_item)) in old_list.iter().zip(new_list).enumerate() {
                diff_value(&child(path, PathSegment::index(index)), old_item, new_item, patches);
            }
            if new_list.len() > old_list.len() {
                patches.push(Patch::Insert {
                    path: child(path, PathSegment::index(old_list.len())),
                    values: new_list[old_list.len()..].to_vec(),
                });
            } else if old_list.len() > new_list.len() {
                patches.push(Patch::Del {
                    path: child(path, PathSegment::index(new_list.len())),
                    length: old_list.len() - new_list.len(),
                });
            }
        }
        (CrdtValue::Text(old_text), CrdtValue::Text(new_text)) => {
            if old_text != new_text {
                patches.push(Patch::Splice {
                    path: child(path, PathSegment::index(0)),
                    value: CrdtValue::Text(new_text.clone()),
                });
            }
        }
        (CrdtValue::Counter(old_count), CrdtValue::Counter(new_count)) => {
            if old_count != new_count {
                patches.push(Patch::Update { path: path.clone(), value: new.clone() });
            }
        }
        _ => {
            if old != new {
                patches.push(Patch::Put { path: path.clone(), value: new.clone() });
            }
        }
    }
}
