/*
    patch.rs - Change-log entries emitted by the document engine

    Wire form (JSON):
        { "action": "put",    "path": ["store", "shape:1", "x"], "value": 5 }
        { "action": "insert", "path": ["store", "shape:1", "points", 1], "values": [9] }
        { "action": "update", "path": [...], "value": ... }
        { "action": "splice", "path": [..., 0], "value": "text" }
        { "action": "del",    "path": [...], "length": 1 }
    Any other action parses into `Patch::Unsupported`.
*/

use super::document::STORE_KEY;
use super::value::CrdtValue;
use crate::core_records::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a path into the document tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

pub type Path = Vec<PathSegment>;

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::Key(key.into())
    }

    pub fn index(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(index) => write!(f, "{}", index),
            PathSegment::Key(key) => f.write_str(key),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl From<&RecordId> for PathSegment {
    fn from(id: &RecordId) -> Self {
        PathSegment::Key(id.to_string())
    }
}

/// Render a path as `store/shape:1/points/0`
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
}

/// A single document mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPatch", into = "RawPatch")]
pub enum Patch {
    /// Set the leaf at `path`
    Put { path: Path, value: CrdtValue },
    /// Insert `values` into a sequence at the index in the last segment
    Insert { path: Path, values: Vec<CrdtValue> },
    /// Replace a counter or other leaf in place
    Update { path: Path, value: CrdtValue },
    /// Replace text; the last segment is the splice position
    Splice { path: Path, value: CrdtValue },
    /// Remove the value at `path` (`length` consecutive elements in a sequence)
    Del { path: Path, length: usize },
    /// An action this translator does not understand
    Unsupported { action: String, path: Path },
}

impl Patch {
    pub fn path(&self) -> &Path {
        match self {
            Patch::Put { path, .. }
            | Patch::Insert { path, .. }
            | Patch::Update { path, .. }
            | Patch::Splice { path, .. }
            | Patch::Del { path, .. }
            | Patch::Unsupported { path, .. } => path,
        }
    }

    pub fn action(&self) -> &str {
        match self {
            Patch::Put { .. } => "put",
            Patch::Insert { .. } => "insert",
            Patch::Update { .. } => "update",
            Patch::Splice { .. } => "splice",
            Patch::Del { .. } => "del",
            Patch::Unsupported { action, .. } => action,
        }
    }

    /// `path[0] == "store"` and the path names a record
    pub fn is_store_relevant(&self) -> bool {
        self.target_id().is_some()
    }

    /// The record addressed by `path[1]`, for store-relevant patches
    pub fn target_id(&self) -> Option<RecordId> {
        match self.path().as_slice() {
            [PathSegment::Key(root), PathSegment::Key(id), ..] if root == STORE_KEY => {
                Some(RecordId::from(id.as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPatch {
    action: String,
    path: Path,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<CrdtValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<CrdtValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<usize>,
}

impl From<RawPatch> for Patch {
    fn from(raw: RawPatch) -> Self {
        // JSON null deserializes as an absent value
        let value = raw.value.unwrap_or(CrdtValue::Null);
        let path = raw.path;
        match raw.action.as_str() {
            "put" => Patch::Put { path, value },
            "insert" => Patch::Insert { path, values: raw.values.unwrap_or_default() },
            "update" => Patch::Update { path, value },
            "splice" => Patch::Splice { path, value },
            "del" => Patch::Del { path, length: raw.length.unwrap_or(1) },
            _ => Patch::Unsupported { action: raw.action, path },
        }
    }
}

impl From<Patch> for RawPatch {
    fn from(patch: Patch) -> Self {
        let action = patch.action().to_string();
        let mut raw = RawPatch { action, path: Vec::new(), value: None, values: None, length: None };
        match patch {
            Patch::Put { path, value } | Patch::Update { path, value } | Patch::Splice { path, value } => {
                raw.path = path;
                raw.value = Some(value);
            }
            Patch::Insert { path, values } => {
                raw.path = path;
                raw.values = Some(values);
            }
            Patch::Del { path, length } => {
                raw.path = path;
                if length != 1 {
                    raw.length = Some(length);
                }
            }
            Patch::Unsupported { path, .. } => raw.path = path,
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_segments_parse_mixed() {
        let path: Path = serde_json::from_value(json!(["store", "shape:1", "points", 1])).unwrap();
        assert_eq!(path[3], PathSegment::Index(1));
        assert_eq!(path[2], PathSegment::key("points"));
        assert_eq!(format_path(&path), "store/shape:1/points/1");
    }

    #[test]
    fn test_store_relevance() {
        let relevant: Patch =
            serde_json::from_value(json!({"action": "put", "path": ["store", "shape:1", "x"], "value": 5}))
                .unwrap();
        assert_eq!(relevant.target_id(), Some(RecordId::from("shape:1")));

        let root: Patch =
            serde_json::from_value(json!({"action": "put", "path": ["store"], "value": {}})).unwrap();
        assert!(!root.is_store_relevant());

        let schema: Patch =
            serde_json::from_value(json!({"action": "put", "path": ["schema", "v"], "value": 1})).unwrap();
        assert!(!schema.is_store_relevant());
    }

    #[test]
    fn test_unknown_action_is_unsupported() {
        let patch: Patch =
            serde_json::from_value(json!({"action": "mark", "path": ["store", "shape:1", "text"]})).unwrap();
        assert_eq!(patch.action(), "mark");
        assert!(matches!(patch, Patch::Unsupported { .. }));
    }

    #[test]
    fn test_del_length_defaults_to_one() {
        let patch: Patch =
            serde_json::from_value(json!({"action": "del", "path": ["store", "shape:1"]})).unwrap();
        assert_eq!(patch, Patch::Del { path: vec!["store".into(), "shape:1".into()], length: 1 });

        let wire = serde_json::to_value(&patch).unwrap();
        assert_eq!(wire, json!({"action": "del", "path": ["store", "shape:1"]}));
    }

    #[test]
    fn test_put_null_value() {
        let patch: Patch =
            serde_json::from_value(json!({"action": "put", "path": ["store", "a:1", "x"], "value": null}))
                .unwrap();
        assert!(matches!(patch, Patch::Put { value: CrdtValue::Null, .. }));
    }
}
