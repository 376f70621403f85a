/*
    changes.rs - Change sets and snapshots emitted by the record store

    A ChangeSet describes one local transaction: added, updated (old, new)
    and removed records. Change sets produced inside one remote-change scope
    are folded together with `absorb` so observers see a single update.
*/

use super::record::{Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Who originated a store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    User,
    Remote,
}

/// Which family of records a listener cares about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeScope {
    /// Persistent document content (shapes, pages, assets, ...)
    #[default]
    Document,
    /// Per-session view state (camera, pointer, instance state)
    Session,
    /// Collaborator presence
    Presence,
    /// Every record
    All,
}

/// Record type prefixes that classify records into session and presence
/// scope; everything else is document scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeRules {
    pub session_types: Vec<String>,
    pub presence_types: Vec<String>,
}

impl Default for ScopeRules {
    fn default() -> Self {
        ScopeRules {
            session_types: ["instance", "instance_page_state", "camera", "pointer"]
                .map(String::from)
                .to_vec(),
            presence_types: vec!["instance_presence".to_string()],
        }
    }
}

impl ScopeRules {
    /// Classify a record by its type prefix
    pub fn classify(&self, id: &RecordId) -> ChangeScope {
        let type_name = id.type_name();
        if self.session_types.iter().any(|t| t == type_name) {
            ChangeScope::Session
        } else if self.presence_types.iter().any(|t| t == type_name) {
            ChangeScope::Presence
        } else {
            ChangeScope::Document
        }
    }

    pub fn includes(&self, scope: ChangeScope, id: &RecordId) -> bool {
        scope == ChangeScope::All || scope == self.classify(id)
    }
}

impl ChangeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeScope::Document => "document",
            ChangeScope::Session => "session",
            ChangeScope::Presence => "presence",
            ChangeScope::All => "all",
        }
    }
}

impl fmt::Display for ChangeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "document" => Ok(ChangeScope::Document),
            "session" => Ok(ChangeScope::Session),
            "presence" => Ok(ChangeScope::Presence),
            "all" => Ok(ChangeScope::All),
            other => Err(format!("unknown change scope '{}'", other)),
        }
    }
}

/// Records added, updated and removed by one store transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub added: BTreeMap<RecordId, Record>,
    /// id -> (old record, new record)
    #[serde(default)]
    pub updated: BTreeMap<RecordId, (Record, Record)>,
    #[serde(default)]
    pub removed: BTreeMap<RecordId, Record>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Total number of touched records
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// The subset of this change set whose records fall in `scope`
    pub fn filter_scope(&self, scope: ChangeScope, rules: &ScopeRules) -> ChangeSet {
        if scope == ChangeScope::All {
            return self.clone();
        }
        let keep = |id: &RecordId| rules.includes(scope, id);
        ChangeSet {
            added: self.added.iter().filter(|(id, _)| keep(id)).map(clone_entry).collect(),
            updated: self.updated.iter().filter(|(id, _)| keep(id)).map(clone_entry).collect(),
            removed: self.removed.iter().filter(|(id, _)| keep(id)).map(clone_entry).collect(),
        }
    }

    /// Fold a later change set into this one, as if both happened in a
    /// single transaction.
    pub fn absorb(&mut self, later: ChangeSet) {
        for (id, record) in later.added {
            match self.removed.remove(&id) {
                // removed then re-added: net update
                Some(old) if old != record => {
                    self.updated.insert(id, (old, record));
                }
                Some(_) => {}
                None => {
                    self.added.insert(id, record);
                }
            }
        }

        for (id, (old, new)) in later.updated {
            if let Some(added) = self.added.get_mut(&id) {
                *added = new;
                continue;
            }
            match self.updated.entry(id) {
                Entry::Occupied(mut entry) => {
                    if entry.get().0 == new {
                        entry.remove();
                    } else {
                        entry.get_mut().1 = new;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert((old, new));
                }
            }
        }

        for (id, record) in later.removed {
            if self.added.remove(&id).is_some() {
                // added then removed: nothing happened
                continue;
            }
            let original = match self.updated.remove(&id) {
                Some((old, _)) => old,
                None => record,
            };
            self.removed.insert(id, original);
        }
    }
}

fn clone_entry<V: Clone>((id, value): (&RecordId, &V)) -> (RecordId, V) {
    (id.clone(), value.clone())
}

/// A change notification delivered to store listeners
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub changes: ChangeSet,
    pub source: ChangeSource,
}

/// A full copy of the store contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub store: BTreeMap<RecordId, Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_scope_classification() {
        let rules = ScopeRules::default();
        assert_eq!(rules.classify(&"shape:1".into()), ChangeScope::Document);
        assert_eq!(rules.classify(&"camera:page:page".into()), ChangeScope::Session);
        assert_eq!(rules.classify(&"instance_presence:u1".into()), ChangeScope::Presence);
        assert!(rules.includes(ChangeScope::All, &"pointer:pointer".into()));
        assert!(!rules.includes(ChangeScope::Document, &"pointer:pointer".into()));
    }

    #[test]
    fn test_custom_scope_rules() {
        let rules = ScopeRules { session_types: vec!["cursor".to_string()], presence_types: Vec::new() };
        assert_eq!(rules.classify(&"cursor:u1".into()), ChangeScope::Session);
        assert_eq!(rules.classify(&"camera:page:1".into()), ChangeScope::Document);
        assert_eq!(rules.classify(&"instance_presence:u1".into()), ChangeScope::Document);
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("Document".parse::<ChangeScope>(), Ok(ChangeScope::Document));
        assert_eq!("all".parse::<ChangeScope>(), Ok(ChangeScope::All));
        assert!("everything".parse::<ChangeScope>().is_err());
    }

    #[test]
    fn test_filter_scope_drops_session_records() {
        let mut changes = ChangeSet::new();
        changes.added.insert("shape:1".into(), rec(json!({"id": "shape:1"})));
        changes.added.insert("camera:page:p".into(), rec(json!({"id": "camera:page:p"})));

        let filtered = changes.filter_scope(ChangeScope::Document, &ScopeRules::default());
        assert_eq!(filtered.len(), 1);
        assert!(filtered.added.contains_key(&RecordId::from("shape:1")));
    }

    #[test]
    fn test_absorb_added_then_updated_stays_added() {
        let mut first = ChangeSet::new();
        first.added.insert("shape:1".into(), rec(json!({"x": 1})));

        let mut second = ChangeSet::new();
        second.updated.insert("shape:1".into(), (rec(json!({"x": 1})), rec(json!({"x": 2}))));

        first.absorb(second);
        assert_eq!(first.added[&RecordId::from("shape:1")], rec(json!({"x": 2})));
        assert!(first.updated.is_empty());
    }

    #[test]
    fn test_absorb_added_then_removed_cancels() {
        let mut first = ChangeSet::new();
        first.added.insert("shape:1".into(), rec(json!({"x": 1})));

        let mut second = ChangeSet::new();
        second.removed.insert("shape:1".into(), rec(json!({"x": 1})));

        first.absorb(second);
        assert!(first.is_empty());
    }

    #[test]
    fn test_absorb_updated_then_removed_keeps_original() {
        let mut first = ChangeSet::new();
        first.updated.insert("shape:1".into(), (rec(json!({"x": 1})), rec(json!({"x": 2}))));

        let mut second = ChangeSet::new();
        second.removed.insert("shape:1".into(), rec(json!({"x": 2})));

        first.absorb(second);
        assert!(first.updated.is_empty());
        assert_eq!(first.removed[&RecordId::from("shape:1")], rec(json!({"x": 1})));
    }

    #[test]
    fn test_absorb_update_back_to_original_cancels() {
        let mut first = ChangeSet::new();
        first.updated.insert("shape:1".into(), (rec(json!({"x": 1})), rec(json!({"x": 2}))));

        let mut second = ChangeSet::new();
        second.updated.insert("shape:1".into(), (rec(json!({"x": 2})), rec(json!({"x": 1}))));

        first.absorb(second);
        assert!(first.is_empty());
    }

    #[test]
    fn test_changeset_json_shape() {
        let changes: ChangeSet = serde_json::from_value(json!({
            "updated": {"shape:1": [{"id": "shape:1", "x": 1}, {"id": "shape:1", "x": 2}]}
        }))
        .unwrap();

        assert!(changes.added.is_empty());
        let (old, new) = &changes.updated[&RecordId::from("shape:1")];
        assert_eq!(old.get("x"), Some(&json!(1)));
        assert_eq!(new.get("x"), Some(&json!(2)));
    }
}
