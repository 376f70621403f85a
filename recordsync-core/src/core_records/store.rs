/*
    store.rs - The record store contract consumed by the translator
*/

use super::changes::{ChangeScope, ChangeSource, StoreChange, StoreSnapshot};
use super::record::{Record, RecordId};
use crate::subscription::Subscription;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read access to current records
pub trait RecordLookup {
    fn get(&self, id: &RecordId) -> Option<Record>;
}

impl RecordLookup for BTreeMap<RecordId, Record> {
    fn get(&self, id: &RecordId) -> Option<Record> {
        BTreeMap::get(self, id).cloned()
    }
}

impl<T: RecordLookup + ?Sized> RecordLookup for Arc<T> {
    fn get(&self, id: &RecordId) -> Option<Record> {
        (**self).get(id)
    }
}

/// Callback invoked synchronously for every matching store change
pub type StoreListener = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Selects which store changes a listener receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenFilter {
    /// `None` listens to every source
    pub source: Option<ChangeSource>,
    pub scope: ChangeScope,
}

impl ListenFilter {
    /// User-originated edits to document records
    pub fn user_document() -> Self {
        ListenFilter { source: Some(ChangeSource::User), scope: ChangeScope::Document }
    }

    pub fn all() -> Self {
        ListenFilter { source: None, scope: ChangeScope::All }
    }

    pub fn accepts_source(&self, source: ChangeSource) -> bool {
        self.source.map_or(true, |wanted| wanted == source)
    }
}

/// A flat, identifier-addressed record collection
pub trait RecordStore: RecordLookup + Send + Sync {
    /// Insert or replace whole records
    fn put(&self, records: Vec<(RecordId, Record)>);

    fn remove(&self, ids: &[RecordId]);

    /// Replace the entire contents
    fn load_snapshot(&self, snapshot: StoreSnapshot);

    /// Register `listener`; it stays registered while the returned handle lives
    fn listen(&self, listener: StoreListener, filter: ListenFilter) -> Subscription;

    /// Run `f` with every mutation it performs marked as remote-originated.
    /// Listeners observe the enclosed mutations as one change.
    fn merge_remote_changes(&self, f: &mut dyn FnMut());
}
