/*
    memory.rs - In-memory record store

    Reference implementation of `RecordStore`:
    - Listeners are called synchronously, after the record lock is released,
      so they may read the store from inside the callback.
    - Mutations inside `merge_remote_changes` are buffered and delivered
      once, as a single remote-source change, when the outermost scope ends.
*/

use super::changes::{ChangeSet, ChangeSource, ScopeRules, StoreChange, StoreSnapshot};
use super::record::{Record, RecordId};
use super::store::{ListenFilter, RecordLookup, RecordStore, StoreListener};
use crate::subscription::Subscription;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

type ListenerEntry = (u64, ListenFilter, StoreListener);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Record store kept entirely in memory
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<RecordId, Record>>,
    schema: RwLock<Option<Value>>,
    listeners: Arc<Mutex<Vec<ListenerEntry>>>,
    next_listener: AtomicU64,
    remote_depth: AtomicUsize,
    pending_remote: Mutex<Option<ChangeSet>>,
    scope_rules: ScopeRules,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `records`, without notifying anyone
    pub fn with_records(records: impl IntoIterator<Item = (RecordId, Record)>) -> Self {
        let store = Self::new();
        write(&store.records).extend(records);
        store
    }

    /// Classify records for listener scope filtering with `rules`
    pub fn with_scope_rules(mut self, rules: ScopeRules) -> Self {
        self.scope_rules = rules;
        self
    }

    /// Copy of every record
    pub fn records(&self) -> BTreeMap<RecordId, Record> {
        read(&self.records).clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot { store: self.records(), schema: self.schema() }
    }

    pub fn schema(&self) -> Option<Value> {
        read(&self.schema).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.records).is_empty()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn in_remote_scope(&self) -> bool {
        self.remote_depth.load(Ordering::SeqCst) > 0
    }

    fn publish(&self, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        if self.in_remote_scope() {
            lock(&self.pending_remote).get_or_insert_with(ChangeSet::new).absorb(changes);
            return;
        }
        self.dispatch(changes, ChangeSource::User);
    }

    fn dispatch(&self, changes: ChangeSet, source: ChangeSource) {
        let listeners: Vec<(ListenFilter, StoreListener)> = lock(&self.listeners)
            .iter()
            .map(|(_, filter, listener)| (*filter, Arc::clone(listener)))
            .collect();

        trace!(touched = changes.len(), ?source, listeners = listeners.len(), "dispatching store change");

        for (filter, listener) in listeners {
            if !filter.accepts_source(source) {
                continue;
            }
            let scoped = changes.filter_scope(filter.scope, &self.scope_rules);
            if scoped.is_empty() {
                continue;
            }
            listener(&StoreChange { changes: scoped, source });
        }
    }
}

/// Decrements the remote depth even if the enclosed closure panics
struct RemoteScope<'a>(&'a AtomicUsize);

impl<'a> RemoteScope<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        RemoteScope(depth)
    }
}

impl Drop for RemoteScope<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RecordLookup for MemoryRecordStore {
    fn get(&self, id: &RecordId) -> Option<Record> {
        read(&self.records).get(id).cloned()
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, records: Vec<(RecordId, Record)>) {
        let mut changes = ChangeSet::new();
        {
            let mut store = write(&self.records);
            for (id, record) in records {
                let mut step = ChangeSet::new();
                match store.insert(id.clone(), record.clone()) {
                    Some(old) if old == record => continue,
                    Some(old) => {
                        step.updated.insert(id, (old, record));
                    }
                    None => {
                        step.added.insert(id, record);
                    }
                }
                changes.absorb(step);
            }
        }
        self.publish(changes);
    }

    fn remove(&self, ids: &[RecordId]) {
        let mut changes = ChangeSet::new();
        {
            let mut store = write(&self.records);
            for id in ids {
                if let Some(old) = store.remove(id) {
                    changes.removed.insert(id.clone(), old);
                }
            }
        }
        self.publish(changes);
    }

    fn load_snapshot(&self, snapshot: StoreSnapshot) {
        let mut changes = ChangeSet::new();
        {
            let mut store = write(&self.records);
            for (id, old) in store.iter() {
                match snapshot.store.get(id) {
                    None => {
                        changes.removed.insert(id.clone(), old.clone());
                    }
                    Some(new) if new != old => {
                        changes.updated.insert(id.clone(), (old.clone(), new.clone()));
                    }
                    Some(_) => {}
                }
            }
            for (id, new) in &snapshot.store {
                if !store.contains_key(id) {
                    changes.added.insert(id.clone(), new.clone());
                }
            }
            *store = snapshot.store;
        }
        *write(&self.schema) = snapshot.schema;
        self.publish(changes);
    }

    fn listen(&self, listener: StoreListener, filter: ListenFilter) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, filter, listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                lock(&listeners).retain(|(lid, _, _)| *lid != id);
            }
        })
    }

    fn merge_remote_changes(&self, f: &mut dyn FnMut()) {
        {
            let _scope = RemoteScope::enter(&self.remote_depth);
            f();
        }
        if self.in_remote_scope() {
            return;
        }
        let pending = lock(&self.pending_remote).take();
        if let Some(changes) = pending {
            if !changes.is_empty() {
                self.dispatch(changes, ChangeSource::Remote);
            }
        }
    }
}
