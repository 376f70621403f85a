/*
    coordinator.rs - Wires a record store and a document together

    Outbound: user edits of the configured scope are encoded into one
    document transaction. While that transaction runs the inbound path is
    suppressed, so its own patches are not applied back to the store.

    Inbound: every other patch batch is interpreted and committed to the
    store inside one remote-change scope.

    Startup: wait for the document, then load its store into the record
    store once.
*/

use super::codec::snapshot_from_document;
use super::diff_encoder::{DiffEncoder, EncodeStats};
use super::errors::{SyncError, SyncResult};
use super::patch_interpreter::{interpret, StoreUpdate};
use crate::config::RecordsConfig;
use crate::core_doc::{Document, DocumentHandle, Patch};
use crate::core_records::{ChangeScope, ChangeSource, ListenFilter, RecordStore, ScopeRules, StoreChange};
use crate::subscription::Subscription;
use crate::tracing::sync::{trace_inbound, trace_outbound, trace_snapshot};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, trace};

/// Readiness of the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Waiting for the document
    Loading,
    /// Store holds the document's records
    SyncedRemote,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Loading => f.write_str("loading"),
            SyncStatus::SyncedRemote => f.write_str("synced-remote"),
        }
    }
}

struct Inner {
    document: Arc<dyn DocumentHandle>,
    store: Arc<dyn RecordStore>,
    encoder: DiffEncoder,
    scope: ChangeScope,
    rules: ScopeRules,
    suppress_inbound: AtomicBool,
    synced: AtomicBool,
}

/// Sets the flag for its lifetime and restores the previous value on drop
struct SuppressGuard<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl<'a> SuppressGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        let previous = flag.swap(true, Ordering::SeqCst);
        SuppressGuard { flag, previous }
    }
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(document: Arc<dyn DocumentHandle>, store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(document, store, &RecordsConfig::default())
    }

    pub fn with_config(
        document: Arc<dyn DocumentHandle>,
        store: Arc<dyn RecordStore>,
        config: &RecordsConfig,
    ) -> Self {
        SyncCoordinator {
            inner: Arc::new(Inner {
                document,
                store,
                encoder: DiffEncoder::new(config.locked_field.as_str()),
                scope: config.sync_scope,
                rules: config.scope_rules(),
                suppress_inbound: AtomicBool::new(false),
                synced: AtomicBool::new(false),
            }),
        }
    }

    pub fn status(&self) -> SyncStatus {
        if self.inner.synced.load(Ordering::SeqCst) {
            SyncStatus::SyncedRemote
        } else {
            SyncStatus::Loading
        }
    }

    /// Whether an outbound transaction is in progress
    pub fn is_suppressing_inbound(&self) -> bool {
        self.inner.suppress_inbound.load(Ordering::SeqCst)
    }

    /// Forward a user edit of the store into the document
    pub fn handle_store_change(&self, change: &StoreChange) -> EncodeStats {
        if change.source != ChangeSource::User {
            trace!(source = ?change.source, "ignoring non-user store change");
            return EncodeStats::default();
        }
        let changes = change.changes.filter_scope(self.inner.scope, &self.inner.rules);
        if changes.is_empty() {
            return EncodeStats::default();
        }

        let op = trace_outbound(changes.len());
        let encoder = &self.inner.encoder;
        let mut stats = EncodeStats::default();
        {
            let _guard = SuppressGuard::engage(&self.inner.suppress_inbound);
            self.inner.document.change(&mut |doc: &mut Document| {
                stats = encoder.encode(doc, &changes);
            });
        }
        op.complete();
        stats
    }

    /// Apply a document patch batch to the store. Returns what was committed;
    /// echoes of our own transactions commit nothing.
    pub fn handle_document_patches(&self, patches: &[Patch]) -> SyncResult<StoreUpdate> {
        if self.is_suppressing_inbound() {
            trace!(patches = patches.len(), "ignoring echo of outbound transaction");
            return Ok(StoreUpdate::default());
        }

        let op = trace_inbound(patches.len());
        let update = match interpret(patches, &*self.inner.store) {
            Ok(update) => update,
            Err(err) => {
                op.record_error(&err.to_string());
                return Err(err);
            }
        };

        if !update.is_empty() {
            let store = &self.inner.store;
            let deletions: Vec<_> = update.deletions.iter().cloned().collect();
            let upserts: Vec<_> = update.upserts.iter().map(|(id, r)| (id.clone(), r.clone())).collect();
            op.record_event("committing remote batch");
            let mut pending = Some((deletions, upserts));
            store.merge_remote_changes(&mut || {
                if let Some((deletions, upserts)) = pending.take() {
                    if !deletions.is_empty() {
                        store.remove(&deletions);
                    }
                    if !upserts.is_empty() {
                        store.put(upserts);
                    }
                }
            });
        }
        op.complete();
        Ok(update)
    }

    /// Wait for the document, then replace the store with its contents.
    /// Returns the number of records loaded.
    pub async fn load_initial_snapshot(&self) -> SyncResult<usize> {
        self.inner.document.when_ready().await;

        let doc = self
            .inner
            .document
            .current_value()
            .ok_or_else(|| SyncError::StartupState("Document not found".to_string()))?;
        let snapshot = snapshot_from_document(&doc)
            .ok_or_else(|| SyncError::StartupState("Document store not initialized".to_string()))?;

        let count = snapshot.store.len();
        let op = trace_snapshot(count);
        let store = &self.inner.store;
        let mut pending = Some(snapshot);
        store.merge_remote_changes(&mut || {
            if let Some(snapshot) = pending.take() {
                store.load_snapshot(snapshot);
            }
        });
        self.inner.synced.store(true, Ordering::SeqCst);
        info!(records = count, status = %self.status(), "loaded document into record store");
        op.complete();
        Ok(count)
    }

    /// Subscribe to both sides and load the initial snapshot. Dropping the
    /// returned session stops synchronization.
    pub async fn start(&self) -> SyncResult<SyncSession> {
        let store_sub = self.listen_store();
        let document_sub = self.listen_document();

        self.load_initial_snapshot().await?;

        Ok(SyncSession { coordinator: self.clone(), store_sub: Some(store_sub), document_sub: Some(document_sub) })
    }

    fn listen_store(&self) -> Subscription {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        // scope is filtered in handle_store_change with the configured rules
        let filter = ListenFilter { source: Some(ChangeSource::User), scope: ChangeScope::All };
        self.inner.store.listen(
            Arc::new(move |change: &StoreChange| {
                if let Some(inner) = weak.upgrade() {
                    SyncCoordinator { inner }.handle_store_change(change);
                }
            }),
            filter,
        )
    }

    fn listen_document(&self) -> Subscription {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.document.on_change(Arc::new(move |patches: &[Patch]| {
            if let Some(inner) = weak.upgrade() {
                if let Err(err) = (SyncCoordinator { inner }).handle_document_patches(patches) {
                    error!(error = %err, patches = patches.len(), "aborted document patch batch");
                }
            }
        }))
    }
}

/// A running synchronization; owns both subscriptions
#[derive(Debug)]
pub struct SyncSession {
    coordinator: SyncCoordinator,
    store_sub: Option<Subscription>,
    document_sub: Option<Subscription>,
}

impl SyncSession {
    pub fn status(&self) -> SyncStatus {
        self.coordinator.status()
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    pub fn is_active(&self) -> bool {
        self.store_sub.as_ref().map_or(false, Subscription::is_active)
            && self.document_sub.as_ref().map_or(false, Subscription::is_active)
    }

    /// Unsubscribe from both sides
    pub fn shutdown(mut self) {
        self.release();
        debug!("sync session shut down");
    }

    fn release(&mut self) {
        if let Some(sub) = self.store_sub.take() {
            sub.unsubscribe();
        }
        if let Some(sub) = self.document_sub.take() {
            sub.unsubscribe();
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("scope", &self.inner.scope)
            .field("locked_field", &self.inner.encoder.locked_field())
            .field("status", &self.status())
            .finish()
    }
}
