/*
    memory.rs - In-memory document engine

    Stands in for a real CRDT engine in the CLI and the tests. A transaction
    runs against a copy of the document; the committed batch is derived by
    comparing before and after (see observer.rs). Listeners are called
    synchronously after the document lock is released, in registration
    order, before `change` returns.
*/

use super::document::Document;
use super::handle::{DocumentHandle, PatchListener};
use super::observer::observe_changes;
use super::patch::Patch;
use crate::subscription::Subscription;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::trace;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MemoryDocument {
    doc: Mutex<Option<Document>>,
    listeners: Arc<Mutex<Vec<(u64, PatchListener)>>>,
    next_listener: AtomicU64,
    ready: watch::Sender<bool>,
}

impl MemoryDocument {
    /// A document that is still loading; call `mark_ready` to release waiters
    pub fn new(doc: Document) -> Self {
        Self::build(Some(doc), false)
    }

    /// A loaded document
    pub fn ready(doc: Document) -> Self {
        Self::build(Some(doc), true)
    }

    /// A handle whose document turned out not to exist
    pub fn absent() -> Self {
        Self::build(None, true)
    }

    fn build(doc: Option<Document>, ready: bool) -> Self {
        let (sender, _) = watch::channel(ready);
        MemoryDocument {
            doc: Mutex::new(doc),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
            ready: sender,
        }
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Apply an edit made by another replica. Subscribers see it exactly
    /// like a local transaction.
    pub fn apply_remote(&self, mutator: &mut dyn FnMut(&mut Document)) -> Vec<Patch> {
        self.commit(mutator, "remote")
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn commit(&self, mutator: &mut dyn FnMut(&mut Document), origin: &'static str) -> Vec<Patch> {
        let patches = {
            let mut current = lock(&self.doc);
            let before = current.clone().unwrap_or_default();
            let mut after = before.clone();
            mutator(&mut after);
            let patches = observe_changes(&before, &after);
            *current = Some(after);
            patches
        };

        if patches.is_empty() {
            return patches;
        }

        let listeners: Vec<PatchListener> =
            lock(&self.listeners).iter().map(|(_, listener)| Arc::clone(listener)).collect();
        trace!(origin, patches = patches.len(), listeners = listeners.len(), "document transaction committed");
        for listener in listeners {
            listener(&patches);
        }
        patches
    }
}

#[async_trait]
impl DocumentHandle for MemoryDocument {
    async fn when_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives as long as self, so this cannot observe a close
        let _ = ready.wait_for(|ready| *ready).await;
    }

    fn current_value(&self) -> Option<Document> {
        lock(&self.doc).clone()
    }

    fn change(&self, mutator: &mut dyn FnMut(&mut Document)) -> Vec<Patch> {
        self.commit(mutator, "local")
    }

    fn on_change(&self, listener: PatchListener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                lock(&listeners).retain(|(lid, _)| *lid != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_doc::value::CrdtValue;
    use std::time::Duration;

    fn recorder(doc: &MemoryDocument) -> (Subscription, Arc<Mutex<Vec<Vec<Patch>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = doc.on_change(Arc::new(move |patches: &[Patch]| sink.lock().unwrap().push(patches.to_vec())));
        (sub, seen)
    }

    #[test]
    fn test_change_notifies_and_returns_batch() {
        let doc = MemoryDocument::ready(Document::new());
        let (_sub, seen) = recorder(&doc);

        let patches = doc.change(&mut |d: &mut Document| {
            d.store_mut().insert("shape:1".into(), CrdtValue::empty_map());
        });

        assert_eq!(patches.len(), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[patches]);
        assert_eq!(doc.current_value().unwrap().record_count(), 1);
    }

    #[test]
    fn test_empty_transaction_is_silent() {
        let doc = MemoryDocument::ready(Document::new());
        let (_sub, seen) = recorder(&doc);

        assert!(doc.change(&mut |_d: &mut Document| {}).is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let doc = MemoryDocument::ready(Document::new());
        let (sub, seen) = recorder(&doc);
        drop(sub);
        assert_eq!(doc.listener_count(), 0);

        doc.apply_remote(&mut |d: &mut Document| {
            d.store_mut().insert("shape:1".into(), CrdtValue::empty_map());
        });
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_absent_document() {
        let doc = MemoryDocument::absent();
        assert!(doc.is_ready());
        assert!(doc.current_value().is_none());
    }

    #[tokio::test]
    async fn test_when_ready_waits_for_mark_ready() {
        let doc = Arc::new(MemoryDocument::new(Document::new()));
        assert!(!doc.is_ready());

        let waiter = {
            let doc = doc.clone();
            tokio::spawn(async move { doc.when_ready().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        doc.mark_ready();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }
}
