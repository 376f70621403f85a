/*
    handle.rs - The document engine contract consumed by the translator
*/

use super::document::Document;
use super::patch::Patch;
use crate::subscription::Subscription;
use async_trait::async_trait;
use std::sync::Arc;

/// Callback invoked synchronously with every committed patch batch,
/// whether the mutation was local or remote
pub type PatchListener = Arc<dyn Fn(&[Patch]) + Send + Sync>;

#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Resolves once the document is loaded (or known to be absent)
    async fn when_ready(&self);

    /// Copy of the current document, if there is one
    fn current_value(&self) -> Option<Document>;

    /// Run `mutator` inside one committed transaction. Subscribers are
    /// notified before this returns; the produced batch is returned as well.
    fn change(&self, mutator: &mut dyn FnMut(&mut Document)) -> Vec<Patch>;

    fn on_change(&self, listener: PatchListener) -> Subscription;
}
