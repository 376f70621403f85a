/*
    core_sync - Bidirectional store <-> document translation

    Handles:
    - Value transcoding (codec)
    - Patch batches into store upserts and deletions (patch_interpreter)
    - Store change sets into minimal document edits (diff_encoder)
    - Loop suppression, startup snapshot and subscriptions (coordinator)
*/

pub mod codec;
pub mod coordinator;
pub mod diff_encoder;
pub mod errors;
pub mod patch_interpreter;

#[cfg(test)]
pub mod tests;

pub use codec::{
    document_from_snapshot, record_from_crdt, record_to_crdt, snapshot_from_document, to_crdt, to_plain,
};
pub use coordinator::{SyncCoordinator, SyncSession, SyncStatus};
pub use diff_encoder::{reconcile, DiffEncoder, EncodeStats};
pub use errors::{SyncError, SyncResult};
pub use patch_interpreter::{interpret, PatchInterpreter, StoreUpdate};
