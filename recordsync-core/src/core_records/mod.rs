/*
    core_records - The record-store side of synchronization

    A flat collection of identifier-addressed records. The translator only
    needs get/put/remove/snapshot/listen primitives from it, expressed here
    as the `RecordStore` trait, plus an in-memory implementation used by the
    CLI and the tests.
*/

pub mod changes;
pub mod memory;
pub mod record;
pub mod store;

pub use changes::{ChangeScope, ChangeSet, ChangeSource, ScopeRules, StoreChange, StoreSnapshot};
pub use memory::MemoryRecordStore;
pub use record::{Record, RecordId};
pub use store::{ListenFilter, RecordLookup, RecordStore, StoreListener};
