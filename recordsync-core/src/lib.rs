pub mod config;
pub mod core_doc;
pub mod core_records;
pub mod core_sync;
pub mod logging;
pub mod subscription;
pub mod tracing;

#[cfg(test)]
pub mod test_utils;

pub use config::{Config, ConfigError};
pub use core_doc::{Document, DocumentHandle, MemoryDocument, Patch};
pub use core_records::{ChangeSet, MemoryRecordStore, Record, RecordId, RecordStore};
pub use core_sync::{SyncCoordinator, SyncError, SyncResult, SyncSession, SyncStatus};
pub use logging::{init_logging, LogLevel};
pub use subscription::Subscription;
