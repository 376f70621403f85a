/*
    core_doc - The replicated-document side of synchronization

    Typed model of the document tree, the patch change log, the engine
    contract (`DocumentHandle`) and an in-memory engine.
*/

pub mod document;
pub mod handle;
pub mod memory;
pub mod observer;
pub mod patch;
pub mod value;

pub use document::{Document, STORE_KEY};
pub use handle::{DocumentHandle, PatchListener};
pub use memory::MemoryDocument;
pub use observer::observe_changes;
pub use patch::{format_path, Patch, Path, PathSegment};
pub use value::{AtomicString, CrdtValue};
