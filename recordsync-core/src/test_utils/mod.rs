//! Test utilities and helpers for recordsync
//!
//! Fixtures for building records, stores, documents and patch batches from
//! JSON literals, plus small assertion helpers.

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
