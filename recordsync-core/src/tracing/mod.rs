//! Spans around translator work units

use std::time::Instant;
use tracing::{span, Level, Span};

/// Traced operation wrapper
pub struct TracedOperation {
    span: Span,
    start: Instant,
}

impl TracedOperation {
    /// Start a new traced operation
    pub fn new(operation_name: &str) -> Self {
        let span = span!(Level::INFO, "operation", name = operation_name);

        Self { span, start: Instant::now() }
    }

    /// Record an event in the trace
    pub fn record_event(&self, event: &str) {
        tracing::debug!(parent: &self.span, event = event);
    }

    /// Record an error in the trace
    pub fn record_error(&self, error: &str) {
        tracing::error!(parent: &self.span, error = error);
    }

    /// Complete the operation and record duration
    pub fn complete(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            parent: &self.span,
            duration_us = duration.as_micros() as u64,
            "operation completed"
        );
    }
}

/// Trace the coordinator paths
pub mod sync {
    use super::*;

    /// Document patches flowing into the record store
    pub fn trace_inbound(patch_count: usize) -> TracedOperation {
        let op = TracedOperation::new("sync_inbound");
        tracing::trace!(parent: &op.span, patch_count = patch_count);
        op
    }

    /// Store changes flowing into the document
    pub fn trace_outbound(change_count: usize) -> TracedOperation {
        let op = TracedOperation::new("sync_outbound");
        tracing::trace!(parent: &op.span, change_count = change_count);
        op
    }

    /// One-time load of the document into the store
    pub fn trace_snapshot(record_count: usize) -> TracedOperation {
        let op = TracedOperation::new("sync_snapshot");
        tracing::info!(parent: &op.span, record_count = record_count);
        op
    }
}
