//! Audit sink port with scoped suppression.
//!
//! The audit store itself lives outside this workspace; services report
//! changes through [`AuditSink::record`]. Cascade deletes (and other bulk
//! operations that would flood the log with per-row noise) run inside a
//! suppression scope: [`AuditLog::suppress`] returns an RAII guard, and
//! recording resumes when the guard drops — on every exit path, including
//! early returns and panics.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single change notification handed to the audit sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Entity kind, e.g. `"user"` or `"otp_device"`.
    pub entity: &'static str,
    /// Identifier of the changed row.
    pub entity_id: String,
    /// What happened, e.g. `"2fa_enabled"`.
    pub action: &'static str,
}

impl AuditRecord {
    pub fn new(entity: &'static str, entity_id: impl Into<String>, action: &'static str) -> Self {
        Self {
            entity,
            entity_id: entity_id.into(),
            action,
        }
    }
}

/// Destination for audit records. The production sink forwards to the
/// external audit pipeline; tests capture records in memory.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Sink that emits audit records as structured log events. Stands in for the
/// external audit pipeline, which consumes the same fields.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        ::tracing::info!(
            entity = record.entity,
            entity_id = %record.entity_id,
            action = record.action,
            "audit"
        );
    }
}

/// Handle to the audit sink, cloneable into application state.
///
/// Suppression is depth-counted so nested scopes behave: recording resumes
/// only when the outermost guard drops.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    suppressed: Arc<AtomicUsize>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            suppressed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report a change unless a suppression scope is active.
    pub fn record(&self, record: AuditRecord) {
        if self.suppressed.load(Ordering::SeqCst) == 0 {
            self.sink.record(record);
        }
    }

    /// Enter a suppression scope. Records are dropped until the returned
    /// guard goes out of scope.
    #[must_use = "suppression ends when the guard is dropped"]
    pub fn suppress(&self) -> AuditPause {
        self.suppressed.fetch_add(1, Ordering::SeqCst);
        AuditPause {
            suppressed: Arc::clone(&self.suppressed),
        }
    }
}

/// RAII guard returned by [`AuditLog::suppress`].
pub struct AuditPause {
    suppressed: Arc<AtomicUsize>,
}

impl Drop for AuditPause {
    fn drop(&mut self) {
        self.suppressed.fetch_sub(1, Ordering::SeqCst);
    }
}
