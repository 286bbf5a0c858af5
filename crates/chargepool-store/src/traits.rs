//! Store trait definitions

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    /// Append an audit event, returning the id it was stored under
    fn append_audit(&self, event: AuditEvent) -> StoreResult<i64>;

    /// Most recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
