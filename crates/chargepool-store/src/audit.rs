//! Audit event types

use chargepool_api::{ErrorCode, EventPayload, PricingModel};
use chargepool_util::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Configuration loaded at startup
    ConfigLoaded {
        model: PricingModel,
        chargers: usize,
        cost_per_unit: u64,
    },

    /// Event emitted by a committed operation
    Pool { event: EventPayload },

    /// Operation that failed and left no state behind
    OperationRejected {
        caller: AccountId,
        operation: String,
        code: ErrorCode,
        message: String,
    },

    /// Client connected
    ClientConnected {
        client_id: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Row id, assigned by the store
    pub id: i64,

    pub timestamp: DateTime<Utc>,

    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn at(timestamp: DateTime<Utc>, event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_event_nests_payload() {
        let event = AuditEventType::Pool {
            event: EventPayload::Paused {
                by: AccountId::new("admin"),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pool");
        assert_eq!(json["event"]["type"], "paused");

        let parsed: AuditEventType = serde_json::from_value(json).unwrap();
        assert!(matches!(
            parsed,
            AuditEventType::Pool {
                event: EventPayload::Paused { .. }
            }
        ));
    }

    #[test]
    fn rejection_records_code() {
        let event = AuditEventType::OperationRejected {
            caller: AccountId::from_uid(1000),
            operation: "reserve".into(),
            code: ErrorCode::NoResourceAvailable,
            message: "no charger available".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["caller"], "uid:1000");
        assert_eq!(json["code"], "no_resource_available");
    }
}
