//! Event types for chargepoold -> client streaming
//!
//! Observers index these; they are the record of what happened, not the
//! response values.

use chargepool_util::{AccountId, Amount, ChargerIndex, Timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::API_VERSION;

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A charger was reserved and paid for
    ReservationCreated {
        account: AccountId,
        charger: ChargerIndex,
        start_time: Timestamp,
        end_time: Timestamp,
        cost: Amount,
    },

    /// Charging began on a charger
    ChargingStarted {
        account: AccountId,
        charger: ChargerIndex,
        at: Timestamp,
    },

    /// Charging ended, explicitly or by reservation expiry
    ChargingEnded {
        account: AccountId,
        charger: ChargerIndex,
        at: Timestamp,
    },

    /// A metered session was settled
    CostCharged {
        account: AccountId,
        charger: ChargerIndex,
        cost: Amount,
    },

    /// Mutations halted by the admin
    Paused { by: AccountId },

    /// Mutations resumed by the admin
    Unpaused { by: AccountId },

    /// Accumulated balance paid out to the admin
    Withdrawn { to: AccountId, amount: Amount },

    /// Service is shutting down
    Shutdown,
}

impl EventPayload {
    /// Stable snake_case name, matching the serde tag
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::ReservationCreated { .. } => "reservation_created",
            EventPayload::ChargingStarted { .. } => "charging_started",
            EventPayload::ChargingEnded { .. } => "charging_ended",
            EventPayload::CostCharged { .. } => "cost_charged",
            EventPayload::Paused { .. } => "paused",
            EventPayload::Unpaused { .. } => "unpaused",
            EventPayload::Withdrawn { .. } => "withdrawn",
            EventPayload::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::ReservationCreated {
            account: AccountId::new("alice"),
            charger: 3,
            start_time: Timestamp::from_secs(100),
            end_time: Timestamp::from_secs(1_000),
            cost: 15_000,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"reservation_created\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        assert_eq!(parsed.payload, event.payload);
    }

    #[test]
    fn name_matches_serde_tag() {
        let payload = EventPayload::CostCharged {
            account: AccountId::new("bob"),
            charger: 0,
            cost: 2_000,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], payload.name());
    }
}
