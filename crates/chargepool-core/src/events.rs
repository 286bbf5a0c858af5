//! Core events emitted by the lifecycles

use chargepool_api::EventPayload;
use chargepool_util::{AccountId, Amount, ChargerIndex, Timestamp};

/// Events emitted by the core. Only events of committed operations are
/// ever observed outside the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    ReservationCreated {
        account: AccountId,
        charger: ChargerIndex,
        start_time: Timestamp,
        end_time: Timestamp,
        cost: Amount,
    },

    ChargingStarted {
        account: AccountId,
        charger: ChargerIndex,
        at: Timestamp,
    },

    /// Explicit stop, or expiry reclaimed by a sweep
    ChargingEnded {
        account: AccountId,
        charger: ChargerIndex,
        at: Timestamp,
    },

    CostCharged {
        account: AccountId,
        charger: ChargerIndex,
        cost: Amount,
    },

    Paused {
        by: AccountId,
    },

    Unpaused {
        by: AccountId,
    },

    Withdrawn {
        to: AccountId,
        amount: Amount,
    },
}

impl From<CoreEvent> for EventPayload {
    fn from(event: CoreEvent) -> Self {
        match event {
            CoreEvent::ReservationCreated {
                account,
                charger,
                start_time,
                end_time,
                cost,
            } => EventPayload::ReservationCreated {
                account,
                charger,
                start_time,
                end_time,
                cost,
            },
            CoreEvent::ChargingStarted { account, charger, at } => {
                EventPayload::ChargingStarted { account, charger, at }
            }
            CoreEvent::ChargingEnded { account, charger, at } => {
                EventPayload::ChargingEnded { account, charger, at }
            }
            CoreEvent::CostCharged { account, charger, cost } => {
                EventPayload::CostCharged { account, charger, cost }
            }
            CoreEvent::Paused { by } => EventPayload::Paused { by },
            CoreEvent::Unpaused { by } => EventPayload::Unpaused { by },
            CoreEvent::Withdrawn { to, amount } => EventPayload::Withdrawn { to, amount },
        }
    }
}
