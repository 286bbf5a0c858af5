//! Shared types for the chargepool API

use chargepool_util::{AccountId, Amount, ChargerIndex, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allocation strategy a pool runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Pre-paid fixed window with lazy expiry
    Reservation,
    /// Pay-at-stop for measured usage
    Metered,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::Reservation => "reservation",
            PricingModel::Metered => "metered",
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of one charger slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub index: ChargerIndex,
    pub occupant: Option<AccountId>,
    pub start_time: Timestamp,
    /// End of the reservation window. Always zero for metered pools.
    pub end_time: Timestamp,
    /// Charging has begun inside the reservation window (metered: occupied)
    pub active: bool,
    /// Whether an allocation at this instant could claim the slot
    pub available: bool,
}

/// Full pool state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStateSnapshot {
    pub api_version: u32,
    pub model: PricingModel,
    pub cost_per_unit: Amount,
    pub admin: AccountId,
    pub paused: bool,
    pub now: Timestamp,
    pub service_balance: Amount,
    pub slots: Vec<SlotView>,
}

impl PoolStateSnapshot {
    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|s| s.available).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_serializes_snake_case() {
        let json = serde_json::to_string(&PricingModel::Metered).unwrap();
        assert_eq!(json, "\"metered\"");
        let parsed: PricingModel = serde_json::from_str("\"reservation\"").unwrap();
        assert_eq!(parsed, PricingModel::Reservation);
    }
}
