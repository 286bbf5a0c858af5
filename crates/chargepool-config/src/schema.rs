//! Raw configuration schema (as parsed from TOML)

use chargepool_api::PricingModel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Pool shape and pricing
    pub pool: RawPool,

    /// Reservation window bounds (reservation model only)
    #[serde(default)]
    pub reservation: Option<RawReservation>,

    /// Opening ledger balances
    #[serde(default)]
    pub accounts: Vec<RawAccount>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the audit store
    pub data_dir: Option<PathBuf>,
}

/// Raw pool definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPool {
    /// Allocation strategy
    pub model: PricingModel,

    /// Number of chargers (fixed for the pool's lifetime)
    pub chargers: usize,

    /// Price of one billing unit (one minute)
    pub cost_per_unit: u64,

    /// Identity allowed to pause, unpause and withdraw
    pub admin: String,
}

/// Raw reservation window bounds
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReservation {
    pub min_minutes: Option<u32>,
    pub max_minutes: Option<u32>,
}

/// Raw opening balance
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAccount {
    pub id: String,
    pub balance: u64,
}
