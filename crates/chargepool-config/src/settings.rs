//! Validated configuration structures

use crate::schema::{RawAccount, RawConfig, RawPool, RawReservation, RawServiceConfig};
use chargepool_api::PricingModel;
use chargepool_util::{
    data_dir_without_env, socket_path_without_env, AccountId, Amount, MAX_MINUTES, MIN_MINUTES,
};
use std::path::PathBuf;

/// Validated configuration ready for use by the core
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub service: ServiceConfig,
    pub pool: PoolSettings,
    pub accounts: Vec<OpeningBalance>,
}

impl PoolConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            pool: PoolSettings::from_raw(raw.pool, raw.reservation),
            accounts: raw.accounts.into_iter().map(OpeningBalance::from_raw).collect(),
        }
    }
}

/// Service-level settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Pool shape, pricing and administration
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub model: PricingModel,
    pub chargers: usize,
    pub cost_per_unit: Amount,
    pub admin: AccountId,
    /// Accepted reservation lengths. Ignored by metered pools.
    pub window: ReservationWindow,
}

impl PoolSettings {
    fn from_raw(raw: RawPool, reservation: Option<RawReservation>) -> Self {
        let reservation = reservation.unwrap_or_default();
        Self {
            model: raw.model,
            chargers: raw.chargers,
            cost_per_unit: raw.cost_per_unit,
            admin: AccountId::new(raw.admin.trim()),
            window: ReservationWindow {
                min_minutes: reservation.min_minutes.unwrap_or(MIN_MINUTES),
                max_minutes: reservation.max_minutes.unwrap_or(MAX_MINUTES),
            },
        }
    }
}

/// Inclusive bounds on reservation length, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationWindow {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl ReservationWindow {
    pub fn contains(&self, minutes: u32) -> bool {
        (self.min_minutes..=self.max_minutes).contains(&minutes)
    }
}

impl Default for ReservationWindow {
    fn default() -> Self {
        Self {
            min_minutes: MIN_MINUTES,
            max_minutes: MAX_MINUTES,
        }
    }
}

/// Initial ledger balance for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningBalance {
    pub account: AccountId,
    pub balance: Amount,
}

impl OpeningBalance {
    fn from_raw(raw: RawAccount) -> Self {
        Self {
            account: AccountId::new(raw.id.trim()),
            balance: raw.balance,
        }
    }
}
