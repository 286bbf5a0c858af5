//! Configuration validation

use crate::schema::{RawConfig, RawReservation};
use chargepool_api::PricingModel;
use chargepool_util::{BILLING_UNIT_SECS, MAX_MINUTES, MAX_SLOTS, MIN_MINUTES};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Charger count {0} outside 1..{max}", max = MAX_SLOTS)]
    InvalidChargerCount(usize),

    #[error("cost_per_unit must be positive")]
    InvalidPrice,

    #[error("admin identity cannot be empty")]
    EmptyAdmin,

    #[error("Reservation window invalid: {0}")]
    InvalidWindow(String),

    #[error("[reservation] is only meaningful for the reservation model")]
    WindowOnMeteredPool,

    #[error("Duplicate account ID: {0}")]
    DuplicateAccount(String),

    #[error("Account ID cannot be empty")]
    EmptyAccount,
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let pool = &config.pool;
    if pool.chargers == 0 || pool.chargers >= MAX_SLOTS {
        errors.push(ValidationError::InvalidChargerCount(pool.chargers));
    }
    if pool.cost_per_unit == 0 {
        errors.push(ValidationError::InvalidPrice);
    }
    if pool.admin.trim().is_empty() {
        errors.push(ValidationError::EmptyAdmin);
    }

    if let Some(window) = &config.reservation {
        if pool.model == PricingModel::Metered {
            errors.push(ValidationError::WindowOnMeteredPool);
        }
        if let Err(e) = validate_window(window) {
            errors.push(e);
        }
    }

    let mut seen = HashSet::new();
    for account in &config.accounts {
        if account.id.trim().is_empty() {
            errors.push(ValidationError::EmptyAccount);
        } else if !seen.insert(&account.id) {
            errors.push(ValidationError::DuplicateAccount(account.id.clone()));
        }
    }

    errors
}

fn validate_window(window: &RawReservation) -> Result<(), ValidationError> {
    let min = window.min_minutes.unwrap_or(MIN_MINUTES);
    let max = window.max_minutes.unwrap_or(MAX_MINUTES);

    if min == 0 {
        return Err(ValidationError::InvalidWindow("min_minutes must be positive".into()));
    }
    if min > max {
        return Err(ValidationError::InvalidWindow(format!(
            "min_minutes {} exceeds max_minutes {}",
            min, max
        )));
    }
    if u64::from(max) > u64::MAX / BILLING_UNIT_SECS {
        return Err(ValidationError::InvalidWindow(format!(
            "max_minutes {} is too large",
            max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawAccount, RawPool, RawServiceConfig};

    fn base(model: PricingModel) -> RawConfig {
        RawConfig {
            config_version: 1,
            service: RawServiceConfig::default(),
            pool: RawPool {
                model,
                chargers: 16,
                cost_per_unit: 1000,
                admin: "uid:0".into(),
            },
            reservation: None,
            accounts: vec![],
        }
    }

    #[test]
    fn valid_config_has_no_errors() {
        assert!(validate_config(&base(PricingModel::Reservation)).is_empty());
        assert!(validate_config(&base(PricingModel::Metered)).is_empty());
    }

    #[test]
    fn charger_count_bounds() {
        let mut cfg = base(PricingModel::Reservation);
        cfg.pool.chargers = 0;
        assert!(matches!(
            validate_config(&cfg)[..],
            [ValidationError::InvalidChargerCount(0)]
        ));

        cfg.pool.chargers = MAX_SLOTS - 1;
        assert!(validate_config(&cfg).is_empty());

        cfg.pool.chargers = MAX_SLOTS;
        assert_eq!(validate_config(&cfg).len(), 1);
    }

    #[test]
    fn inverted_window_rejected() {
        let mut cfg = base(PricingModel::Reservation);
        cfg.reservation = Some(RawReservation {
            min_minutes: Some(60),
            max_minutes: Some(30),
        });
        assert!(matches!(
            validate_config(&cfg)[..],
            [ValidationError::InvalidWindow(_)]
        ));
    }

    #[test]
    fn window_on_metered_pool_rejected() {
        let mut cfg = base(PricingModel::Metered);
        cfg.reservation = Some(RawReservation::default());
        assert!(matches!(
            validate_config(&cfg)[..],
            [ValidationError::WindowOnMeteredPool]
        ));
    }

    #[test]
    fn duplicate_accounts_rejected() {
        let mut cfg = base(PricingModel::Metered);
        cfg.accounts = vec![
            RawAccount { id: "a".into(), balance: 1 },
            RawAccount { id: "a".into(), balance: 2 },
            RawAccount { id: " ".into(), balance: 3 },
        ];
        let errors = validate_config(&cfg);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::DuplicateAccount(ref id) if id == "a"));
        assert!(matches!(errors[1], ValidationError::EmptyAccount));
    }
}
