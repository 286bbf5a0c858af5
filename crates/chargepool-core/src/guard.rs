//! Admin gate and pause switch

use chargepool_util::{AccountId, Amount, ChargeError, ChargeResult};
use tracing::info;

use crate::{CoreEvent, Effects};

/// Administrative state held by the service instance and lent to both
/// lifecycles for every mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    admin: AccountId,
    paused: bool,
}

impl AccessGuard {
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            paused: false,
        }
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn require_admin(&self, caller: &AccountId) -> ChargeResult<()> {
        if caller != &self.admin {
            return Err(ChargeError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    pub fn require_not_paused(&self) -> ChargeResult<()> {
        if self.paused {
            return Err(ChargeError::ServiceHalted);
        }
        Ok(())
    }

    /// Halt mutations. Pausing an already paused service is allowed.
    pub fn pause(&mut self, caller: &AccountId, fx: &mut Effects<'_>) -> ChargeResult<()> {
        self.require_admin(caller)?;
        self.paused = true;
        info!(by = %caller, "Service paused");
        fx.emit(CoreEvent::Paused { by: caller.clone() });
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId, fx: &mut Effects<'_>) -> ChargeResult<()> {
        self.require_admin(caller)?;
        self.paused = false;
        info!(by = %caller, "Service unpaused");
        fx.emit(CoreEvent::Unpaused { by: caller.clone() });
        Ok(())
    }

    /// Move the entire service balance to the admin
    pub fn withdraw(&self, caller: &AccountId, fx: &mut Effects<'_>) -> ChargeResult<Amount> {
        self.require_admin(caller)?;
        let amount = fx.service_balance();
        fx.payout(&self.admin, amount)?;
        info!(to = %self.admin, amount, "Balance withdrawn");
        fx.emit(CoreEvent::Withdrawn {
            to: self.admin.clone(),
            amount,
        });
        Ok(amount)
    }
}
