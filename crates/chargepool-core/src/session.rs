//! Metered session lifecycle
//!
//! Usage starts immediately with no commitment to a duration and is billed
//! at stop, rounded up to whole minutes with a one-minute minimum. There is
//! no window and no expiry: a session runs until its holder stops it.

use chargepool_api::SlotView;
use chargepool_util::{AccountId, Amount, ChargeError, ChargeResult, ChargerIndex, Timestamp};
use tracing::info;

use crate::{AccessGuard, BillingEngine, Call, CoreEvent, Effects, ResourcePool, SlotState};

/// One charger under the metered model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSlot {
    pub occupant: Option<AccountId>,
    /// Zero while unoccupied
    pub start_time: Timestamp,
}

impl SessionSlot {
    pub fn is_held_by(&self, account: &AccountId) -> bool {
        self.occupant.as_ref() == Some(account)
    }
}

impl SlotState for SessionSlot {
    fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Result of settling a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub charger: ChargerIndex,
    pub elapsed_secs: u64,
    pub billed_units: u64,
    pub cost: Amount,
    pub refund: Amount,
}

/// Pay-at-stop allocation over a fixed pool
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    pool: ResourcePool<SessionSlot>,
    billing: BillingEngine,
}

impl SessionLifecycle {
    pub fn new(chargers: usize, cost_per_unit: Amount) -> ChargeResult<Self> {
        let pool = ResourcePool::new(chargers)?;
        let billing = BillingEngine::new(cost_per_unit)?;

        info!(chargers, cost_per_unit, "Metered pool initialized");

        Ok(Self { pool, billing })
    }

    pub fn pool(&self) -> &ResourcePool<SessionSlot> {
        &self.pool
    }

    pub fn billing(&self) -> &BillingEngine {
        &self.billing
    }

    /// Occupy the lowest free charger
    pub fn start_charging(
        &mut self,
        guard: &AccessGuard,
        call: &Call,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<ChargerIndex> {
        guard.require_not_paused()?;

        if self.pool.is_empty() {
            return Err(ChargeError::NoResourceConfigured);
        }
        let charger = self
            .pool
            .first_empty()
            .ok_or(ChargeError::NoResourceAvailable)?;

        // Zero marks a free slot, so a clock reading the epoch starts one second in
        let start_time = call.now.max(Timestamp::from_secs(1));
        *self.pool.get_mut(charger)? = SessionSlot {
            occupant: Some(call.caller.clone()),
            start_time,
        };

        info!(account = %call.caller, charger, "Session started");
        fx.emit(CoreEvent::ChargingStarted {
            account: call.caller.clone(),
            charger,
            at: start_time,
        });
        Ok(charger)
    }

    /// The slot `caller` is charging on, or why stopping it must fail
    pub fn held_slot(
        &self,
        caller: &AccountId,
        charger: ChargerIndex,
    ) -> ChargeResult<&SessionSlot> {
        let slot = self.pool.get(charger)?;
        if slot.is_empty() {
            return Err(ChargeError::NotInUse(charger));
        }
        if !slot.is_held_by(caller) {
            return Err(ChargeError::NotYourSession(charger));
        }
        Ok(slot)
    }

    /// Settle and release the caller's session on `charger`
    pub fn stop_charging(
        &mut self,
        guard: &AccessGuard,
        call: &Call,
        charger: ChargerIndex,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<Settlement> {
        guard.require_not_paused()?;
        let slot = self.held_slot(&call.caller, charger)?;

        let elapsed_secs = call.now.seconds_since(slot.start_time);
        let billed_units = self.billing.session_units(elapsed_secs);
        let cost = self.billing.session_cost(elapsed_secs)?;
        let refund = self.billing.require_payment(cost, call.payment)?;

        self.pool.reset(charger)?;
        fx.emit(CoreEvent::CostCharged {
            account: call.caller.clone(),
            charger,
            cost,
        });
        fx.refund(&call.caller, refund)?;

        info!(
            account = %call.caller,
            charger,
            elapsed_secs,
            billed_units,
            cost,
            refund,
            "Session settled"
        );

        Ok(Settlement {
            charger,
            elapsed_secs,
            billed_units,
            cost,
            refund,
        })
    }

    /// What stopping the session on `charger` would cost at `now`
    pub fn current_cost(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<Amount> {
        let slot = self.pool.get(charger)?;
        if slot.is_empty() {
            return Err(ChargeError::NotInUse(charger));
        }
        self.billing.session_cost(now.seconds_since(slot.start_time))
    }

    pub fn is_available(&self, charger: ChargerIndex) -> ChargeResult<bool> {
        Ok(self.pool.get(charger)?.is_empty())
    }

    pub fn slot_view(&self, charger: ChargerIndex) -> ChargeResult<SlotView> {
        let slot = self.pool.get(charger)?;
        Ok(SlotView {
            index: charger,
            occupant: slot.occupant.clone(),
            start_time: slot.start_time,
            end_time: Timestamp::ZERO,
            active: !slot.is_empty(),
            available: slot.is_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ledger, Payments};

    const T0: u64 = 1_700_000_000;

    fn at(secs: u64) -> Timestamp {
        Timestamp::from_secs(T0 + secs)
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn guard() -> AccessGuard {
        AccessGuard::new(AccountId::new("admin"))
    }

    fn funded_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.credit(&AccountId::service(), 1_000_000).unwrap();
        ledger
    }

    #[test]
    fn construction_validates() {
        assert_eq!(
            SessionLifecycle::new(32, 1).unwrap_err(),
            ChargeError::InvalidResourceCount(32)
        );
        assert_eq!(
            SessionLifecycle::new(1, 0).unwrap_err(),
            ChargeError::InvalidPrice
        );
        let lc = SessionLifecycle::new(3, 7).unwrap();
        assert_eq!(lc.billing().cost_per_unit(), 7);
        assert!((0..3).all(|i| lc.is_available(i).unwrap()));
    }

    #[test]
    fn start_fills_lowest_index() {
        let mut lc = SessionLifecycle::new(2, 1000).unwrap();
        let mut ledger = funded_ledger();
        let mut fx = Effects::new(&mut ledger);
        let call = Call::new(alice(), at(0));

        assert_eq!(lc.start_charging(&guard(), &call, &mut fx).unwrap(), 0);
        assert_eq!(lc.start_charging(&guard(), &call, &mut fx).unwrap(), 1);
        assert_eq!(
            lc.start_charging(&guard(), &call, &mut fx).unwrap_err(),
            ChargeError::NoResourceAvailable
        );
    }

    #[test]
    fn session_at_epoch_is_still_occupied() {
        let mut lc = SessionLifecycle::new(1, 1000).unwrap();
        let mut ledger = funded_ledger();
        let mut fx = Effects::new(&mut ledger);

        lc.start_charging(&guard(), &Call::new(alice(), Timestamp::ZERO), &mut fx)
            .unwrap();

        let slot = lc.pool().get(0).unwrap();
        assert!(slot.is_held_by(&alice()));
        assert!(!slot.start_time.is_zero());
        assert!(lc.slot_view(0).unwrap().active);
        assert_eq!(lc.current_cost(0, Timestamp::from_secs(60)).unwrap(), 1000);
    }

    #[test]
    fn instant_stop_bills_one_unit() {
        let mut lc = SessionLifecycle::new(1, 1000).unwrap();
        let mut ledger = funded_ledger();
        let mut fx = Effects::new(&mut ledger);

        lc.start_charging(&guard(), &Call::new(alice(), at(0)), &mut fx)
            .unwrap();
        let settled = lc
            .stop_charging(
                &guard(),
                &Call::new(alice(), at(0)).with_payment(1000),
                0,
                &mut fx,
            )
            .unwrap();

        assert_eq!(settled.elapsed_secs, 0);
        assert_eq!(settled.billed_units, 1);
        assert_eq!(settled.cost, 1000);
        assert_eq!(settled.refund, 0);
        assert_eq!(lc.pool().get(0).unwrap(), &SessionSlot::default());
    }

    #[test]
    fn partial_minute_rounds_up() {
        let mut lc = SessionLifecycle::new(1, 1000).unwrap();
        let mut ledger = funded_ledger();
        let mut fx = Effects::new(&mut ledger);

        lc.start_charging(&guard(), &Call::new(alice(), at(0)), &mut fx)
            .unwrap();
        assert_eq!(lc.current_cost(0, at(61)).unwrap(), 2000);

        let settled = lc
            .stop_charging(
                &guard(),
                &Call::new(alice(), at(61)).with_payment(5000),
                0,
                &mut fx,
            )
            .unwrap();
        assert_eq!(settled.billed_units, 2);
        assert_eq!(settled.cost, 2000);
        assert_eq!(settled.refund, 3000);
        drop(fx);

        assert_eq!(ledger.balance_of(&alice()), 3000);
    }

    #[test]
    fn stop_errors() {
        let mut lc = SessionLifecycle::new(2, 1000).unwrap();
        let mut ledger = funded_ledger();
        let mut fx = Effects::new(&mut ledger);

        assert_eq!(
            lc.stop_charging(&guard(), &Call::new(alice(), at(0)), 2, &mut fx)
                .unwrap_err(),
            ChargeError::InvalidIndex { index: 2, count: 2 }
        );
        assert_eq!(
            lc.stop_charging(&guard(), &Call::new(alice(), at(0)), 0, &mut fx)
                .unwrap_err(),
            ChargeError::NotInUse(0)
        );

        lc.start_charging(&guard(), &Call::new(alice(), at(0)), &mut fx)
            .unwrap();
        assert_eq!(
            lc.stop_charging(
                &guard(),
                &Call::new(AccountId::new("bob"), at(10)).with_payment(1000),
                0,
                &mut fx
            )
            .unwrap_err(),
            ChargeError::NotYourSession(0)
        );
        assert_eq!(
            lc.stop_charging(
                &guard(),
                &Call::new(alice(), at(120)).with_payment(1999),
                0,
                &mut fx
            )
            .unwrap_err(),
            ChargeError::InsufficientPayment {
                required: 2000,
                provided: 1999
            }
        );
        assert!(!lc.is_available(0).unwrap());
    }

    #[test]
    fn sessions_never_expire() {
        let mut lc = SessionLifecycle::new(1, 1).unwrap();
        let mut ledger = funded_ledger();
        let mut fx = Effects::new(&mut ledger);
        lc.start_charging(&guard(), &Call::new(alice(), at(0)), &mut fx)
            .unwrap();

        let view = lc.slot_view(0).unwrap();
        assert!(view.active);
        assert!(!view.available);
        assert_eq!(view.end_time, Timestamp::ZERO);

        // A week later the charger is still held
        assert!(!lc.is_available(0).unwrap());
        assert_eq!(lc.current_cost(0, at(7 * 24 * 3600)).unwrap(), 7 * 24 * 60);
    }

    #[test]
    fn refund_failure_surfaces() {
        let mut lc = SessionLifecycle::new(1, 1000).unwrap();
        let mut ledger = funded_ledger();
        ledger.freeze(&alice());
        let mut fx = Effects::new(&mut ledger);

        lc.start_charging(&guard(), &Call::new(alice(), at(0)), &mut fx)
            .unwrap();
        let err = lc
            .stop_charging(
                &guard(),
                &Call::new(alice(), at(30)).with_payment(1500),
                0,
                &mut fx,
            )
            .unwrap_err();
        assert!(matches!(err, ChargeError::RefundFailed(_)));
        drop(fx);
        assert_eq!(ledger.service_balance(), 1_000_000);
    }
}
