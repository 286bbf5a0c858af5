//! Reservation lifecycle
//!
//! A requester pre-pays for a fixed window and holds a charger exclusively
//! until they stop charging or the window elapses. Per-slot states:
//!
//! ```text
//! Empty -> Reserved -> Charging -> Empty
//!             |           |
//!             +-----------+--> (window elapsed) -> Empty on next sweep
//! ```
//!
//! Expiry is lazy: an elapsed reservation stays in the slot until a scan or
//! an explicit sweep touches it. Read-only queries report the logical view
//! ("available") without reclaiming anything.

use chargepool_api::SlotView;
use chargepool_config::ReservationWindow;
use chargepool_util::{
    AccountId, Amount, BILLING_UNIT_SECS, ChargeError, ChargeResult, ChargerIndex, Timestamp,
};
use tracing::{debug, info};

use crate::{AccessGuard, BillingEngine, Call, CoreEvent, Effects, ResourcePool, SlotState};

/// One charger under the reservation model.
///
/// `occupant == None` exactly when `start_time`, `end_time` are zero and
/// `active` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationSlot {
    pub occupant: Option<AccountId>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub active: bool,
}

impl ReservationSlot {
    pub fn is_held_by(&self, account: &AccountId) -> bool {
        self.occupant.as_ref() == Some(account)
    }

    /// Occupied, but the window has elapsed and nobody has reclaimed it yet
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.occupant.is_some() && now > self.end_time
    }

    pub fn is_available(&self, now: Timestamp) -> bool {
        self.occupant.is_none() || now > self.end_time
    }

    pub fn time_remaining(&self, now: Timestamp) -> u64 {
        if self.occupant.is_none() {
            return 0;
        }
        self.end_time.saturating_seconds_until(now)
    }
}

impl SlotState for ReservationSlot {
    fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Result of a successful reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub charger: ChargerIndex,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub cost: Amount,
    pub refund: Amount,
}

/// Pre-paid, window-bounded allocation over a fixed pool
#[derive(Debug, Clone)]
pub struct ReservationLifecycle {
    pool: ResourcePool<ReservationSlot>,
    billing: BillingEngine,
    window: ReservationWindow,
}

impl ReservationLifecycle {
    pub fn new(
        chargers: usize,
        cost_per_unit: Amount,
        window: ReservationWindow,
    ) -> ChargeResult<Self> {
        let pool = ResourcePool::new(chargers)?;
        let billing = BillingEngine::new(cost_per_unit)?;

        info!(
            chargers,
            cost_per_unit,
            min_minutes = window.min_minutes,
            max_minutes = window.max_minutes,
            "Reservation pool initialized"
        );

        Ok(Self {
            pool,
            billing,
            window,
        })
    }

    pub fn pool(&self) -> &ResourcePool<ReservationSlot> {
        &self.pool
    }

    pub fn billing(&self) -> &BillingEngine {
        &self.billing
    }

    pub fn window(&self) -> ReservationWindow {
        self.window
    }

    /// Reject lengths outside the configured window, whatever is paid
    pub fn check_duration(&self, minutes: u32) -> ChargeResult<()> {
        if self.window.contains(minutes) {
            return Ok(());
        }
        Err(ChargeError::DurationOutOfRange {
            minutes,
            min: self.window.min_minutes,
            max: self.window.max_minutes,
        })
    }

    /// Reserve the lowest available charger for `minutes`, paid by
    /// `call.payment`. Overpayment is refunded immediately.
    pub fn reserve(
        &mut self,
        guard: &AccessGuard,
        call: &Call,
        minutes: u32,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<Reservation> {
        guard.require_not_paused()?;
        self.check_duration(minutes)?;

        let charger = self.scan(call.now, fx)?;
        let cost = self.billing.reservation_cost(minutes)?;
        let refund = self.billing.require_payment(cost, call.payment)?;

        let start_time = call.now;
        let end_time = start_time
            .checked_add_secs(u64::from(minutes) * BILLING_UNIT_SECS)
            .ok_or(ChargeError::ArithmeticOverflow)?;

        *self.pool.get_mut(charger)? = ReservationSlot {
            occupant: Some(call.caller.clone()),
            start_time,
            end_time,
            active: false,
        };

        fx.refund(&call.caller, refund)?;

        info!(
            account = %call.caller,
            charger,
            minutes,
            cost,
            refund,
            "Charger reserved"
        );

        fx.emit(CoreEvent::ReservationCreated {
            account: call.caller.clone(),
            charger,
            start_time,
            end_time,
            cost,
        });

        Ok(Reservation {
            charger,
            start_time,
            end_time,
            cost,
            refund,
        })
    }

    /// Begin charging on a charger the caller holds an unexpired reservation for
    pub fn start_charging(
        &mut self,
        guard: &AccessGuard,
        call: &Call,
        charger: ChargerIndex,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<()> {
        guard.require_not_paused()?;

        let slot = self.pool.get_mut(charger)?;
        if !slot.is_held_by(&call.caller) {
            return Err(ChargeError::NotYourReservation(charger));
        }
        if call.now >= slot.end_time {
            return Err(ChargeError::ReservationExpired(charger));
        }
        if slot.active {
            return Err(ChargeError::AlreadyCharging(charger));
        }

        slot.active = true;

        info!(account = %call.caller, charger, "Charging started");
        fx.emit(CoreEvent::ChargingStarted {
            account: call.caller.clone(),
            charger,
            at: call.now,
        });
        Ok(())
    }

    /// Stop charging and release the charger. Unused reserved minutes are
    /// forfeited.
    pub fn stop_charging(
        &mut self,
        guard: &AccessGuard,
        call: &Call,
        charger: ChargerIndex,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<()> {
        guard.require_not_paused()?;

        let slot = self.pool.get(charger)?;
        if !slot.is_held_by(&call.caller) {
            return Err(ChargeError::NotYourReservation(charger));
        }
        if !slot.active {
            return Err(ChargeError::NotCharging(charger));
        }

        let forfeited_secs = slot.time_remaining(call.now);
        fx.emit(CoreEvent::ChargingEnded {
            account: call.caller.clone(),
            charger,
            at: call.now,
        });
        self.pool.reset(charger)?;

        info!(
            account = %call.caller,
            charger,
            forfeited_secs,
            "Charging stopped, charger released"
        );
        Ok(())
    }

    /// Reclaim `charger` if its window has elapsed.
    ///
    /// Returns whether the charger is available after the call.
    pub fn check_and_release_expired(
        &mut self,
        guard: &AccessGuard,
        now: Timestamp,
        charger: ChargerIndex,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<bool> {
        guard.require_not_paused()?;
        self.sweep(now, charger, fx)
    }

    /// Lowest available charger, reclaiming expired ones on the way
    pub fn find_available_charger(
        &mut self,
        guard: &AccessGuard,
        now: Timestamp,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<ChargerIndex> {
        guard.require_not_paused()?;
        self.scan(now, fx)
    }

    /// Seconds left in the reservation window. Never reclaims.
    pub fn time_remaining(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<u64> {
        Ok(self.pool.get(charger)?.time_remaining(now))
    }

    pub fn is_available(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<bool> {
        Ok(self.pool.get(charger)?.is_available(now))
    }

    pub fn slot_view(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<SlotView> {
        let slot = self.pool.get(charger)?;
        Ok(SlotView {
            index: charger,
            occupant: slot.occupant.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
            active: slot.active,
            available: slot.is_available(now),
        })
    }

    fn scan(&mut self, now: Timestamp, fx: &mut Effects<'_>) -> ChargeResult<ChargerIndex> {
        for charger in 0..self.pool.len() {
            if self.sweep(now, charger, fx)? {
                return Ok(charger);
            }
        }
        Err(ChargeError::NoResourceAvailable)
    }

    fn sweep(
        &mut self,
        now: Timestamp,
        charger: ChargerIndex,
        fx: &mut Effects<'_>,
    ) -> ChargeResult<bool> {
        let slot = self.pool.get(charger)?;
        if !slot.is_expired(now) {
            return Ok(slot.is_available(now));
        }

        if let (Some(account), true) = (&slot.occupant, slot.active) {
            fx.emit(CoreEvent::ChargingEnded {
                account: account.clone(),
                charger,
                at: now,
            });
        }

        debug!(
            charger,
            occupant = ?slot.occupant,
            end_time = %slot.end_time,
            "Expired reservation reclaimed"
        );
        self.pool.reset(charger)?;
        Ok(true)
    }
}
