//! Serialized, all-or-nothing execution of operations
//!
//! The runtime plays the part of the surrounding transaction environment.
//! Each operation runs against a private copy of the service state. The copy
//! replaces the live state only if every step succeeded, so a failure at any
//! point leaves slots, guard and balances exactly as they were. This covers
//! slot claims, sweeps, collected payments and refunds. Taking `&mut self`
//! serializes operations; callers sharing a runtime across threads wrap it in
//! a single mutex, which also covers the scan-then-claim sequence.

use chargepool_api::{PoolStateSnapshot, SlotView, API_VERSION};
use chargepool_config::PoolConfig;
use chargepool_util::{
    AccountId, Amount, ChargeError, ChargeResult, ChargerIndex, Clock, Timestamp,
};
use tracing::{debug, info, warn};

use crate::{
    AccessGuard, AllocationModel, Call, ChargeEngine, CoreEvent, Effects, Ledger, Payments,
    Reservation,
};

/// A mutating request against the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Reserve { minutes: u32, payment: Amount },
    /// Reservation pools require the reserved charger; metered pools ignore it
    StartCharging { charger: Option<ChargerIndex> },
    /// `payment` settles metered sessions and is not collected otherwise
    StopCharging { charger: ChargerIndex, payment: Amount },
    ReleaseExpired { charger: ChargerIndex },
    FindAvailable,
    Pause,
    Unpause,
    Withdraw,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Reserve { .. } => "reserve",
            Operation::StartCharging { .. } => "start_charging",
            Operation::StopCharging { .. } => "stop_charging",
            Operation::ReleaseExpired { .. } => "release_expired",
            Operation::FindAvailable => "find_available",
            Operation::Pause => "pause",
            Operation::Unpause => "unpause",
            Operation::Withdraw => "withdraw",
        }
    }
}

/// What a committed operation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reserved(Reservation),
    ChargingStarted { charger: ChargerIndex },
    ChargingStopped {
        charger: ChargerIndex,
        cost: Amount,
        refund: Amount,
    },
    Released { available: bool },
    Found { charger: ChargerIndex },
    Paused,
    Unpaused,
    Withdrawn { amount: Amount },
}

/// Outcome plus the events to publish, in emission order
#[derive(Debug, Clone)]
pub struct Receipt {
    pub outcome: Outcome,
    pub events: Vec<CoreEvent>,
}

/// Everything an operation may change
#[derive(Debug, Clone)]
pub struct ServiceState {
    engine: ChargeEngine,
    guard: AccessGuard,
    ledger: Ledger,
}

impl ServiceState {
    pub fn new(engine: ChargeEngine, guard: AccessGuard, ledger: Ledger) -> Self {
        Self {
            engine,
            guard,
            ledger,
        }
    }

    pub fn engine(&self) -> &ChargeEngine {
        &self.engine
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Attached amount the environment moves into the service account
    /// once `precheck` has passed
    fn collectible(&self, op: &Operation) -> Amount {
        match (op, &self.engine) {
            (Operation::Reserve { payment, .. }, ChargeEngine::Reservation(_)) => *payment,
            (Operation::StopCharging { payment, .. }, ChargeEngine::Metered(_)) => *payment,
            _ => 0,
        }
    }

    /// Rejections that take precedence over a failed collection, whatever
    /// amount is attached
    fn precheck(&self, caller: &AccountId, op: &Operation) -> ChargeResult<()> {
        match op {
            Operation::Pause | Operation::Unpause | Operation::Withdraw => return Ok(()),
            _ => self.guard.require_not_paused()?,
        }
        match (op, &self.engine) {
            (Operation::Reserve { minutes, .. }, engine) => {
                engine.reservation()?.check_duration(*minutes)
            }
            (Operation::StopCharging { charger, .. }, ChargeEngine::Metered(lc)) => {
                lc.held_slot(caller, *charger).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    fn apply(
        &mut self,
        caller: &AccountId,
        now: Timestamp,
        op: &Operation,
    ) -> ChargeResult<Receipt> {
        self.precheck(caller, op)?;

        let payment = self.collectible(op);
        if payment > 0 {
            self.ledger
                .collect(caller, payment)
                .map_err(|e| ChargeError::transfer(e.to_string()))?;
        }

        let call = Call::new(caller.clone(), now).with_payment(payment);
        let ServiceState {
            engine,
            guard,
            ledger,
        } = self;
        let mut fx = Effects::new(ledger);

        let outcome = match *op {
            Operation::Reserve { minutes, .. } => {
                Outcome::Reserved(engine.reservation_mut()?.reserve(guard, &call, minutes, &mut fx)?)
            }
            Operation::StartCharging { charger } => {
                let charger = match engine {
                    ChargeEngine::Reservation(lc) => {
                        let charger = charger.ok_or(ChargeError::ChargerRequired)?;
                        lc.start_charging(guard, &call, charger, &mut fx)?;
                        charger
                    }
                    ChargeEngine::Metered(lc) => lc.start_charging(guard, &call, &mut fx)?,
                };
                Outcome::ChargingStarted { charger }
            }
            Operation::StopCharging { charger, .. } => match engine {
                ChargeEngine::Reservation(lc) => {
                    lc.stop_charging(guard, &call, charger, &mut fx)?;
                    Outcome::ChargingStopped {
                        charger,
                        cost: 0,
                        refund: 0,
                    }
                }
                ChargeEngine::Metered(lc) => {
                    let settled = lc.stop_charging(guard, &call, charger, &mut fx)?;
                    Outcome::ChargingStopped {
                        charger,
                        cost: settled.cost,
                        refund: settled.refund,
                    }
                }
            },
            Operation::ReleaseExpired { charger } => {
                let available = engine
                    .reservation_mut()?
                    .check_and_release_expired(guard, now, charger, &mut fx)?;
                Outcome::Released { available }
            }
            Operation::FindAvailable => {
                let charger = engine
                    .reservation_mut()?
                    .find_available_charger(guard, now, &mut fx)?;
                Outcome::Found { charger }
            }
            Operation::Pause => {
                guard.pause(caller, &mut fx)?;
                Outcome::Paused
            }
            Operation::Unpause => {
                guard.unpause(caller, &mut fx)?;
                Outcome::Unpaused
            }
            Operation::Withdraw => Outcome::Withdrawn {
                amount: guard.withdraw(caller, &mut fx)?,
            },
        };

        Ok(Receipt {
            outcome,
            events: fx.into_events(),
        })
    }
}

/// Executes operations one at a time against the live service state
pub struct Runtime<C: Clock> {
    state: ServiceState,
    clock: C,
}

impl<C: Clock> Runtime<C> {
    pub fn new(engine: ChargeEngine, admin: AccountId, ledger: Ledger, clock: C) -> Self {
        info!(
            model = %engine.model(),
            chargers = engine.charger_count(),
            admin = %admin,
            "Runtime initialized"
        );
        Self {
            state: ServiceState::new(engine, AccessGuard::new(admin), ledger),
            clock,
        }
    }

    /// Build the engine, guard and ledger described by `config`
    pub fn from_config(config: &PoolConfig, clock: C) -> ChargeResult<Self> {
        let engine = ChargeEngine::from_settings(&config.pool)?;
        let ledger = Ledger::with_balances(
            config
                .accounts
                .iter()
                .map(|o| (o.account.clone(), o.balance)),
        )
        .map_err(|_| ChargeError::ArithmeticOverflow)?;
        Ok(Self::new(engine, config.pool.admin.clone(), ledger, clock))
    }

    /// Run `op` on behalf of `caller`. Either the whole operation commits
    /// and its events are returned, or nothing changes.
    pub fn execute(&mut self, caller: &AccountId, op: Operation) -> ChargeResult<Receipt> {
        let now = self.clock.now();
        let mut draft = self.state.clone();

        match draft.apply(caller, now, &op) {
            Ok(receipt) => {
                self.state = draft;
                info!(
                    caller = %caller,
                    operation = op.name(),
                    events = receipt.events.len(),
                    "Operation committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(
                    caller = %caller,
                    operation = op.name(),
                    error = %e,
                    "Operation rejected"
                );
                Err(e)
            }
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    /// Direct ledger access for the environment (deposits, frozen accounts).
    /// Not an operation: bypasses the guard and emits nothing.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        debug!("Ledger accessed outside an operation");
        &mut self.state.ledger
    }

    // Read-only queries. None of these reclaim expired reservations.

    pub fn is_available(&self, charger: ChargerIndex) -> ChargeResult<bool> {
        self.state.engine.is_available(charger, self.now())
    }

    pub fn time_remaining(&self, charger: ChargerIndex) -> ChargeResult<u64> {
        self.state
            .engine
            .reservation()?
            .time_remaining(charger, self.now())
    }

    pub fn current_cost(&self, charger: ChargerIndex) -> ChargeResult<Amount> {
        self.state.engine.metered()?.current_cost(charger, self.now())
    }

    pub fn slots(&self) -> Vec<SlotView> {
        self.state.engine.slot_views(self.now())
    }

    pub fn cost_per_unit(&self) -> Amount {
        self.state.engine.billing().cost_per_unit()
    }

    pub fn is_paused(&self) -> bool {
        self.state.guard.is_paused()
    }

    pub fn admin(&self) -> &AccountId {
        self.state.guard.admin()
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.state.ledger.balance_of(account)
    }

    pub fn service_balance(&self) -> Amount {
        self.state.ledger.service_balance()
    }

    pub fn snapshot(&self) -> PoolStateSnapshot {
        let now = self.now();
        PoolStateSnapshot {
            api_version: API_VERSION,
            model: self.state.engine.model(),
            cost_per_unit: self.cost_per_unit(),
            admin: self.admin().clone(),
            paused: self.is_paused(),
            now,
            service_balance: self.service_balance(),
            slots: self.state.engine.slot_views(now),
        }
    }
}
