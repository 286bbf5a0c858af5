//! Per-operation context: who is calling, when, and with what money

use chargepool_util::{AccountId, Amount, ChargeError, ChargeResult, Timestamp};

use crate::{CoreEvent, Payments};

/// Facts about the current call, supplied by the execution environment
#[derive(Debug, Clone)]
pub struct Call {
    pub caller: AccountId,
    pub now: Timestamp,
    /// Amount attached to the call, already collected into the service account
    pub payment: Amount,
}

impl Call {
    pub fn new(caller: AccountId, now: Timestamp) -> Self {
        Self {
            caller,
            now,
            payment: 0,
        }
    }

    pub fn with_payment(mut self, payment: Amount) -> Self {
        self.payment = payment;
        self
    }
}

/// Side effects of one operation: outgoing transfers and emitted events.
///
/// Nothing here is final. The runtime discards the whole operation,
/// transfers and events included, if any step fails.
pub struct Effects<'a> {
    payments: &'a mut dyn Payments,
    events: Vec<CoreEvent>,
}

impl<'a> Effects<'a> {
    pub fn new(payments: &'a mut dyn Payments) -> Self {
        Self {
            payments,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    /// Return overpayment to the caller. A zero refund is a no-op.
    pub fn refund(&mut self, to: &AccountId, amount: Amount) -> ChargeResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.payments
            .transfer(to, amount)
            .map_err(|e| ChargeError::refund(e.to_string()))
    }

    /// Pay out of the service account
    pub fn payout(&mut self, to: &AccountId, amount: Amount) -> ChargeResult<()> {
        self.payments
            .transfer(to, amount)
            .map_err(|e| ChargeError::transfer(e.to_string()))
    }

    pub fn service_balance(&self) -> Amount {
        self.payments.service_balance()
    }

    pub fn events(&self) -> &[CoreEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<CoreEvent> {
        self.events
    }
}
