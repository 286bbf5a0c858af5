//! Cost computation and payment checks

use chargepool_util::{billing_units_ceil, Amount, ChargeError, ChargeResult};

/// Pricing for one pool. The unit price is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingEngine {
    cost_per_unit: Amount,
}

impl BillingEngine {
    pub fn new(cost_per_unit: Amount) -> ChargeResult<Self> {
        if cost_per_unit == 0 {
            return Err(ChargeError::InvalidPrice);
        }
        Ok(Self { cost_per_unit })
    }

    pub fn cost_per_unit(&self) -> Amount {
        self.cost_per_unit
    }

    /// Up-front price of a reservation
    pub fn reservation_cost(&self, minutes: u32) -> ChargeResult<Amount> {
        self.cost_per_unit
            .checked_mul(Amount::from(minutes))
            .ok_or(ChargeError::ArithmeticOverflow)
    }

    /// Billed units for a metered session: rounded up, never fewer than one
    pub fn session_units(&self, elapsed_secs: u64) -> u64 {
        billing_units_ceil(elapsed_secs).max(1)
    }

    pub fn session_cost(&self, elapsed_secs: u64) -> ChargeResult<Amount> {
        self.cost_per_unit
            .checked_mul(self.session_units(elapsed_secs))
            .ok_or(ChargeError::ArithmeticOverflow)
    }

    /// Check `payment` covers `cost` and return the excess to refund
    pub fn require_payment(&self, cost: Amount, payment: Amount) -> ChargeResult<Amount> {
        if payment < cost {
            return Err(ChargeError::InsufficientPayment {
                required: cost,
                provided: payment,
            });
        }
        Ok(payment - cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_price_rejected() {
        assert_eq!(BillingEngine::new(0).unwrap_err(), ChargeError::InvalidPrice);
    }

    #[test]
    fn reservation_cost_is_linear() {
        let billing = BillingEngine::new(1000).unwrap();
        assert_eq!(billing.reservation_cost(15).unwrap(), 15_000);
    }

    #[test]
    fn session_minimum_is_one_unit() {
        let billing = BillingEngine::new(1000).unwrap();
        assert_eq!(billing.session_units(0), 1);
        assert_eq!(billing.session_cost(0).unwrap(), 1000);
        assert_eq!(billing.session_cost(60).unwrap(), 1000);
        assert_eq!(billing.session_cost(61).unwrap(), 2000);
    }

    #[test]
    fn overflow_is_an_error() {
        let billing = BillingEngine::new(Amount::MAX).unwrap();
        assert_eq!(
            billing.reservation_cost(2).unwrap_err(),
            ChargeError::ArithmeticOverflow
        );
        assert_eq!(
            billing.session_cost(121).unwrap_err(),
            ChargeError::ArithmeticOverflow
        );
    }

    #[test]
    fn payment_check_returns_excess() {
        let billing = BillingEngine::new(1).unwrap();
        assert_eq!(billing.require_payment(100, 150).unwrap(), 50);
        assert_eq!(billing.require_payment(100, 100).unwrap(), 0);
        assert_eq!(
            billing.require_payment(100, 99).unwrap_err(),
            ChargeError::InsufficientPayment {
                required: 100,
                provided: 99
            }
        );
    }
}
