//! The two allocation models behind one contract

use chargepool_api::{PricingModel, SlotView};
use chargepool_config::PoolSettings;
use chargepool_util::{ChargeError, ChargeResult, ChargerIndex, Timestamp};

use crate::{BillingEngine, ReservationLifecycle, SessionLifecycle};

/// Read-only capabilities shared by both allocation models
pub trait AllocationModel {
    fn model(&self) -> PricingModel;

    fn charger_count(&self) -> usize;

    fn billing(&self) -> &BillingEngine;

    /// Whether an allocation at `now` could claim `charger`
    fn is_available(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<bool>;

    fn slot_view(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<SlotView>;

    fn slot_views(&self, now: Timestamp) -> Vec<SlotView> {
        (0..self.charger_count())
            .filter_map(|charger| self.slot_view(charger, now).ok())
            .collect()
    }
}

/// A pool running one of the two lifecycles. The variants share no slot
/// state; operations only one model supports fail on the other with
/// [`ChargeError::UnsupportedOperation`].
#[derive(Debug, Clone)]
pub enum ChargeEngine {
    Reservation(ReservationLifecycle),
    Metered(SessionLifecycle),
}

impl ChargeEngine {
    pub fn from_settings(settings: &PoolSettings) -> ChargeResult<Self> {
        Ok(match settings.model {
            PricingModel::Reservation => ChargeEngine::Reservation(ReservationLifecycle::new(
                settings.chargers,
                settings.cost_per_unit,
                settings.window,
            )?),
            PricingModel::Metered => ChargeEngine::Metered(SessionLifecycle::new(
                settings.chargers,
                settings.cost_per_unit,
            )?),
        })
    }

    pub fn reservation(&self) -> ChargeResult<&ReservationLifecycle> {
        match self {
            ChargeEngine::Reservation(lc) => Ok(lc),
            ChargeEngine::Metered(_) => Err(self.unsupported()),
        }
    }

    pub fn reservation_mut(&mut self) -> ChargeResult<&mut ReservationLifecycle> {
        match self {
            ChargeEngine::Reservation(lc) => Ok(lc),
            ChargeEngine::Metered(_) => Err(ChargeError::UnsupportedOperation(
                PricingModel::Metered.as_str(),
            )),
        }
    }

    pub fn metered(&self) -> ChargeResult<&SessionLifecycle> {
        match self {
            ChargeEngine::Metered(lc) => Ok(lc),
            ChargeEngine::Reservation(_) => Err(self.unsupported()),
        }
    }

    pub fn metered_mut(&mut self) -> ChargeResult<&mut SessionLifecycle> {
        match self {
            ChargeEngine::Metered(lc) => Ok(lc),
            ChargeEngine::Reservation(_) => Err(ChargeError::UnsupportedOperation(
                PricingModel::Reservation.as_str(),
            )),
        }
    }

    fn unsupported(&self) -> ChargeError {
        ChargeError::UnsupportedOperation(self.model().as_str())
    }
}

impl AllocationModel for ChargeEngine {
    fn model(&self) -> PricingModel {
        match self {
            ChargeEngine::Reservation(_) => PricingModel::Reservation,
            ChargeEngine::Metered(_) => PricingModel::Metered,
        }
    }

    fn charger_count(&self) -> usize {
        match self {
            ChargeEngine::Reservation(lc) => lc.pool().len(),
            ChargeEngine::Metered(lc) => lc.pool().len(),
        }
    }

    fn billing(&self) -> &BillingEngine {
        match self {
            ChargeEngine::Reservation(lc) => lc.billing(),
            ChargeEngine::Metered(lc) => lc.billing(),
        }
    }

    fn is_available(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<bool> {
        match self {
            ChargeEngine::Reservation(lc) => lc.is_available(charger, now),
            ChargeEngine::Metered(lc) => lc.is_available(charger),
        }
    }

    fn slot_view(&self, charger: ChargerIndex, now: Timestamp) -> ChargeResult<SlotView> {
        match self {
            ChargeEngine::Reservation(lc) => lc.slot_view(charger, now),
            ChargeEngine::Metered(lc) => lc.slot_view(charger),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargepool_config::ReservationWindow;
    use chargepool_util::AccountId;

    fn settings(model: PricingModel) -> PoolSettings {
        PoolSettings {
            model,
            chargers: 4,
            cost_per_unit: 500,
            admin: AccountId::new("admin"),
            window: ReservationWindow::default(),
        }
    }

    #[test]
    fn builds_requested_variant() {
        let engine = ChargeEngine::from_settings(&settings(PricingModel::Metered)).unwrap();
        assert_eq!(engine.model(), PricingModel::Metered);
        assert_eq!(engine.charger_count(), 4);
        assert_eq!(engine.billing().cost_per_unit(), 500);
        assert_eq!(engine.slot_views(Timestamp::from_secs(1)).len(), 4);
    }

    #[test]
    fn variant_accessors_reject_the_other_model() {
        let mut engine =
            ChargeEngine::from_settings(&settings(PricingModel::Reservation)).unwrap();
        assert!(engine.reservation().is_ok());
        assert_eq!(
            engine.metered_mut().unwrap_err(),
            ChargeError::UnsupportedOperation("reservation")
        );

        let mut engine = ChargeEngine::from_settings(&settings(PricingModel::Metered)).unwrap();
        assert_eq!(
            engine.reservation_mut().unwrap_err(),
            ChargeError::UnsupportedOperation("metered")
        );
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut bad = settings(PricingModel::Reservation);
        bad.chargers = 0;
        assert!(matches!(
            ChargeEngine::from_settings(&bad),
            Err(ChargeError::InvalidResourceCount(0))
        ));
    }
}
