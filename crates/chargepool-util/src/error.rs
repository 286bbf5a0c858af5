//! Error taxonomy for chargepool operations
//!
//! Every variant is terminal for the operation that produced it: nothing
//! inside the core retries, and the execution environment discards any
//! partial mutation before the error reaches the caller.

use thiserror::Error;

use crate::{AccountId, Amount, ChargerIndex};

/// Failure of an allocation or billing operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChargeError {
    #[error("Charger index {index} out of range (pool has {count})")]
    InvalidIndex { index: ChargerIndex, count: usize },

    #[error("Invalid charger count {0}")]
    InvalidResourceCount(usize),

    #[error("Cost per billing unit must be positive")]
    InvalidPrice,

    #[error("Caller {0} is not the admin")]
    Unauthorized(AccountId),

    #[error("Service is paused")]
    ServiceHalted,

    #[error("Duration {minutes} min outside {min}..={max} min")]
    DurationOutOfRange { minutes: u32, min: u32, max: u32 },

    #[error("No charger available")]
    NoResourceAvailable,

    #[error("No chargers configured")]
    NoResourceConfigured,

    #[error("Insufficient payment: required {required}, got {provided}")]
    InsufficientPayment { required: Amount, provided: Amount },

    #[error("Charger {0} is not reserved by the caller")]
    NotYourReservation(ChargerIndex),

    #[error("Charger {0} is not in a session held by the caller")]
    NotYourSession(ChargerIndex),

    #[error("Reservation on charger {0} has expired")]
    ReservationExpired(ChargerIndex),

    #[error("Charger {0} is already charging")]
    AlreadyCharging(ChargerIndex),

    #[error("Charger {0} is not charging")]
    NotCharging(ChargerIndex),

    #[error("Charger {0} is not in use")]
    NotInUse(ChargerIndex),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Refund failed: {0}")]
    RefundFailed(String),

    #[error("The reservation model needs an explicit charger index")]
    ChargerRequired,

    #[error("Arithmetic overflow computing cost")]
    ArithmeticOverflow,

    #[error("Operation not supported by the {0} model")]
    UnsupportedOperation(&'static str),
}

impl ChargeError {
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }

    pub fn refund(msg: impl Into<String>) -> Self {
        Self::RefundFailed(msg.into())
    }

    /// Stable snake_case name, used for audit rows and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIndex { .. } => "invalid_index",
            Self::InvalidResourceCount(_) => "invalid_resource_count",
            Self::InvalidPrice => "invalid_price",
            Self::Unauthorized(_) => "unauthorized",
            Self::ServiceHalted => "service_halted",
            Self::DurationOutOfRange { .. } => "duration_out_of_range",
            Self::NoResourceAvailable => "no_resource_available",
            Self::NoResourceConfigured => "no_resource_configured",
            Self::InsufficientPayment { .. } => "insufficient_payment",
            Self::NotYourReservation(_) => "not_your_reservation",
            Self::NotYourSession(_) => "not_your_session",
            Self::ReservationExpired(_) => "reservation_expired",
            Self::AlreadyCharging(_) => "already_charging",
            Self::NotCharging(_) => "not_charging",
            Self::NotInUse(_) => "not_in_use",
            Self::TransferFailed(_) => "transfer_failed",
            Self::RefundFailed(_) => "refund_failed",
            Self::ChargerRequired => "charger_required",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::UnsupportedOperation(_) => "unsupported_operation",
        }
    }
}

pub type ChargeResult<T> = std::result::Result<T, ChargeError>;
