//! Command types for the chargepool protocol

use chargepool_util::{AccountId, Amount, ChargeError, ChargerIndex, ClientId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{PoolStateSnapshot, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&ChargeError> for ErrorInfo {
    fn from(err: &ChargeError) -> Self {
        Self::new(ErrorCode::from(err), err.to_string())
    }
}

/// Error codes for the protocol. Operation failures map 1:1 onto
/// [`ChargeError`] so clients can branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidIndex,
    InvalidResourceCount,
    InvalidPrice,
    Unauthorized,
    ServiceHalted,
    DurationOutOfRange,
    NoResourceAvailable,
    NoResourceConfigured,
    InsufficientPayment,
    NotYourReservation,
    NotYourSession,
    ReservationExpired,
    AlreadyCharging,
    NotCharging,
    NotInUse,
    TransferFailed,
    RefundFailed,
    ChargerRequired,
    ArithmeticOverflow,
    UnsupportedOperation,
    StoreError,
    InternalError,
}

impl From<&ChargeError> for ErrorCode {
    fn from(err: &ChargeError) -> Self {
        match err {
            ChargeError::InvalidIndex { .. } => ErrorCode::InvalidIndex,
            ChargeError::InvalidResourceCount(_) => ErrorCode::InvalidResourceCount,
            ChargeError::InvalidPrice => ErrorCode::InvalidPrice,
            ChargeError::Unauthorized(_) => ErrorCode::Unauthorized,
            ChargeError::ServiceHalted => ErrorCode::ServiceHalted,
            ChargeError::DurationOutOfRange { .. } => ErrorCode::DurationOutOfRange,
            ChargeError::NoResourceAvailable => ErrorCode::NoResourceAvailable,
            ChargeError::NoResourceConfigured => ErrorCode::NoResourceConfigured,
            ChargeError::InsufficientPayment { .. } => ErrorCode::InsufficientPayment,
            ChargeError::NotYourReservation(_) => ErrorCode::NotYourReservation,
            ChargeError::NotYourSession(_) => ErrorCode::NotYourSession,
            ChargeError::ReservationExpired(_) => ErrorCode::ReservationExpired,
            ChargeError::AlreadyCharging(_) => ErrorCode::AlreadyCharging,
            ChargeError::NotCharging(_) => ErrorCode::NotCharging,
            ChargeError::NotInUse(_) => ErrorCode::NotInUse,
            ChargeError::TransferFailed(_) => ErrorCode::TransferFailed,
            ChargeError::RefundFailed(_) => ErrorCode::RefundFailed,
            ChargeError::ChargerRequired => ErrorCode::ChargerRequired,
            ChargeError::ArithmeticOverflow => ErrorCode::ArithmeticOverflow,
            ChargeError::UnsupportedOperation(_) => ErrorCode::UnsupportedOperation,
        }
    }
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get current pool state
    GetState,

    /// Reserve the lowest free charger for `minutes`, paying `payment`
    Reserve { minutes: u32, payment: Amount },

    /// Start charging. Reservation pools need the reserved charger;
    /// metered pools pick the lowest free one and ignore it.
    StartCharging { charger: Option<ChargerIndex> },

    /// Stop charging. Metered pools settle with `payment`.
    StopCharging {
        charger: ChargerIndex,
        #[serde(default)]
        payment: Amount,
    },

    /// Reclaim a charger whose reservation window has elapsed
    ReleaseExpired { charger: ChargerIndex },

    /// Find (and reclaim, if expired) the lowest available charger
    FindAvailable,

    /// Seconds left on a reservation
    TimeRemaining { charger: ChargerIndex },

    /// Whether a charger can be claimed right now
    IsAvailable { charger: ChargerIndex },

    /// Estimated settlement cost of a running metered session
    CurrentCost { charger: ChargerIndex },

    /// Ledger balance of an account (defaults to the caller)
    Balance { account: Option<AccountId> },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    // Admin commands

    /// Halt all mutating operations (admin only)
    Pause,

    /// Resume mutating operations (admin only)
    Unpause,

    /// Pay the accumulated balance out to the admin (admin only)
    Withdraw,

    /// Recent audit log rows (admin only)
    RecentAudit { limit: usize },

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(PoolStateSnapshot),
    Reserved {
        charger: ChargerIndex,
        start_time: Timestamp,
        end_time: Timestamp,
        cost: Amount,
        refund: Amount,
    },
    ChargingStarted {
        charger: ChargerIndex,
    },
    ChargingStopped {
        charger: ChargerIndex,
        cost: Amount,
        refund: Amount,
    },
    Released {
        available: bool,
    },
    Found {
        charger: ChargerIndex,
    },
    TimeRemaining {
        seconds: u64,
    },
    Available {
        available: bool,
    },
    Cost {
        cost: Amount,
    },
    Balance {
        account: AccountId,
        balance: Amount,
    },
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Paused,
    Unpaused,
    Withdrawn {
        amount: Amount,
    },
    Audit {
        entries: Vec<serde_json::Value>,
    },
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new() -> Self {
        Self {
            client_id: ClientId::new(),
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Caller identity for this connection. Connections without peer
    /// credentials are anonymous and can only read.
    pub fn account(&self) -> AccountId {
        match self.uid {
            Some(uid) => AccountId::from_uid(uid),
            None => AccountId::new(format!("anon:{}", self.client_id)),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new()
    }
}
