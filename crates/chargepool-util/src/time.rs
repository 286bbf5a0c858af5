//! Time utilities for chargepool
//!
//! All enforcement uses whole seconds since the Unix epoch. The clock is an
//! injected collaborator: the service runs on [`SystemClock`] while tests and
//! simulations drive a [`ManualClock`] forward explicitly.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Seconds per billing unit (one minute)
pub const BILLING_UNIT_SECS: u64 = 60;

/// A point in time, in whole seconds since the Unix epoch.
///
/// Zero is reserved as the "unset" marker in slot state. Anything that
/// records a start time from a clock reading the epoch itself moves it to
/// one second so occupied slots never carry the marker.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Seconds elapsed since `earlier`, or zero if `earlier` is in the future
    pub fn seconds_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Seconds until `self` measured from `from`, or zero if already past
    pub fn saturating_seconds_until(&self, from: Timestamp) -> u64 {
        self.0.saturating_sub(from.0)
    }

    pub fn checked_add_secs(&self, secs: u64) -> Option<Timestamp> {
        self.0.checked_add(secs).map(Timestamp)
    }

    /// Wall-clock rendering for logs and events
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.0 as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current time.
///
/// Implementations are expected not to go backwards, but nothing enforces
/// it. [`SystemClock`] follows the wall clock, so an NTP step or a manual
/// clock change can move it back. Enforcement tolerates that: elapsed time
/// saturates at zero (a session stopped "before" it started bills the
/// one-unit minimum) and a reservation window stretches by the size of the
/// jump. Seconds since the epoch are kept anyway because reservation end
/// times are reported to clients as absolute instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system wall clock. Not monotonic, see [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)] // The single place that reads the real clock
    fn now(&self) -> Timestamp {
        Timestamp(Utc::now().timestamp().max(0) as u64)
    }
}

/// Manually advanced clock. Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(Arc::new(AtomicU64::new(start.0)))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    pub fn set(&self, to: Timestamp) {
        self.0.store(to.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.0.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Number of billing units covering `elapsed_secs`, rounded up
pub fn billing_units_ceil(elapsed_secs: u64) -> u64 {
    elapsed_secs.div_ceil(BILLING_UNIT_SECS)
}
