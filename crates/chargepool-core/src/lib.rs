//! Allocation and billing engine for chargepool
//!
//! This crate is the heart of chargepool, containing:
//! - The fixed charger pool and its slot state
//! - Access control (admin gate and pause switch)
//! - Billing arithmetic and refunds
//! - Reservation lifecycle (Empty -> Reserved -> Charging -> Empty, lazy expiry)
//! - Metered session lifecycle (Empty -> Occupied -> Empty, pay at stop)
//! - An all-or-nothing runtime that serializes operations

mod billing;
mod context;
mod engine;
mod events;
mod guard;
mod ledger;
mod pool;
mod reservation;
mod runtime;
mod session;

pub use billing::*;
pub use context::*;
pub use engine::*;
pub use events::*;
pub use guard::*;
pub use ledger::*;
pub use pool::*;
pub use reservation::*;
pub use runtime::*;
pub use session::*;
