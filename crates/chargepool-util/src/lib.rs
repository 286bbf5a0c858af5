//! Shared utilities for chargepool
//!
//! This crate provides:
//! - Identity types (AccountId, ClientId) and the money/time scalars
//! - Clock abstraction (system clock and a manual clock for tests)
//! - The operation error taxonomy and pool limits
//! - Default paths for socket, data, and config

mod error;
mod ids;
mod limits;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use limits::*;
pub use paths::*;
pub use time::*;

/// Smallest indivisible currency unit
pub type Amount = u64;

/// Position of a charger in the pool
pub type ChargerIndex = usize;
