//! Protocol types for chargepool IPC
//!
//! This crate defines the stable API between chargepoold and clients:
//! - Commands (requests from clients)
//! - Responses and structured error codes
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
