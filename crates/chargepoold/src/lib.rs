//! Request handling for chargepoold
//!
//! The binary owns the socket and the signal loop; this library maps
//! protocol commands onto the runtime so the same path can be driven
//! without a socket.

mod dispatch;

pub use dispatch::*;
