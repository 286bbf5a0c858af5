//! Unix socket transport between chargepoold and its clients
//!
//! One JSON document per line in both directions. Every connection is tied
//! to the account of the process on the other end, read from the socket's
//! peer credentials, so the service never trusts an identity a client
//! claims for itself.

mod client;
mod connection;
mod framing;
mod peer;
mod server;

pub use client::{EventStream, IpcClient};
pub use peer::Peer;
pub use server::{EventPublisher, Incoming, IpcServer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Reply to request {got} while waiting for {expected}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("Service refused: {0}")]
    Refused(String),
}

pub type IpcResult<T> = Result<T, IpcError>;
