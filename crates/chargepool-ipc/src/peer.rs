//! Who is on the other end of a connection

use chargepool_api::ClientInfo;
use chargepool_util::{AccountId, ClientId};
use nix::sys::socket::{getsockopt, sockopt::PeerCredentials};
use tokio::net::UnixStream;
use tracing::debug;

/// A connected client and the account it acts as
#[derive(Debug, Clone)]
pub struct Peer {
    info: ClientInfo,
    account: AccountId,
}

impl Peer {
    pub fn new(info: ClientInfo) -> Self {
        let account = info.account();
        Self { info, account }
    }

    /// Read the kernel-reported UID of the connecting process. A socket
    /// without credentials yields an anonymous, read-only peer.
    pub(crate) fn identify(stream: &UnixStream) -> Self {
        let info = match getsockopt(stream, PeerCredentials) {
            Ok(cred) => ClientInfo::new().with_uid(cred.uid()),
            Err(errno) => {
                debug!(error = %errno, "No peer credentials");
                ClientInfo::new()
            }
        };
        Self::new(info)
    }

    pub fn client_id(&self) -> &ClientId {
        &self.info.client_id
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }
}
