//! Listening socket and event fan-out

use chargepool_api::{Event, Request, Response};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{error, info};

use crate::connection::drive;
use crate::{IpcResult, Peer};

const EVENT_BACKLOG: usize = 256;

/// What connections deliver to the service
#[derive(Debug)]
pub enum Incoming {
    Connected {
        peer: Peer,
    },
    /// The connection waits on `reply` before reading its next request
    Request {
        peer: Peer,
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Disconnected {
        peer: Peer,
    },
}

/// Cloneable handle for pushing events to subscribed clients
#[derive(Debug, Clone)]
pub struct EventPublisher(broadcast::Sender<Event>);

impl EventPublisher {
    /// No-op while nobody is connected
    pub fn publish(&self, event: Event) {
        let _ = self.0.send(event);
    }
}

/// A bound socket. Dropping it removes the socket file.
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
    events: broadcast::Sender<Event>,
}

impl IpcServer {
    /// Bind `socket_path`, replacing a stale socket from an earlier run.
    /// Must be called inside a tokio runtime.
    pub fn bind(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();
        if let Some(dir) = socket_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        match std::fs::remove_file(&socket_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let listener = UnixListener::bind(&socket_path)?;
        // Open to every local user: the account comes from peer credentials
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o666))?;
        info!(path = %socket_path.display(), "Listening");

        let (events, _) = broadcast::channel(EVENT_BACKLOG);
        Ok(Self {
            socket_path,
            listener,
            events,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher(self.events.clone())
    }

    /// Accept connections until the receiving end of `inbound` is dropped
    pub async fn serve(self, inbound: mpsc::UnboundedSender<Incoming>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let peer = Peer::identify(&stream);
                        tokio::spawn(drive(stream, peer, inbound.clone(), self.events.subscribe()));
                    }
                    Err(e) => error!(error = %e, "Accept failed"),
                },
                _ = inbound.closed() => break,
            }
        }
        info!(path = %self.socket_path.display(), "Stopped accepting");
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
