//! Client side of the socket, used by chargectl

use chargepool_api::{Command, Event, Request, Response, ResponseResult};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::framing::{read_frame, write_frame};
use crate::{IpcError, IpcResult};

pub struct IpcClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    last_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let (read_half, writer) = UnixStream::connect(socket_path).await?.into_split();
        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
            last_request_id: 0,
        })
    }

    /// Send one command and wait for the matching reply
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        self.last_request_id += 1;
        let expected = self.last_request_id;

        write_frame(&mut self.writer, &Request::new(expected, command)).await?;
        let response: Response = read_frame(&mut self.lines).await?;

        if response.request_id != expected {
            return Err(IpcError::OutOfOrder {
                expected,
                got: response.request_id,
            });
        }
        Ok(response)
    }

    /// Turn this connection into an event feed
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        match self.send(Command::SubscribeEvents).await?.result {
            ResponseResult::Ok(_) => Ok(EventStream { client: self }),
            ResponseResult::Err(e) => Err(IpcError::Refused(e.message)),
        }
    }
}

/// Events pushed by the service after a successful subscribe
pub struct EventStream {
    client: IpcClient,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        read_frame(&mut self.client.lines).await
    }
}
