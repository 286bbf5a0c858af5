//! One task per accepted socket

use chargepool_api::{Command, ErrorCode, ErrorInfo, Event, Request, Response, ResponseResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::framing::write_frame;
use crate::{Incoming, Peer};

/// Serve `peer` until it hangs up or the service stops listening.
///
/// Requests are answered strictly in order. Events reach the peer only
/// between replies and only while it is subscribed.
pub(crate) async fn drive(
    stream: UnixStream,
    peer: Peer,
    inbound: mpsc::UnboundedSender<Incoming>,
    mut events: broadcast::Receiver<Event>,
) {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut subscribed = false;

    info!(client_id = %peer.client_id(), account = %peer.account(), "Client connected");
    if inbound
        .send(Incoming::Connected { peer: peer.clone() })
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        debug!(account = %peer.account(), error = %e, "Read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => {
                        let toggle = subscription_toggle(&request.command);
                        let Some(response) = forward(&inbound, &peer, request).await else {
                            break;
                        };
                        if let (Some(on), ResponseResult::Ok(_)) = (toggle, &response.result) {
                            if on && !subscribed {
                                // Start from now, not from whatever queued up unsubscribed
                                events = events.resubscribe();
                            }
                            subscribed = on;
                        }
                        response
                    }
                    Err(e) => {
                        warn!(account = %peer.account(), error = %e, "Unparseable request");
                        Response::error(0, ErrorInfo::new(ErrorCode::InvalidRequest, e.to_string()))
                    }
                };

                if let Err(e) = write_frame(&mut writer, &response).await {
                    debug!(account = %peer.account(), error = %e, "Reply not delivered");
                    break;
                }
            }

            event = events.recv(), if subscribed => match event {
                Ok(event) => {
                    if let Err(e) = write_frame(&mut writer, &event).await {
                        debug!(account = %peer.account(), error = %e, "Event not delivered");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(account = %peer.account(), skipped, "Subscriber fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!(client_id = %peer.client_id(), "Connection finished");
    let _ = inbound.send(Incoming::Disconnected { peer });
}

fn subscription_toggle(command: &Command) -> Option<bool> {
    match command {
        Command::SubscribeEvents => Some(true),
        Command::UnsubscribeEvents => Some(false),
        _ => None,
    }
}

/// Hand a request to the service and wait for its answer. `None` once the
/// service has stopped taking requests.
async fn forward(
    inbound: &mpsc::UnboundedSender<Incoming>,
    peer: &Peer,
    request: Request,
) -> Option<Response> {
    let request_id = request.request_id;
    let (reply, answer) = oneshot::channel();
    inbound
        .send(Incoming::Request {
            peer: peer.clone(),
            request,
            reply,
        })
        .ok()?;

    match answer.await {
        Ok(response) => Some(response),
        Err(_) => Some(Response::error(
            request_id,
            ErrorInfo::new(ErrorCode::InternalError, "request dropped by the service"),
        )),
    }
}
