//! Mapping of protocol commands onto the runtime

use chargepool_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, Event, EventPayload, Response, ResponsePayload,
};
use chargepool_core::{Operation, Outcome, Runtime};
use chargepool_store::{AuditEvent, AuditEventType, Store, StoreError};
use chargepool_util::{AccountId, ChargeError, Clock};
use tracing::{debug, warn};

/// What handling one request produced
#[derive(Debug)]
pub struct Dispatch {
    pub response: Response,
    /// Events of a committed operation, in emission order. Empty for
    /// queries and rejected operations.
    pub events: Vec<Event>,
}

impl Dispatch {
    fn reply(response: Response) -> Self {
        Self {
            response,
            events: Vec::new(),
        }
    }
}

/// Handle one command from `client`.
///
/// Mutating commands run through [`Runtime::execute`]. Their events and
/// rejections are written to the audit log; audit failures are logged and
/// never change the reply.
pub fn handle_command<C: Clock>(
    runtime: &mut Runtime<C>,
    store: &dyn Store,
    client: &ClientInfo,
    request_id: u64,
    command: Command,
) -> Dispatch {
    let caller = client.account();
    debug!(caller = %caller, request_id, command = ?command, "Handling command");

    if let Some(op) = operation_for(&command) {
        return execute(runtime, store, client, &caller, request_id, op);
    }

    let result = match command {
        Command::GetState => Ok(ResponsePayload::State(runtime.snapshot())),

        Command::TimeRemaining { charger } => runtime
            .time_remaining(charger)
            .map(|seconds| ResponsePayload::TimeRemaining { seconds }),

        Command::IsAvailable { charger } => runtime
            .is_available(charger)
            .map(|available| ResponsePayload::Available { available }),

        Command::CurrentCost { charger } => runtime
            .current_cost(charger)
            .map(|cost| ResponsePayload::Cost { cost }),

        Command::Balance { account } => {
            let account = account.unwrap_or_else(|| caller.clone());
            let balance = runtime.balance_of(&account);
            Ok(ResponsePayload::Balance { account, balance })
        }

        Command::SubscribeEvents => Ok(ResponsePayload::Subscribed {
            client_id: client.client_id.clone(),
        }),

        Command::UnsubscribeEvents => Ok(ResponsePayload::Unsubscribed),

        Command::RecentAudit { limit } => {
            if runtime.admin() == &caller {
                return Dispatch::reply(recent_audit(store, request_id, limit));
            }
            Err(ChargeError::Unauthorized(caller.clone()))
        }

        Command::Ping => Ok(ResponsePayload::Pong),

        // Mutating commands were handled above
        Command::Reserve { .. }
        | Command::StartCharging { .. }
        | Command::StopCharging { .. }
        | Command::ReleaseExpired { .. }
        | Command::FindAvailable
        | Command::Pause
        | Command::Unpause
        | Command::Withdraw => Err(ChargeError::UnsupportedOperation("query")),
    };

    Dispatch::reply(match result {
        Ok(payload) => Response::success(request_id, payload),
        Err(e) => Response::error(request_id, ErrorInfo::from(&e)),
    })
}

/// The runtime operation behind a mutating command
pub fn operation_for(command: &Command) -> Option<Operation> {
    Some(match *command {
        Command::Reserve { minutes, payment } => Operation::Reserve { minutes, payment },
        Command::StartCharging { charger } => Operation::StartCharging { charger },
        Command::StopCharging { charger, payment } => Operation::StopCharging { charger, payment },
        Command::ReleaseExpired { charger } => Operation::ReleaseExpired { charger },
        Command::FindAvailable => Operation::FindAvailable,
        Command::Pause => Operation::Pause,
        Command::Unpause => Operation::Unpause,
        Command::Withdraw => Operation::Withdraw,
        _ => return None,
    })
}

fn execute<C: Clock>(
    runtime: &mut Runtime<C>,
    store: &dyn Store,
    client: &ClientInfo,
    caller: &AccountId,
    request_id: u64,
    op: Operation,
) -> Dispatch {
    let operation = op.name();

    // Connections without peer credentials can only read
    let result = if client.uid.is_none() {
        Err(ChargeError::Unauthorized(caller.clone()))
    } else {
        runtime.execute(caller, op)
    };

    match result {
        Ok(receipt) => {
            let events = receipt
                .events
                .into_iter()
                .map(|event| {
                    let payload = EventPayload::from(event);
                    audit(
                        store,
                        AuditEventType::Pool {
                            event: payload.clone(),
                        },
                    );
                    Event::new(payload)
                })
                .collect();

            Dispatch {
                response: Response::success(request_id, outcome_payload(receipt.outcome)),
                events,
            }
        }
        Err(e) => {
            audit(
                store,
                AuditEventType::OperationRejected {
                    caller: caller.clone(),
                    operation: operation.to_string(),
                    code: ErrorCode::from(&e),
                    message: e.to_string(),
                },
            );
            Dispatch::reply(Response::error(request_id, ErrorInfo::from(&e)))
        }
    }
}

fn outcome_payload(outcome: Outcome) -> ResponsePayload {
    match outcome {
        Outcome::Reserved(r) => ResponsePayload::Reserved {
            charger: r.charger,
            start_time: r.start_time,
            end_time: r.end_time,
            cost: r.cost,
            refund: r.refund,
        },
        Outcome::ChargingStarted { charger } => ResponsePayload::ChargingStarted { charger },
        Outcome::ChargingStopped {
            charger,
            cost,
            refund,
        } => ResponsePayload::ChargingStopped {
            charger,
            cost,
            refund,
        },
        Outcome::Released { available } => ResponsePayload::Released { available },
        Outcome::Found { charger } => ResponsePayload::Found { charger },
        Outcome::Paused => ResponsePayload::Paused,
        Outcome::Unpaused => ResponsePayload::Unpaused,
        Outcome::Withdrawn { amount } => ResponsePayload::Withdrawn { amount },
    }
}

fn recent_audit(store: &dyn Store, request_id: u64, limit: usize) -> Response {
    let entries = store.get_recent_audits(limit).and_then(|rows| {
        rows.iter()
            .map(|row| serde_json::to_value(row).map_err(StoreError::from))
            .collect::<Result<Vec<_>, _>>()
    });

    match entries {
        Ok(entries) => Response::success(request_id, ResponsePayload::Audit { entries }),
        Err(e) => Response::error(
            request_id,
            ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
        ),
    }
}

/// Append to the audit log, logging instead of failing
pub fn audit(store: &dyn Store, event: AuditEventType) {
    if let Err(e) = store.append_audit(AuditEvent::new(event)) {
        warn!(error = %e, "Failed to append audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargepool_api::ResponseResult;
    use chargepool_core::{ChargeEngine, Ledger, ReservationLifecycle};
    use chargepool_config::ReservationWindow;
    use chargepool_store::SqliteStore;
    use chargepool_util::{ManualClock, Timestamp};

    fn runtime() -> Runtime<ManualClock> {
        let engine = ChargeEngine::Reservation(
            ReservationLifecycle::new(2, 1000, ReservationWindow::default()).unwrap(),
        );
        let ledger = Ledger::with_balances([(AccountId::from_uid(1000), 50_000)]).unwrap();
        Runtime::new(
            engine,
            AccountId::from_uid(0),
            ledger,
            ManualClock::new(Timestamp::from_secs(1_000)),
        )
    }

    #[test]
    fn anonymous_clients_cannot_mutate() {
        let mut rt = runtime();
        let store = SqliteStore::in_memory().unwrap();
        let anon = ClientInfo::new();

        let dispatch = handle_command(&mut rt, &store, &anon, 1, Command::FindAvailable);
        match dispatch.response.result {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::Unauthorized),
            other => panic!("unexpected {:?}", other),
        }
        assert!(dispatch.events.is_empty());

        let rows = store.get_recent_audits(10).unwrap();
        assert!(matches!(
            &rows[0].event,
            AuditEventType::OperationRejected { operation, code: ErrorCode::Unauthorized, .. }
                if operation == "find_available"
        ));

        // Reads still work
        let dispatch = handle_command(&mut rt, &store, &anon, 2, Command::IsAvailable { charger: 0 });
        assert!(matches!(
            dispatch.response.result,
            ResponseResult::Ok(ResponsePayload::Available { available: true })
        ));
    }

    #[test]
    fn balance_defaults_to_caller() {
        let mut rt = runtime();
        let store = SqliteStore::in_memory().unwrap();
        let client = ClientInfo::new().with_uid(1000);

        let dispatch = handle_command(&mut rt, &store, &client, 1, Command::Balance { account: None });
        match dispatch.response.result {
            ResponseResult::Ok(ResponsePayload::Balance { account, balance }) => {
                assert_eq!(account, AccountId::from_uid(1000));
                assert_eq!(balance, 50_000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn audit_is_admin_only() {
        let mut rt = runtime();
        let store = SqliteStore::in_memory().unwrap();
        audit(&store, AuditEventType::ServiceStarted);

        let user = ClientInfo::new().with_uid(1000);
        let dispatch = handle_command(&mut rt, &store, &user, 1, Command::RecentAudit { limit: 5 });
        assert!(matches!(dispatch.response.result, ResponseResult::Err(_)));

        let admin = ClientInfo::new().with_uid(0);
        let dispatch = handle_command(&mut rt, &store, &admin, 2, Command::RecentAudit { limit: 5 });
        match dispatch.response.result {
            ResponseResult::Ok(ResponsePayload::Audit { entries }) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0]["event"]["type"], "service_started");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
