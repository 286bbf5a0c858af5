//! Integration tests for chargepoold
//!
//! These drive the request path end to end (config, runtime, dispatch,
//! audit store) with a manual clock instead of a socket.

use chargepool_api::{ClientInfo, Command, ErrorCode, EventPayload, ResponsePayload, ResponseResult};
use chargepool_config::parse_config;
use chargepool_core::Runtime;
use chargepool_store::{AuditEventType, SqliteStore, Store};
use chargepool_util::{AccountId, ManualClock, Timestamp};
use chargepoold::handle_command;
use std::time::Duration;

const ADMIN_UID: u32 = 0;
const DRIVER_UID: u32 = 1000;
const OTHER_UID: u32 = 1001;

fn reservation_config() -> &'static str {
    r#"
        config_version = 1

        [pool]
        model = "reservation"
        chargers = 16
        cost_per_unit = 1000
        admin = "uid:0"

        [[accounts]]
        id = "uid:1000"
        balance = 1000000

        [[accounts]]
        id = "uid:1001"
        balance = 1000000
    "#
}

fn metered_config() -> &'static str {
    r#"
        config_version = 1

        [pool]
        model = "metered"
        chargers = 2
        cost_per_unit = 1000
        admin = "uid:0"

        [[accounts]]
        id = "uid:1000"
        balance = 100000
    "#
}

struct Harness {
    runtime: Runtime<ManualClock>,
    store: SqliteStore,
    clock: ManualClock,
    next_request: u64,
}

impl Harness {
    fn new(config: &str) -> Self {
        let config = parse_config(config).unwrap();
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        Self {
            runtime: Runtime::from_config(&config, clock.clone()).unwrap(),
            store: SqliteStore::in_memory().unwrap(),
            clock,
            next_request: 1,
        }
    }

    fn send(&mut self, uid: u32, command: Command) -> (ResponseResult, Vec<EventPayload>) {
        let client = ClientInfo::new().with_uid(uid);
        let request_id = self.next_request;
        self.next_request += 1;

        let dispatch = handle_command(&mut self.runtime, &self.store, &client, request_id, command);
        assert_eq!(dispatch.response.request_id, request_id);
        let events = dispatch.events.into_iter().map(|e| e.payload).collect();
        (dispatch.response.result, events)
    }

    fn ok(&mut self, uid: u32, command: Command) -> ResponsePayload {
        match self.send(uid, command).0 {
            ResponseResult::Ok(payload) => payload,
            ResponseResult::Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    fn err(&mut self, uid: u32, command: Command) -> ErrorCode {
        match self.send(uid, command).0 {
            ResponseResult::Err(e) => e.code,
            ResponseResult::Ok(payload) => panic!("unexpected success: {:?}", payload),
        }
    }

    fn advance_minutes(&self, minutes: u64) {
        self.clock.advance(Duration::from_secs(minutes * 60));
    }

    fn balance(&self, uid: u32) -> u64 {
        self.runtime.balance_of(&AccountId::from_uid(uid))
    }
}

#[test]
fn test_reservation_lifecycle() {
    let mut h = Harness::new(reservation_config());

    let (result, events) = h.send(
        DRIVER_UID,
        Command::Reserve {
            minutes: 30,
            payment: 40_000,
        },
    );
    assert!(matches!(
        result,
        ResponseResult::Ok(ResponsePayload::Reserved {
            charger: 0,
            cost: 30_000,
            refund: 10_000,
            ..
        })
    ));
    assert!(matches!(
        events[..],
        [EventPayload::ReservationCreated { charger: 0, cost: 30_000, .. }]
    ));
    assert_eq!(h.balance(DRIVER_UID), 1_000_000 - 30_000);

    // Somebody else cannot use the reservation
    assert_eq!(
        h.err(OTHER_UID, Command::StartCharging { charger: Some(0) }),
        ErrorCode::NotYourReservation
    );

    h.advance_minutes(5);
    let (_, events) = h.send(DRIVER_UID, Command::StartCharging { charger: Some(0) });
    assert!(matches!(events[..], [EventPayload::ChargingStarted { charger: 0, .. }]));
    assert!(matches!(
        h.ok(DRIVER_UID, Command::TimeRemaining { charger: 0 }),
        ResponsePayload::TimeRemaining { seconds: 1500 }
    ));

    let (result, events) = h.send(
        DRIVER_UID,
        Command::StopCharging {
            charger: 0,
            payment: 0,
        },
    );
    assert!(matches!(
        result,
        ResponseResult::Ok(ResponsePayload::ChargingStopped { charger: 0, cost: 0, refund: 0 })
    ));
    assert!(matches!(events[..], [EventPayload::ChargingEnded { charger: 0, .. }]));

    // Unused minutes are forfeited
    assert_eq!(h.balance(DRIVER_UID), 1_000_000 - 30_000);
    assert!(matches!(
        h.ok(DRIVER_UID, Command::IsAvailable { charger: 0 }),
        ResponsePayload::Available { available: true }
    ));

    let audits = h.store.get_recent_audits(10).unwrap();
    let names: Vec<_> = audits
        .iter()
        .rev()
        .map(|a| match &a.event {
            AuditEventType::Pool { event } => event.name().to_string(),
            AuditEventType::OperationRejected { operation, .. } => format!("rejected:{}", operation),
            other => format!("{:?}", other),
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "reservation_created",
            "rejected:start_charging",
            "charging_started",
            "charging_ended",
        ]
    );
}

#[test]
fn test_pool_exhaustion_and_lazy_expiry() {
    let mut h = Harness::new(reservation_config());

    for expected in 0..16 {
        match h.ok(
            DRIVER_UID,
            Command::Reserve {
                minutes: 15,
                payment: 15_000,
            },
        ) {
            ResponsePayload::Reserved { charger, .. } => assert_eq!(charger, expected),
            other => panic!("unexpected {:?}", other),
        }
    }

    assert_eq!(
        h.err(
            OTHER_UID,
            Command::Reserve {
                minutes: 15,
                payment: 15_000
            }
        ),
        ErrorCode::NoResourceAvailable
    );
    // The rejected reservation did not keep the payment
    assert_eq!(h.balance(OTHER_UID), 1_000_000);

    h.advance_minutes(16);

    // Expired but not yet reclaimed: reported free, occupant still recorded
    assert!(matches!(
        h.ok(OTHER_UID, Command::IsAvailable { charger: 3 }),
        ResponsePayload::Available { available: true }
    ));
    match h.ok(OTHER_UID, Command::GetState) {
        ResponsePayload::State(snapshot) => {
            assert_eq!(snapshot.available_count(), 16);
            assert_eq!(
                snapshot.slots[3].occupant,
                Some(AccountId::from_uid(DRIVER_UID))
            );
        }
        other => panic!("unexpected {:?}", other),
    }

    // The sweep reclaims silently: none of these were charging
    let (result, events) = h.send(OTHER_UID, Command::FindAvailable);
    assert!(matches!(result, ResponseResult::Ok(ResponsePayload::Found { charger: 0 })));
    assert!(events.is_empty());

    match h.ok(OTHER_UID, Command::GetState) {
        ResponsePayload::State(snapshot) => {
            assert_eq!(snapshot.slots[0].occupant, None);
            assert!(snapshot.slots[1].occupant.is_some());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_expired_charging_session_is_reclaimed() {
    let mut h = Harness::new(reservation_config());

    h.ok(
        DRIVER_UID,
        Command::Reserve {
            minutes: 15,
            payment: 15_000,
        },
    );
    h.ok(DRIVER_UID, Command::StartCharging { charger: Some(0) });
    h.advance_minutes(20);

    let (result, events) = h.send(OTHER_UID, Command::ReleaseExpired { charger: 0 });
    assert!(matches!(
        result,
        ResponseResult::Ok(ResponsePayload::Released { available: true })
    ));
    assert!(matches!(
        &events[..],
        [EventPayload::ChargingEnded { account, charger: 0, .. }]
            if *account == AccountId::from_uid(DRIVER_UID)
    ));

    // The former holder can no longer stop it
    assert_eq!(
        h.err(
            DRIVER_UID,
            Command::StopCharging {
                charger: 0,
                payment: 0
            }
        ),
        ErrorCode::NotYourReservation
    );
}

#[test]
fn test_metered_session() {
    let mut h = Harness::new(metered_config());

    assert_eq!(
        h.err(
            DRIVER_UID,
            Command::Reserve {
                minutes: 15,
                payment: 15_000
            }
        ),
        ErrorCode::UnsupportedOperation
    );

    assert!(matches!(
        h.ok(DRIVER_UID, Command::StartCharging { charger: None }),
        ResponsePayload::ChargingStarted { charger: 0 }
    ));

    h.clock.advance(Duration::from_secs(150));
    assert!(matches!(
        h.ok(DRIVER_UID, Command::CurrentCost { charger: 0 }),
        ResponsePayload::Cost { cost: 3000 }
    ));

    assert_eq!(
        h.err(
            DRIVER_UID,
            Command::StopCharging {
                charger: 0,
                payment: 2999
            }
        ),
        ErrorCode::InsufficientPayment
    );
    // Failed settlement leaves the session running and the balance intact
    assert_eq!(h.balance(DRIVER_UID), 100_000);
    assert!(matches!(
        h.ok(DRIVER_UID, Command::IsAvailable { charger: 0 }),
        ResponsePayload::Available { available: false }
    ));

    let (result, events) = h.send(
        DRIVER_UID,
        Command::StopCharging {
            charger: 0,
            payment: 5000,
        },
    );
    assert!(matches!(
        result,
        ResponseResult::Ok(ResponsePayload::ChargingStopped { charger: 0, cost: 3000, refund: 2000 })
    ));
    assert!(matches!(events[..], [EventPayload::CostCharged { cost: 3000, .. }]));
    assert_eq!(h.balance(DRIVER_UID), 97_000);

    // Admin collects the takings
    assert!(matches!(
        h.ok(ADMIN_UID, Command::Withdraw),
        ResponsePayload::Withdrawn { amount: 3000 }
    ));
    assert_eq!(h.balance(ADMIN_UID), 3000);
    assert_eq!(h.runtime.service_balance(), 0);
}

#[test]
fn test_pause_halts_mutations() {
    let mut h = Harness::new(reservation_config());

    assert_eq!(h.err(DRIVER_UID, Command::Pause), ErrorCode::Unauthorized);

    let (_, events) = h.send(ADMIN_UID, Command::Pause);
    assert!(matches!(events[..], [EventPayload::Paused { .. }]));

    let before = h.runtime.snapshot();
    assert_eq!(
        h.err(
            DRIVER_UID,
            Command::Reserve {
                minutes: 15,
                payment: 15_000
            }
        ),
        ErrorCode::ServiceHalted
    );
    assert_eq!(h.err(DRIVER_UID, Command::FindAvailable), ErrorCode::ServiceHalted);

    // Reads keep working and nothing moved
    match h.ok(DRIVER_UID, Command::GetState) {
        ResponsePayload::State(snapshot) => {
            assert!(snapshot.paused);
            assert_eq!(snapshot.slots, before.slots);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.balance(DRIVER_UID), 1_000_000);

    h.ok(ADMIN_UID, Command::Unpause);
    assert!(matches!(
        h.ok(
            DRIVER_UID,
            Command::Reserve {
                minutes: 15,
                payment: 15_000
            }
        ),
        ResponsePayload::Reserved { charger: 0, .. }
    ));
}

#[test]
fn test_file_backed_audit_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("chargepoold.db");

    let config = parse_config(reservation_config()).unwrap();
    let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
    let mut runtime = Runtime::from_config(&config, clock).unwrap();

    {
        let store = SqliteStore::open(&db_path).unwrap();
        let client = ClientInfo::new().with_uid(DRIVER_UID);
        handle_command(
            &mut runtime,
            &store,
            &client,
            1,
            Command::Reserve {
                minutes: 10,
                payment: 10_000,
            },
        );
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let audits = store.get_recent_audits(10).unwrap();
    assert_eq!(audits.len(), 1);
    assert!(matches!(
        &audits[0].event,
        AuditEventType::OperationRejected { code: ErrorCode::DurationOutOfRange, .. }
    ));
}
