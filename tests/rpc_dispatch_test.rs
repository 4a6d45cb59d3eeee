extern crate attendance_ledger;

use std::sync::Arc;

use attendance_ledger::ledger::ManualClock;
use attendance_ledger::rpc::{dispatch, ErrorKind, LedgerResponse};
use attendance_ledger::service::MemorySnapshotStore;
use attendance_ledger::{
    Identity, JwtIdentityProvider, LedgerLimits, LedgerService, LedgerState,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

const SECRET: &[u8] = b"rpc-test-secret";
const OWNER: Identity = Identity::new([0x01; 32]);
const INSTRUCTOR: Identity = Identity::new([0x0A; 32]);
const STUDENT: Identity = Identity::new([0x55; 32]);

fn token(identity: &Identity) -> String {
    let claims = json!({ "sub": identity.to_string(), "exp": 4_102_444_800u64 });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

struct Harness {
    service: LedgerService,
    identities: JwtIdentityProvider,
}

impl Harness {
    fn new() -> Self {
        let limits = LedgerLimits {
            max_batch_size: 2,
            max_instructors: 4,
        };
        Self {
            service: LedgerService::new(
                LedgerState::new(OWNER, limits),
                Arc::new(ManualClock::new(5_000)),
                16,
            ),
            identities: JwtIdentityProvider::from_secret(SECRET),
        }
    }

    async fn call(&self, request: Value) -> LedgerResponse {
        let payload = serde_json::to_vec(&request).unwrap();
        let bytes = dispatch(&self.service, &self.identities, &payload).await;
        serde_json::from_slice(&bytes).unwrap()
    }
}

fn ok(response: LedgerResponse) -> Value {
    match response {
        LedgerResponse::Ok { result } => result,
        other => panic!("expected ok, got {:?}", other),
    }
}

fn error_kind(response: LedgerResponse) -> ErrorKind {
    match response {
        LedgerResponse::Error { kind, .. } => kind,
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_round_trip_through_protocol() {
    let harness = Harness::new();

    let created = harness
        .call(json!({
            "token": token(&OWNER),
            "operation": {
                "type": "create_course",
                "name": "Intro",
                "instructors": [INSTRUCTOR.to_string()]
            }
        }))
        .await;
    assert_eq!(ok(created), json!({ "course_id": 0 }));

    let marked = harness
        .call(json!({
            "token": token(&INSTRUCTOR),
            "operation": {
                "type": "mark_attendance",
                "course_id": 0,
                "session_id": 1,
                "student": STUDENT.to_string(),
                "is_present": true
            }
        }))
        .await;
    assert_eq!(ok(marked), Value::Null);

    let verified = harness
        .call(json!({
            "operation": {
                "type": "verify_attendance",
                "course_id": 0,
                "session_id": 1,
                "student": STUDENT.to_string()
            }
        }))
        .await;
    assert_eq!(ok(verified), json!({ "is_present": true, "timestamp": 5_000 }));

    let active = harness
        .call(json!({ "operation": { "type": "is_active", "course_id": 7 } }))
        .await;
    assert_eq!(ok(active), json!({ "is_active": false }));

    let events = ok(harness
        .call(json!({ "operation": { "type": "replay_events", "from": 2 } }))
        .await);
    assert_eq!(events.as_array().map(Vec::len), Some(1));
    assert_eq!(events[0]["event"]["type"], "attendance_marked");
}

#[tokio::test]
async fn test_error_kinds_are_distinguishable() {
    let harness = Harness::new();
    ok(harness
        .call(json!({
            "token": token(&OWNER),
            "operation": { "type": "create_course", "name": "Intro" }
        }))
        .await);

    let no_token = harness
        .call(json!({
            "operation": { "type": "create_course", "name": "Rogue" }
        }))
        .await;
    assert_eq!(error_kind(no_token), ErrorKind::Unauthenticated);

    let bad_token = harness
        .call(json!({
            "token": "not-a-jwt",
            "operation": { "type": "create_course", "name": "Rogue" }
        }))
        .await;
    assert_eq!(error_kind(bad_token), ErrorKind::Unauthenticated);

    let not_owner = harness
        .call(json!({
            "token": token(&INSTRUCTOR),
            "operation": { "type": "create_course", "name": "Rogue" }
        }))
        .await;
    assert_eq!(error_kind(not_owner), ErrorKind::Unauthorized);

    let inactive = harness
        .call(json!({
            "token": token(&OWNER),
            "operation": {
                "type": "mark_attendance",
                "course_id": 9,
                "session_id": 0,
                "student": STUDENT.to_string(),
                "is_present": true
            }
        }))
        .await;
    assert_eq!(error_kind(inactive), ErrorKind::CourseInactive);

    let bulk = |students: Vec<String>, presence: Vec<bool>| {
        json!({
            "token": token(&OWNER),
            "operation": {
                "type": "bulk_mark_attendance",
                "course_id": 0,
                "session_id": 0,
                "students": students,
                "presence": presence
            }
        })
    };
    let s = STUDENT.to_string();
    assert_eq!(
        error_kind(harness.call(bulk(vec![s.clone()], vec![true, false])).await),
        ErrorKind::LengthMismatch
    );
    assert_eq!(
        error_kind(harness.call(bulk(vec![], vec![])).await),
        ErrorKind::EmptyBatch
    );
    assert_eq!(
        error_kind(
            harness
                .call(bulk(vec![s.clone(), s.clone(), s], vec![true; 3]))
                .await
        ),
        ErrorKind::InvalidArgument
    );

    let zero_sessions = harness
        .call(json!({
            "operation": {
                "type": "get_student_attendance_count",
                "course_id": 0,
                "student": STUDENT.to_string(),
                "total_sessions": 0
            }
        }))
        .await;
    assert_eq!(error_kind(zero_sessions), ErrorKind::InvalidArgument);

    let payload = b"{not json";
    let bytes = dispatch(&harness.service, &harness.identities, payload).await;
    let response: LedgerResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error_kind(response), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_persistence_failure_reported() {
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Harness {
        service: LedgerService::new(
            LedgerState::new(OWNER, LedgerLimits::default()),
            Arc::new(ManualClock::new(1)),
            16,
        )
        .with_store(store.clone()),
        identities: JwtIdentityProvider::from_secret(SECRET),
    };
    store.set_fail_writes(true);

    let response = harness
        .call(json!({
            "token": token(&OWNER),
            "operation": { "type": "create_course", "name": "Intro" }
        }))
        .await;
    assert_eq!(error_kind(response), ErrorKind::Persistence);
    assert_eq!(harness.service.course_count().await, 0);
}
