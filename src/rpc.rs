//! JSON request protocol spoken by the host binary.
//!
//! ```json
//! {"token": "<jwt>", "operation": {"type": "mark_attendance", "course_id": 0,
//!  "session_id": 1, "student": "0x…", "is_present": true}}
//! ```
//!
//! Writes need a token; reads ignore it. Every failure is reported with a
//! stable [`ErrorKind`] so callers can tell authorization problems from
//! malformed requests.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::identity::IdentityProvider;
use crate::ledger::{CourseId, Identity, LedgerError, SessionId};
use crate::service::{LedgerService, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    CreateCourse {
        name: String,
        #[serde(default)]
        instructors: Vec<Identity>,
    },
    MarkAttendance {
        course_id: CourseId,
        session_id: SessionId,
        student: Identity,
        is_present: bool,
    },
    BulkMarkAttendance {
        course_id: CourseId,
        session_id: SessionId,
        students: Vec<Identity>,
        presence: Vec<bool>,
    },
    VerifyAttendance {
        course_id: CourseId,
        session_id: SessionId,
        student: Identity,
    },
    GetStudentAttendanceCount {
        course_id: CourseId,
        student: Identity,
        total_sessions: u64,
    },
    IsActive {
        course_id: CourseId,
    },
    IsAuthorized {
        course_id: CourseId,
        identity: Identity,
    },
    GetCourse {
        course_id: CourseId,
    },
    ReplayEvents {
        #[serde(default)]
        from: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    CourseInactive,
    LengthMismatch,
    EmptyBatch,
    InvalidArgument,
    Unauthenticated,
    Persistence,
    BadRequest,
}

impl From<&LedgerError> for ErrorKind {
    fn from(error: &LedgerError) -> Self {
        match error {
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::CourseInactive { .. } => ErrorKind::CourseInactive,
            LedgerError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            LedgerError::EmptyBatch => ErrorKind::EmptyBatch,
            LedgerError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }
}

impl From<&ServiceError> for ErrorKind {
    fn from(error: &ServiceError) -> Self {
        match error {
            ServiceError::Ledger(inner) => inner.into(),
            ServiceError::Persistence(_) | ServiceError::OwnerMismatch { .. } => {
                ErrorKind::Persistence
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LedgerResponse {
    Ok { result: Value },
    Error { kind: ErrorKind, message: String },
}

impl LedgerResponse {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        LedgerResponse::Error {
            kind,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for LedgerResponse {
    fn from(error: ServiceError) -> Self {
        LedgerResponse::error((&error).into(), error.to_string())
    }
}

/// Decode, execute and encode one request.
pub async fn dispatch(
    service: &LedgerService,
    identities: &dyn IdentityProvider,
    payload: &[u8],
) -> Vec<u8> {
    let response = match serde_json::from_slice::<LedgerRequest>(payload) {
        Ok(request) => handle(service, identities, request).await,
        Err(e) => {
            warn!("Rejected malformed request: {}", e);
            LedgerResponse::error(ErrorKind::BadRequest, e.to_string())
        }
    };
    serde_json::to_vec(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"status":"error","kind":"bad_request","message":"encode failed: {}"}}"#,
            e
        )
        .into_bytes()
    })
}

fn authenticate(
    identities: &dyn IdentityProvider,
    token: Option<&str>,
) -> Result<Identity, LedgerResponse> {
    let token = token.ok_or_else(|| {
        LedgerResponse::error(ErrorKind::Unauthenticated, "token required for writes")
    })?;
    identities.authenticate(token).map_err(|e| {
        warn!("Authentication failed: {}", e);
        LedgerResponse::error(ErrorKind::Unauthenticated, e.to_string())
    })
}

pub async fn handle(
    service: &LedgerService,
    identities: &dyn IdentityProvider,
    request: LedgerRequest,
) -> LedgerResponse {
    debug!("Handling {:?}", request.operation);
    let token = request.token.as_deref();
    match execute(service, identities, token, request.operation).await {
        Ok(result) => LedgerResponse::Ok { result },
        Err(response) => response,
    }
}

async fn execute(
    service: &LedgerService,
    identities: &dyn IdentityProvider,
    token: Option<&str>,
    operation: Operation,
) -> Result<Value, LedgerResponse> {
    let result = match operation {
        Operation::CreateCourse { name, instructors } => {
            let caller = authenticate(identities, token)?;
            let course_id = service.create_course(&caller, &name, &instructors).await?;
            json!({ "course_id": course_id })
        }
        Operation::MarkAttendance {
            course_id,
            session_id,
            student,
            is_present,
        } => {
            let caller = authenticate(identities, token)?;
            service
                .mark_attendance(&caller, course_id, session_id, student, is_present)
                .await?;
            Value::Null
        }
        Operation::BulkMarkAttendance {
            course_id,
            session_id,
            students,
            presence,
        } => {
            let caller = authenticate(identities, token)?;
            service
                .bulk_mark_attendance(&caller, course_id, session_id, &students, &presence)
                .await?;
            Value::Null
        }
        Operation::VerifyAttendance {
            course_id,
            session_id,
            student,
        } => {
            let (is_present, timestamp) = service
                .verify_attendance(course_id, session_id, &student)
                .await;
            json!({ "is_present": is_present, "timestamp": timestamp })
        }
        Operation::GetStudentAttendanceCount {
            course_id,
            student,
            total_sessions,
        } => {
            let count = service
                .get_student_attendance_count(course_id, &student, total_sessions)
                .await?;
            json!({ "count": count })
        }
        Operation::IsActive { course_id } => {
            json!({ "is_active": service.is_active(course_id).await })
        }
        Operation::IsAuthorized {
            course_id,
            identity,
        } => {
            json!({ "is_authorized": service.is_authorized(course_id, &identity).await })
        }
        Operation::GetCourse { course_id } => json!(service.course(course_id).await),
        Operation::ReplayEvents { from } => json!(service.replay(from).await),
    };
    Ok(result)
}
