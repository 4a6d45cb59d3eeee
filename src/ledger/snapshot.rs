//! Persisted ledger layout.
//!
//! A snapshot holds every logical relation of the ledger: owner, course
//! table and counter, attendance rows, registered students, and the event
//! log. The physical encoding is SCALE.

use scale::{Decode, Encode};

use crate::ledger::error::SnapshotError;
use crate::ledger::events::EventRecord;
use crate::ledger::types::{AttendanceKey, AttendanceRecord, Course, CourseId, Identity, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct LedgerSnapshot {
    pub owner: Identity,
    pub next_course_id: CourseId,
    pub last_timestamp: Timestamp,
    pub courses: Vec<Course>,
    pub attendance: Vec<(AttendanceKey, AttendanceRecord)>,
    pub registered_students: Vec<Identity>,
    pub events: Vec<EventRecord>,
}

impl LedgerSnapshot {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let mut input = bytes;
        let snapshot = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(SnapshotError::DecodeError(format!(
                "{} trailing bytes",
                input.len()
            )));
        }
        Ok(snapshot)
    }
}
