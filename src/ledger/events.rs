//! Append-only event log.
//!
//! Every state change appends exactly one [`EventRecord`]. Records carry a
//! sequence number and a SHA-256 digest chained over the previous record, so
//! a log restored from storage can be checked for rewrites with
//! [`EventLog::verify_chain`]. Records are CBOR-encoded with a one-byte type
//! prefix when they leave the process.

use scale::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ledger::error::SnapshotError;
use crate::ledger::types::{CourseId, Identity, SessionId, Timestamp};

/// CBOR message type prefix
pub const CBOR_MESSAGE_TYPE: u8 = 0x08;

/// Digest preceding the first record.
pub const GENESIS_DIGEST: [u8; 32] = [0u8; 32];

/// State change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    CourseCreated {
        course_id: CourseId,
        name: String,
    },
    InstructorAuthorized {
        course_id: CourseId,
        instructor: Identity,
    },
    AttendanceMarked {
        course_id: CourseId,
        session_id: SessionId,
        student: Identity,
        is_present: bool,
        timestamp: Timestamp,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::CourseCreated { .. } => "course_created",
            LedgerEvent::InstructorAuthorized { .. } => "instructor_authorized",
            LedgerEvent::AttendanceMarked { .. } => "attendance_marked",
        }
    }

    pub fn course_id(&self) -> CourseId {
        match self {
            LedgerEvent::CourseCreated { course_id, .. }
            | LedgerEvent::InstructorAuthorized { course_id, .. }
            | LedgerEvent::AttendanceMarked { course_id, .. } => *course_id,
        }
    }
}

/// One committed log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub event: LedgerEvent,
    pub digest: [u8; 32],
}

impl EventRecord {
    fn compute_digest(
        previous: &[u8; 32],
        sequence: u64,
        timestamp: Timestamp,
        event: &LedgerEvent,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(previous);
        hasher.update(sequence.to_le_bytes());
        hasher.update(timestamp.to_le_bytes());
        hasher.update(event.encode());
        hasher.finalize().into()
    }

    /// Encode the record as a CBOR message with type prefix
    pub fn encode_message(&self) -> Result<Vec<u8>, EventCodecError> {
        let mut bytes = vec![CBOR_MESSAGE_TYPE];
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| EventCodecError::EncodeError(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode a record from a prefixed CBOR message
    pub fn decode_message(data: &[u8]) -> Result<Self, EventCodecError> {
        match data.split_first() {
            Some((&CBOR_MESSAGE_TYPE, body)) => ciborium::de::from_reader(body)
                .map_err(|e| EventCodecError::DecodeError(e.to_string())),
            Some((other, _)) => Err(EventCodecError::UnknownMessageType(*other)),
            None => Err(EventCodecError::DecodeError("empty message".to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventCodecError {
    #[error("Failed to encode ledger event: {0}")]
    EncodeError(String),

    #[error("Failed to decode ledger event: {0}")]
    DecodeError(String),

    #[error("Unknown message type 0x{0:02x}")]
    UnknownMessageType(u8),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored records, rejecting a broken digest chain.
    pub(crate) fn from_records(records: Vec<EventRecord>) -> Result<Self, SnapshotError> {
        let log = Self { records };
        log.verify_chain()?;
        Ok(log)
    }

    pub(crate) fn append(&mut self, event: LedgerEvent, timestamp: Timestamp) -> &EventRecord {
        let sequence = self.records.len() as u64;
        let previous = self.head_digest();
        let digest = EventRecord::compute_digest(&previous, sequence, timestamp, &event);
        self.records.push(EventRecord {
            sequence,
            timestamp,
            event,
            digest,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn head_digest(&self) -> [u8; 32] {
        self.records
            .last()
            .map(|record| record.digest)
            .unwrap_or(GENESIS_DIGEST)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`, in commit order.
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn verify_chain(&self) -> Result<(), SnapshotError> {
        let mut previous = GENESIS_DIGEST;
        for (index, record) in self.records.iter().enumerate() {
            let expected =
                EventRecord::compute_digest(&previous, index as u64, record.timestamp, &record.event);
            if record.sequence != index as u64 || record.digest != expected {
                return Err(SnapshotError::BrokenChain {
                    sequence: index as u64,
                });
            }
            previous = record.digest;
        }
        Ok(())
    }
}
