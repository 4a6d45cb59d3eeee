//! Attendance store: the `(course, session, student)` record table and the
//! registered-student index.
//!
//! Records are kept in a `BTreeMap` ordered by `(course, student, session)`
//! so a student's sessions in one course form a contiguous range. Point
//! lookups by the public `(course, session, student)` key hit the same map.

use std::collections::{BTreeMap, BTreeSet};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{AttendanceKey, AttendanceRecord, CourseId, Identity, SessionId, Timestamp};

type StorageKey = (CourseId, Identity, SessionId);

fn storage_key(key: &AttendanceKey) -> StorageKey {
    (key.course_id, key.student, key.session_id)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceStore {
    records: BTreeMap<StorageKey, AttendanceRecord>,
    registered_students: BTreeSet<Identity>,
}

impl AttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        rows: Vec<(AttendanceKey, AttendanceRecord)>,
        registered_students: Vec<Identity>,
    ) -> Self {
        Self {
            records: rows
                .into_iter()
                .map(|(key, record)| (storage_key(&key), record))
                .collect(),
            registered_students: registered_students.into_iter().collect(),
        }
    }

    /// Check paired bulk inputs. Length agreement is checked before emptiness.
    pub(crate) fn validate_batch(
        students: &[Identity],
        flags: &[bool],
        max_batch_size: usize,
    ) -> Result<(), LedgerError> {
        if students.len() != flags.len() {
            return Err(LedgerError::LengthMismatch {
                students: students.len(),
                flags: flags.len(),
            });
        }
        if students.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }
        if students.len() > max_batch_size {
            return Err(LedgerError::invalid(format!(
                "batch of {} exceeds maximum of {}",
                students.len(),
                max_batch_size
            )));
        }
        Ok(())
    }

    /// Overwrite the record at `key` and register the student. Cannot fail.
    pub(crate) fn write(&mut self, key: AttendanceKey, is_present: bool, timestamp: Timestamp) {
        self.registered_students.insert(key.student);
        self.records.insert(
            storage_key(&key),
            AttendanceRecord {
                timestamp,
                is_present,
            },
        );
    }

    /// Stored record, or `None` if the key was never written.
    pub fn get(&self, key: &AttendanceKey) -> Option<&AttendanceRecord> {
        self.records.get(&storage_key(key))
    }

    /// Stored record, or the zero record for keys never written.
    pub fn get_or_default(&self, key: &AttendanceKey) -> AttendanceRecord {
        self.get(key).copied().unwrap_or_default()
    }

    /// Present sessions among `0..total_sessions` for one student in one course.
    pub fn count_present(
        &self,
        course_id: CourseId,
        student: &Identity,
        total_sessions: u64,
    ) -> Result<u64, LedgerError> {
        if total_sessions == 0 {
            return Err(LedgerError::invalid("total_sessions must be greater than zero"));
        }
        let start = (course_id, *student, 0);
        let end = (course_id, *student, total_sessions);
        let count = self
            .records
            .range(start..end)
            .filter(|(_, record)| record.is_present)
            .count();
        Ok(count as u64)
    }

    pub fn is_registered_student(&self, identity: &Identity) -> bool {
        self.registered_students.contains(identity)
    }

    pub fn registered_students(&self) -> impl Iterator<Item = &Identity> {
        self.registered_students.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = (AttendanceKey, AttendanceRecord)> + '_ {
        self.records
            .iter()
            .map(|(&(course_id, student, session_id), record)| {
                (
                    AttendanceKey {
                        course_id,
                        session_id,
                        student,
                    },
                    *record,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(course_id: CourseId, session_id: SessionId, student: Identity) -> AttendanceKey {
        AttendanceKey {
            course_id,
            session_id,
            student,
        }
    }

    #[test]
    fn test_last_write_wins() {
        let student = Identity::new([5; 32]);
        let mut store = AttendanceStore::new();
        store.write(key(0, 1, student), true, 100);
        store.write(key(0, 1, student), false, 200);

        let record = store.get_or_default(&key(0, 1, student));
        assert!(!record.is_present);
        assert_eq!(record.timestamp, 200);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_key_reads_default() {
        let store = AttendanceStore::new();
        let missing = key(9, 9, Identity::new([9; 32]));
        assert_eq!(store.get_or_default(&missing), AttendanceRecord::default());
        assert!(store.get(&missing).is_none());
    }

    #[test]
    fn test_count_ignores_sessions_outside_range() {
        let student = Identity::new([5; 32]);
        let other = Identity::new([6; 32]);
        let mut store = AttendanceStore::new();
        store.write(key(0, 0, student), true, 1);
        store.write(key(0, 1, student), false, 1);
        store.write(key(0, 2, student), true, 1);
        store.write(key(0, 3, student), true, 1);
        store.write(key(1, 1, student), true, 1);
        store.write(key(0, 1, other), true, 1);

        assert_eq!(store.count_present(0, &student, 3).unwrap(), 2);
        assert_eq!(store.count_present(0, &student, 4).unwrap(), 3);
        assert_eq!(store.count_present(0, &student, 1).unwrap(), 1);
        assert_eq!(store.count_present(1, &student, u64::MAX).unwrap(), 1);
        assert!(matches!(
            store.count_present(0, &student, 0),
            Err(LedgerError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_validate_batch_order_of_checks() {
        let s = Identity::new([1; 32]);
        assert_eq!(
            AttendanceStore::validate_batch(&[], &[true], 10),
            Err(LedgerError::LengthMismatch { students: 0, flags: 1 })
        );
        assert_eq!(
            AttendanceStore::validate_batch(&[], &[], 10),
            Err(LedgerError::EmptyBatch)
        );
        assert!(matches!(
            AttendanceStore::validate_batch(&[s, s], &[true, false], 1),
            Err(LedgerError::InvalidArgument { .. })
        ));
        assert!(AttendanceStore::validate_batch(&[s], &[true], 1).is_ok());
    }

    #[test]
    fn test_registered_students_grow() {
        let a = Identity::new([1; 32]);
        let mut store = AttendanceStore::new();
        assert!(!store.is_registered_student(&a));
        store.write(key(0, 0, a), false, 1);
        store.write(key(0, 1, a), true, 1);
        assert!(store.is_registered_student(&a));
        assert_eq!(store.registered_students().count(), 1);
    }
}
