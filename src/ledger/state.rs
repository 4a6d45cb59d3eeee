//! The ledger state machine.
//!
//! [`LedgerState`] composes access control, the course registry, the
//! attendance store and the event log. Each mutating operation validates
//! every precondition first and only then writes, so an `Err` leaves the
//! state untouched. Operations are synchronous; serialization across
//! callers is the job of the owning service.

use log::{debug, info, warn};

use crate::ledger::access::AccessControl;
use crate::ledger::error::{LedgerError, SnapshotError};
use crate::ledger::events::{EventLog, EventRecord, LedgerEvent};
use crate::ledger::registry::CourseRegistry;
use crate::ledger::snapshot::LedgerSnapshot;
use crate::ledger::store::AttendanceStore;
use crate::ledger::types::{
    AttendanceKey, AttendanceRecord, Course, CourseId, Identity, SessionId, Timestamp,
};

/// Default maximum students per bulk write.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 256;

/// Default maximum instructors supplied to one `create_course`.
pub const DEFAULT_MAX_INSTRUCTORS: usize = 64;

/// Caps on per-call input sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLimits {
    pub max_batch_size: usize,
    pub max_instructors: usize,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_instructors: DEFAULT_MAX_INSTRUCTORS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    access: AccessControl,
    courses: CourseRegistry,
    attendance: AttendanceStore,
    events: EventLog,
    limits: LedgerLimits,
    last_timestamp: Timestamp,
}

impl LedgerState {
    pub fn new(owner: Identity, limits: LedgerLimits) -> Self {
        Self {
            access: AccessControl::new(owner),
            courses: CourseRegistry::new(),
            attendance: AttendanceStore::new(),
            events: EventLog::new(),
            limits,
            last_timestamp: 0,
        }
    }

    /// Clamp to the last commit so timestamps never go backwards.
    fn commit_timestamp(&mut self, now: Timestamp) -> Timestamp {
        let timestamp = now.max(self.last_timestamp);
        self.last_timestamp = timestamp;
        timestamp
    }

    /// Create a course. Owner only.
    pub fn create_course(
        &mut self,
        caller: &Identity,
        name: impl Into<String>,
        instructors: &[Identity],
        now: Timestamp,
    ) -> Result<CourseId, LedgerError> {
        self.access.require_owner(caller)?;
        if instructors.len() > self.limits.max_instructors {
            return Err(LedgerError::invalid(format!(
                "{} instructors exceeds maximum of {}",
                instructors.len(),
                self.limits.max_instructors
            )));
        }

        let timestamp = self.commit_timestamp(now);
        let name = name.into();
        let course_id = self.courses.register(name.clone(), instructors);
        self.events
            .append(LedgerEvent::CourseCreated { course_id, name }, timestamp);
        for instructor in instructors {
            self.events.append(
                LedgerEvent::InstructorAuthorized {
                    course_id,
                    instructor: *instructor,
                },
                timestamp,
            );
        }

        info!(
            "Created course {} with {} instructor(s)",
            course_id,
            instructors.len()
        );
        Ok(course_id)
    }

    fn require_writable(&self, caller: &Identity, course_id: CourseId) -> Result<(), LedgerError> {
        self.access
            .require_authorized(&self.courses, course_id, caller)?;
        if !self.courses.is_active(course_id) {
            warn!("Rejected attendance write on inactive course {}", course_id);
            return Err(LedgerError::CourseInactive { course_id });
        }
        Ok(())
    }

    fn write_record(&mut self, key: AttendanceKey, is_present: bool, timestamp: Timestamp) {
        self.attendance.write(key, is_present, timestamp);
        self.events.append(
            LedgerEvent::AttendanceMarked {
                course_id: key.course_id,
                session_id: key.session_id,
                student: key.student,
                is_present,
                timestamp,
            },
            timestamp,
        );
    }

    /// Write one attendance record. Owner or course instructor.
    pub fn mark_attendance(
        &mut self,
        caller: &Identity,
        course_id: CourseId,
        session_id: SessionId,
        student: Identity,
        is_present: bool,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.require_writable(caller, course_id)?;

        let timestamp = self.commit_timestamp(now);
        let key = AttendanceKey {
            course_id,
            session_id,
            student,
        };
        self.write_record(key, is_present, timestamp);

        info!(
            "Marked {} {} for course {} session {}",
            student.short(),
            if is_present { "present" } else { "absent" },
            course_id,
            session_id
        );
        Ok(())
    }

    /// Write one record per student, all or nothing, sharing one timestamp.
    pub fn bulk_mark_attendance(
        &mut self,
        caller: &Identity,
        course_id: CourseId,
        session_id: SessionId,
        students: &[Identity],
        presence: &[bool],
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.require_writable(caller, course_id)?;
        AttendanceStore::validate_batch(students, presence, self.limits.max_batch_size)?;

        let timestamp = self.commit_timestamp(now);
        for (student, is_present) in students.iter().zip(presence) {
            let key = AttendanceKey {
                course_id,
                session_id,
                student: *student,
            };
            self.write_record(key, *is_present, timestamp);
        }

        info!(
            "Marked {} students for course {} session {}",
            students.len(),
            course_id,
            session_id
        );
        Ok(())
    }

    /// `(is_present, timestamp)`; `(false, 0)` for keys never written.
    pub fn verify_attendance(
        &self,
        course_id: CourseId,
        session_id: SessionId,
        student: &Identity,
    ) -> (bool, Timestamp) {
        let record = self.attendance.get_or_default(&AttendanceKey {
            course_id,
            session_id,
            student: *student,
        });
        debug!(
            "Verified {} in course {} session {}: {:?}",
            student.short(),
            course_id,
            session_id,
            record
        );
        (record.is_present, record.timestamp)
    }

    /// Existence-aware read: `None` means the key was never written.
    pub fn attendance_record(
        &self,
        course_id: CourseId,
        session_id: SessionId,
        student: &Identity,
    ) -> Option<AttendanceRecord> {
        self.attendance
            .get(&AttendanceKey {
                course_id,
                session_id,
                student: *student,
            })
            .copied()
    }

    /// Present sessions among `0..total_sessions`.
    pub fn get_student_attendance_count(
        &self,
        course_id: CourseId,
        student: &Identity,
        total_sessions: u64,
    ) -> Result<u64, LedgerError> {
        self.attendance
            .count_present(course_id, student, total_sessions)
    }

    pub fn is_active(&self, course_id: CourseId) -> bool {
        self.courses.is_active(course_id)
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.access.is_owner(identity)
    }

    pub fn is_authorized(&self, course_id: CourseId, identity: &Identity) -> bool {
        self.access.is_authorized(&self.courses, course_id, identity)
    }

    pub fn owner(&self) -> &Identity {
        self.access.owner()
    }

    pub fn limits(&self) -> LedgerLimits {
        self.limits
    }

    pub fn course(&self, course_id: CourseId) -> Option<&Course> {
        self.courses.course(course_id)
    }

    pub fn course_count(&self) -> u64 {
        self.courses.course_count()
    }

    pub fn is_registered_student(&self, identity: &Identity) -> bool {
        self.attendance.is_registered_student(identity)
    }

    pub fn registered_students(&self) -> Vec<Identity> {
        self.attendance.registered_students().copied().collect()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        self.events.since(sequence)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            owner: *self.access.owner(),
            next_course_id: self.courses.course_count(),
            last_timestamp: self.last_timestamp,
            courses: self.courses.courses().cloned().collect(),
            attendance: self.attendance.rows().collect(),
            registered_students: self.attendance.registered_students().copied().collect(),
            events: self.events.records().to_vec(),
        }
    }

    /// Rebuild state from a snapshot, checking the log chain and id counter.
    pub fn restore(snapshot: LedgerSnapshot, limits: LedgerLimits) -> Result<Self, SnapshotError> {
        if let Some(course) = snapshot
            .courses
            .iter()
            .find(|course| course.id >= snapshot.next_course_id)
        {
            return Err(SnapshotError::CounterRegression {
                next_course_id: snapshot.next_course_id,
                course_id: course.id,
            });
        }
        let events = EventLog::from_records(snapshot.events)?;

        info!(
            "Restored ledger with {} courses, {} records, {} events",
            snapshot.courses.len(),
            snapshot.attendance.len(),
            events.len()
        );
        Ok(Self {
            access: AccessControl::new(snapshot.owner),
            courses: CourseRegistry::from_parts(snapshot.courses, snapshot.next_course_id),
            attendance: AttendanceStore::from_parts(
                snapshot.attendance,
                snapshot.registered_students,
            ),
            events,
            limits,
            last_timestamp: snapshot.last_timestamp,
        })
    }
}
