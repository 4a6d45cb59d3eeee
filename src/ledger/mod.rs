//! Permissioned attendance ledger.
//!
//! Courses are created by a single owner identity; attendance for a course
//! may be written by the owner or by the course's instructors. Every change
//! is appended to a digest-chained event log.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌────────────────┐     ┌─────────────────┐
//! │ AccessControl │◀────│ CourseRegistry │◀────│ AttendanceStore │
//! │  (owner)      │     │ (instructors)  │     │ (records)       │
//! └───────────────┘     └────────────────┘     └─────────────────┘
//!         ▲                      ▲                       ▲
//!         └──────────────┬───────┴───────────────────────┘
//!                        │
//!                 ┌─────────────┐       ┌──────────┐
//!                 │ LedgerState │──────▶│ EventLog │
//!                 └─────────────┘       └──────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use attendance_ledger::ledger::{Identity, LedgerLimits, LedgerState};
//!
//! let owner = Identity::new([1; 32]);
//! let instructor = Identity::new([2; 32]);
//! let student = Identity::new([3; 32]);
//!
//! let mut ledger = LedgerState::new(owner, LedgerLimits::default());
//! let course = ledger.create_course(&owner, "Intro", &[instructor], 1_000).unwrap();
//! ledger.mark_attendance(&instructor, course, 1, student, true, 2_000).unwrap();
//!
//! assert_eq!(ledger.verify_attendance(course, 1, &student), (true, 2_000));
//! ```

pub mod access;
pub mod clock;
pub mod error;
pub mod events;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;

pub use access::{AccessControl, InstructorDirectory};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, SnapshotError};
pub use events::{EventCodecError, EventLog, EventRecord, LedgerEvent};
pub use registry::CourseRegistry;
pub use snapshot::LedgerSnapshot;
pub use state::{LedgerLimits, LedgerState};
pub use store::AttendanceStore;
pub use types::{
    AttendanceKey, AttendanceRecord, Course, CourseId, Identity, IdentityParseError, SessionId,
    Timestamp,
};
