//! Serialized ledger service.
//!
//! [`LedgerService`] owns a [`LedgerState`] behind a single `RwLock`. Every
//! mutating operation holds the write lock for its whole transaction:
//! precondition checks, writes, event append, snapshot commit and live-feed
//! publication. Reads take the read lock and only ever see committed state.
//!
//! ```text
//! caller ──▶ LedgerService ──write lock──▶ LedgerState ──▶ SnapshotStore
//!                  │                                        (commit)
//!                  └──▶ broadcast feed ──▶ EventPublisher ──▶ NATS
//! ```

pub mod persistence;
pub mod publisher;

use std::sync::Arc;

use log::{error, info};
use tokio::sync::{broadcast, RwLock};

use crate::ledger::{
    AttendanceRecord, Clock, Course, CourseId, EventRecord, Identity, LedgerError, LedgerLimits,
    LedgerSnapshot, LedgerState, SessionId, Timestamp,
};

pub use persistence::{MemorySnapshotStore, PersistenceError, RedisSnapshotStore, SnapshotStore};
pub use publisher::EventPublisher;

/// Live feed buffer used when none is configured.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Stored ledger belongs to owner {stored}, configured owner is {configured}")]
    OwnerMismatch {
        stored: Identity,
        configured: Identity,
    },
}

pub struct LedgerService {
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn SnapshotStore>>,
    feed: broadcast::Sender<EventRecord>,
}

impl LedgerService {
    pub fn new(state: LedgerState, clock: Arc<dyn Clock>, feed_capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            state: RwLock::new(state),
            clock,
            store: None,
            feed,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Restore from `store` if it holds a snapshot, otherwise start empty.
    pub async fn open(
        owner: Identity,
        limits: LedgerLimits,
        clock: Arc<dyn Clock>,
        store: Option<Arc<dyn SnapshotStore>>,
        feed_capacity: usize,
    ) -> Result<Self, ServiceError> {
        let snapshot = match &store {
            Some(store) => store.load().await?,
            None => None,
        };
        let state = match snapshot {
            Some(snapshot) => {
                if snapshot.owner != owner {
                    return Err(ServiceError::OwnerMismatch {
                        stored: snapshot.owner,
                        configured: owner,
                    });
                }
                LedgerState::restore(snapshot, limits).map_err(PersistenceError::from)?
            }
            None => {
                info!("Starting empty ledger owned by {}", owner);
                LedgerState::new(owner, limits)
            }
        };

        let service = Self::new(state, clock, feed_capacity);
        Ok(match store {
            Some(store) => service.with_store(store),
            None => service,
        })
    }

    /// Run one mutating operation as a transaction.
    async fn commit<T, F>(&self, operation: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut LedgerState, Timestamp) -> Result<T, LedgerError>,
    {
        let mut state = self.state.write().await;
        let first_sequence = state.events().len() as u64;
        let now = self.clock.now_millis();

        // With a store, the shared state is only replaced once the save has
        // returned, so a cancelled caller leaves it untouched.
        let value = match &self.store {
            Some(store) => {
                let mut staged = state.clone();
                let value = operation(&mut staged, now)?;
                if let Err(e) = store.save(&staged.snapshot()).await {
                    error!("Snapshot commit failed, discarding operation: {}", e);
                    return Err(e.into());
                }
                *state = staged;
                value
            }
            None => operation(&mut *state, now)?,
        };

        for record in state.events_since(first_sequence) {
            // No subscribers is not an error.
            let _ = self.feed.send(record.clone());
        }
        Ok(value)
    }

    pub async fn create_course(
        &self,
        caller: &Identity,
        name: &str,
        instructors: &[Identity],
    ) -> Result<CourseId, ServiceError> {
        self.commit(|state, now| state.create_course(caller, name, instructors, now))
            .await
    }

    pub async fn mark_attendance(
        &self,
        caller: &Identity,
        course_id: CourseId,
        session_id: SessionId,
        student: Identity,
        is_present: bool,
    ) -> Result<(), ServiceError> {
        self.commit(|state, now| {
            state.mark_attendance(caller, course_id, session_id, student, is_present, now)
        })
        .await
    }

    pub async fn bulk_mark_attendance(
        &self,
        caller: &Identity,
        course_id: CourseId,
        session_id: SessionId,
        students: &[Identity],
        presence: &[bool],
    ) -> Result<(), ServiceError> {
        self.commit(|state, now| {
            state.bulk_mark_attendance(caller, course_id, session_id, students, presence, now)
        })
        .await
    }

    pub async fn verify_attendance(
        &self,
        course_id: CourseId,
        session_id: SessionId,
        student: &Identity,
    ) -> (bool, Timestamp) {
        self.state
            .read()
            .await
            .verify_attendance(course_id, session_id, student)
    }

    pub async fn attendance_record(
        &self,
        course_id: CourseId,
        session_id: SessionId,
        student: &Identity,
    ) -> Option<AttendanceRecord> {
        self.state
            .read()
            .await
            .attendance_record(course_id, session_id, student)
    }

    pub async fn get_student_attendance_count(
        &self,
        course_id: CourseId,
        student: &Identity,
        total_sessions: u64,
    ) -> Result<u64, ServiceError> {
        Ok(self
            .state
            .read()
            .await
            .get_student_attendance_count(course_id, student, total_sessions)?)
    }

    pub async fn is_active(&self, course_id: CourseId) -> bool {
        self.state.read().await.is_active(course_id)
    }

    pub async fn is_owner(&self, identity: &Identity) -> bool {
        self.state.read().await.is_owner(identity)
    }

    pub async fn is_authorized(&self, course_id: CourseId, identity: &Identity) -> bool {
        self.state.read().await.is_authorized(course_id, identity)
    }

    pub async fn course(&self, course_id: CourseId) -> Option<Course> {
        self.state.read().await.course(course_id).cloned()
    }

    pub async fn course_count(&self) -> u64 {
        self.state.read().await.course_count()
    }

    pub async fn is_registered_student(&self, identity: &Identity) -> bool {
        self.state.read().await.is_registered_student(identity)
    }

    /// Committed records with `sequence >= from`.
    pub async fn replay(&self, from: u64) -> Vec<EventRecord> {
        self.state.read().await.events_since(from).to_vec()
    }

    /// Live feed of records committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.feed.subscribe()
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().await.snapshot()
    }
}
