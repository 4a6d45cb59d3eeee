//! Access control: the owner identity and per-course write authorization.
//!
//! The instructor sets themselves live in the course registry; this module
//! only evaluates predicates over them through [`InstructorDirectory`].

use log::warn;

use crate::ledger::error::LedgerError;
use crate::ledger::types::{CourseId, Identity};

/// Lookup of instructor membership, implemented by the course registry.
pub trait InstructorDirectory {
    fn is_instructor(&self, course_id: CourseId, identity: &Identity) -> bool;
}

/// Holds the owner identity, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    owner: Identity,
}

impl AccessControl {
    pub fn new(owner: Identity) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.owner == *identity
    }

    /// True if `identity` is the owner or an instructor of `course_id`.
    pub fn is_authorized<D: InstructorDirectory + ?Sized>(
        &self,
        directory: &D,
        course_id: CourseId,
        identity: &Identity,
    ) -> bool {
        self.is_owner(identity) || directory.is_instructor(course_id, identity)
    }

    pub fn require_owner(&self, caller: &Identity) -> Result<(), LedgerError> {
        if self.is_owner(caller) {
            return Ok(());
        }
        warn!("Rejected owner-only operation from {}", caller.short());
        Err(LedgerError::Unauthorized { caller: *caller })
    }

    pub fn require_authorized<D: InstructorDirectory + ?Sized>(
        &self,
        directory: &D,
        course_id: CourseId,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        if self.is_authorized(directory, course_id, caller) {
            return Ok(());
        }
        warn!(
            "Rejected attendance write on course {} from {}",
            course_id,
            caller.short()
        );
        Err(LedgerError::Unauthorized { caller: *caller })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FixedDirectory(HashSet<(CourseId, Identity)>);

    impl InstructorDirectory for FixedDirectory {
        fn is_instructor(&self, course_id: CourseId, identity: &Identity) -> bool {
            self.0.contains(&(course_id, *identity))
        }
    }

    #[test]
    fn test_owner_is_authorized_everywhere() {
        let owner = Identity::new([1; 32]);
        let access = AccessControl::new(owner);
        let directory = FixedDirectory(HashSet::new());

        assert!(access.is_owner(&owner));
        assert!(access.is_authorized(&directory, 0, &owner));
        assert!(access.is_authorized(&directory, 99, &owner));
        assert!(access.require_owner(&owner).is_ok());
    }

    #[test]
    fn test_instructor_scoped_to_course() {
        let owner = Identity::new([1; 32]);
        let instructor = Identity::new([2; 32]);
        let access = AccessControl::new(owner);
        let directory = FixedDirectory([(3, instructor)].into_iter().collect());

        assert!(!access.is_owner(&instructor));
        assert!(access.is_authorized(&directory, 3, &instructor));
        assert!(!access.is_authorized(&directory, 4, &instructor));
        assert_eq!(
            access.require_authorized(&directory, 4, &instructor),
            Err(LedgerError::Unauthorized { caller: instructor })
        );
        assert_eq!(
            access.require_owner(&instructor),
            Err(LedgerError::Unauthorized { caller: instructor })
        );
    }
}
