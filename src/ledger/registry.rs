//! Course registry: sequential course ids, active flags and instructor sets.

use std::collections::BTreeMap;

use crate::ledger::access::InstructorDirectory;
use crate::ledger::types::{Course, CourseId, Identity};

/// Course table plus the id counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseRegistry {
    courses: BTreeMap<CourseId, Course>,
    next_course_id: CourseId,
}

impl CourseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(courses: Vec<Course>, next_course_id: CourseId) -> Self {
        Self {
            courses: courses.into_iter().map(|c| (c.id, c)).collect(),
            next_course_id,
        }
    }

    /// Store a new active course under the next id and return that id.
    ///
    /// Callers check ownership first; this never fails.
    pub(crate) fn register(&mut self, name: String, instructors: &[Identity]) -> CourseId {
        let id = self.next_course_id;
        let course = Course {
            id,
            name,
            is_active: true,
            instructors: instructors.iter().copied().collect(),
        };
        self.courses.insert(id, course);
        self.next_course_id += 1;
        id
    }

    /// Unknown ids read as inactive.
    pub fn is_active(&self, course_id: CourseId) -> bool {
        self.courses
            .get(&course_id)
            .map(|course| course.is_active)
            .unwrap_or(false)
    }

    pub fn course(&self, course_id: CourseId) -> Option<&Course> {
        self.courses.get(&course_id)
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    /// Number of courses ever created, which is also the next id.
    pub fn course_count(&self) -> u64 {
        self.next_course_id
    }
}

impl InstructorDirectory for CourseRegistry {
    fn is_instructor(&self, course_id: CourseId, identity: &Identity) -> bool {
        self.courses
            .get(&course_id)
            .map(|course| course.instructors.contains(identity))
            .unwrap_or(false)
    }
}
