// Ledger Store - storage access for course records
// Any backend that can insert, fetch by id, query by student, patch and remove.

use crate::grade::Grade;
use crate::validation::{ValidCourse, ValidPatch};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

// ============================================================================
// COURSE RECORD
// ============================================================================

/// One course taken by one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Assigned by the store, never changes
    pub id: i64,
    pub student_id: String,
    pub course_name: String,
    pub grade: Grade,
    pub credits: f64,
}

impl CourseRecord {
    pub fn from_valid(id: i64, course: ValidCourse) -> Self {
        CourseRecord {
            id,
            student_id: course.student_id,
            course_name: course.course_name,
            grade: course.grade,
            credits: course.credits,
        }
    }

    /// Apply the supplied fields of a patch, keeping the rest
    pub fn apply(&mut self, patch: &ValidPatch) {
        if let Some(name) = &patch.course_name {
            self.course_name = name.clone();
        }
        if let Some(grade) = patch.grade {
            self.grade = grade;
        }
        if let Some(credits) = patch.credits {
            self.credits = credits;
        }
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Storage capability behind the ledger.
///
/// Inputs arrive already validated. Each call is atomic on its own.
pub trait CourseStore: Send + Sync {
    /// Persist a new record under a fresh id
    fn insert(&self, course: ValidCourse) -> Result<CourseRecord>;

    fn get(&self, id: i64) -> Result<Option<CourseRecord>>;

    /// All records for a student, ascending id
    fn list_by_student(&self, student_id: &str) -> Result<Vec<CourseRecord>>;

    /// Apply a patch; `None` when no record has this id
    fn update(&self, id: i64, patch: &ValidPatch) -> Result<Option<CourseRecord>>;

    /// Remove a record; `false` when no record has this id
    fn remove(&self, id: i64) -> Result<bool>;
}

impl<S> CourseStore for Arc<S>
where
    S: CourseStore + ?Sized,
{
    fn insert(&self, course: ValidCourse) -> Result<CourseRecord> {
        (**self).insert(course)
    }

    fn get(&self, id: i64) -> Result<Option<CourseRecord>> {
        (**self).get(id)
    }

    fn list_by_student(&self, student_id: &str) -> Result<Vec<CourseRecord>> {
        (**self).list_by_student(student_id)
    }

    fn update(&self, id: i64, patch: &ValidPatch) -> Result<Option<CourseRecord>> {
        (**self).update(id, patch)
    }

    fn remove(&self, id: i64) -> Result<bool> {
        (**self).remove(id)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    records: BTreeMap<i64, CourseRecord>,
}

/// In-memory store for tests/dev. Ids are never reused.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

impl CourseStore for InMemoryStore {
    fn insert(&self, course: ValidCourse) -> Result<CourseRecord> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.last_id += 1;
        let record = CourseRecord::from_valid(inner.last_id, course);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn get(&self, id: i64) -> Result<Option<CourseRecord>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.records.get(&id).cloned())
    }

    fn list_by_student(&self, student_id: &str) -> Result<Vec<CourseRecord>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .records
            .values()
            .filter(|record| record.student_id == student_id)
            .cloned()
            .collect())
    }

    fn update(&self, id: i64, patch: &ValidPatch) -> Result<Option<CourseRecord>> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(inner.records.get_mut(&id).map(|record| {
            record.apply(patch);
            record.clone()
        }))
    }

    fn remove(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(inner.records.remove(&id).is_some())
    }
}
