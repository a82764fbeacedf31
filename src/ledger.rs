// Course Ledger - validate, persist, aggregate
// Every public operation is one independent, atomic unit of work.

use crate::error::{LedgerError, LedgerResult};
use crate::gpa::compute_gpa;
use crate::store::{CourseRecord, CourseStore};
use crate::validation::{validate_new, validate_patch, CoursePatch, NewCourse};
use serde::Serialize;
use std::sync::Arc;

/// GPA for one student
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaSummary {
    pub student_id: String,
    pub gpa: f64,
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn CourseStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Ledger { store }
    }

    pub fn create(&self, input: NewCourse) -> LedgerResult<CourseRecord> {
        let course = validate_new(input)?;
        let record = self.store.insert(course)?;
        tracing::info!(id = record.id, student_id = %record.student_id, "course created");
        Ok(record)
    }

    pub fn get(&self, id: i64) -> LedgerResult<CourseRecord> {
        self.store.get(id)?.ok_or(LedgerError::NotFound(id))
    }

    /// All courses for a student; empty when there are none
    pub fn list_by_student(&self, student_id: &str) -> LedgerResult<Vec<CourseRecord>> {
        Ok(self.store.list_by_student(student_id)?)
    }

    /// Apply the supplied fields. Unknown ids fail before validation runs.
    pub fn update(&self, id: i64, patch: CoursePatch) -> LedgerResult<CourseRecord> {
        if self.store.get(id)?.is_none() {
            return Err(LedgerError::NotFound(id));
        }
        let patch = validate_patch(patch)?;

        // Re-checked under the store's own lock; a concurrent delete wins.
        let record = self.store.update(id, &patch)?.ok_or(LedgerError::NotFound(id))?;
        tracing::info!(id, "course updated");
        Ok(record)
    }

    pub fn delete(&self, id: i64) -> LedgerResult<()> {
        if !self.store.remove(id)? {
            return Err(LedgerError::NotFound(id));
        }
        tracing::info!(id, "course deleted");
        Ok(())
    }

    /// GPA over a student's courses. No courses is an error, not 0.0.
    pub fn gpa(&self, student_id: &str) -> LedgerResult<GpaSummary> {
        let records = self.store.list_by_student(student_id)?;
        if records.is_empty() {
            return Err(LedgerError::NoCourses(student_id.to_string()));
        }

        Ok(GpaSummary {
            student_id: student_id.to_string(),
            gpa: compute_gpa(&records),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::grade::Grade;
    use crate::store::InMemoryStore;

    fn ledgers() -> Vec<Ledger> {
        vec![
            Ledger::new(Arc::new(InMemoryStore::new())),
            Ledger::new(Arc::new(SqliteStore::open_in_memory().unwrap())),
        ]
    }

    #[test]
    fn test_create_then_list_round_trip() {
        for ledger in ledgers() {
            let created = ledger
                .create(NewCourse::new("s1", "Algorithms", "A", 3.0))
                .unwrap();

            let listed = ledger.list_by_student("s1").unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0], created);
            assert_eq!(listed[0].student_id, "s1");
            assert_eq!(listed[0].course_name, "Algorithms");
            assert_eq!(listed[0].grade, Grade::A);
            assert_eq!(listed[0].credits, 3.0);

            let second = ledger.create(NewCourse::new("s1", "Algorithms", "A", 3.0)).unwrap();
            assert_ne!(second.id, created.id);
        }
    }

    #[test]
    fn test_gpa_scenario() {
        for ledger in ledgers() {
            ledger.create(NewCourse::new("s1", "Algorithms", "A", 3.0)).unwrap();
            ledger.create(NewCourse::new("s1", "History", "B-", 4.0)).unwrap();
            ledger.create(NewCourse::new("s2", "Chemistry", "F", 4.0)).unwrap();

            let summary = ledger.gpa("s1").unwrap();
            assert_eq!(
                summary,
                GpaSummary {
                    student_id: "s1".into(),
                    gpa: 3.26
                }
            );
            assert_eq!(ledger.gpa("s2").unwrap().gpa, 0.0);
        }
    }

    #[test]
    fn test_gpa_without_courses_is_not_zero() {
        for ledger in ledgers() {
            assert!(matches!(ledger.gpa("ghost"), Err(LedgerError::NoCourses(ref s)) if s == "ghost"));
            assert!(ledger.list_by_student("ghost").unwrap().is_empty());
        }
    }

    #[test]
    fn test_create_rejections() {
        for ledger in ledgers() {
            assert!(matches!(
                ledger.create(NewCourse::new("s1", "Algorithms", "A", 0.0)),
                Err(LedgerError::InvalidCredits(_))
            ));
            assert!(matches!(
                ledger.create(NewCourse::new("s1", "Algorithms", "A++", 3.0)),
                Err(LedgerError::InvalidGrade(_))
            ));
            assert!(matches!(
                ledger.create(NewCourse {
                    grade: None,
                    ..NewCourse::new("s1", "Algorithms", "A", 3.0)
                }),
                Err(LedgerError::MissingField("grade"))
            ));
            assert!(ledger.list_by_student("s1").unwrap().is_empty());
        }
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        for ledger in ledgers() {
            let created = ledger.create(NewCourse::new("s1", "Algorithms", "A", 3.0)).unwrap();
            let updated = ledger.update(created.id, CoursePatch::default()).unwrap();
            assert_eq!(updated, created);
            assert_eq!(ledger.get(created.id).unwrap(), created);
        }
    }

    #[test]
    fn test_partial_update() {
        for ledger in ledgers() {
            let created = ledger.create(NewCourse::new("s1", "Algorithms", "A", 3.0)).unwrap();
            let updated = ledger
                .update(
                    created.id,
                    CoursePatch {
                        grade: Some(Some("C+".into())),
                        ..Default::default()
                    },
                )
                .unwrap();

            assert_eq!(updated.id, created.id);
            assert_eq!(updated.grade, Grade::CPlus);
            assert_eq!(updated.course_name, "Algorithms");
            assert_eq!(updated.credits, 3.0);
            assert_eq!(ledger.gpa("s1").unwrap().gpa, 2.3);
        }
    }

    #[test]
    fn test_invalid_update_leaves_record_intact() {
        for ledger in ledgers() {
            let created = ledger.create(NewCourse::new("s1", "Algorithms", "A", 3.0)).unwrap();
            let result = ledger.update(
                created.id,
                CoursePatch {
                    course_name: Some("Renamed".into()),
                    credits: Some(Some(-2.0)),
                    grade: None,
                },
            );
            assert!(matches!(result, Err(LedgerError::InvalidCredits(_))));
            assert_eq!(ledger.get(created.id).unwrap(), created);
        }
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        for ledger in ledgers() {
            assert!(matches!(
                ledger.update(404, CoursePatch::default()),
                Err(LedgerError::NotFound(404))
            ));
            assert!(matches!(
                ledger.update(
                    404,
                    CoursePatch {
                        grade: Some(Some("A++".into())),
                        ..Default::default()
                    }
                ),
                Err(LedgerError::NotFound(404))
            ));
            assert!(matches!(ledger.delete(404), Err(LedgerError::NotFound(404))));
            assert!(matches!(ledger.get(404), Err(LedgerError::NotFound(404))));
        }
    }

    #[test]
    fn test_delete_is_permanent() {
        for ledger in ledgers() {
            let created = ledger.create(NewCourse::new("s1", "Algorithms", "A", 3.0)).unwrap();
            ledger.delete(created.id).unwrap();
            assert!(ledger.list_by_student("s1").unwrap().is_empty());
            assert!(matches!(ledger.delete(created.id), Err(LedgerError::NotFound(_))));
            assert!(matches!(ledger.gpa("s1"), Err(LedgerError::NoCourses(_))));
        }
    }
}
