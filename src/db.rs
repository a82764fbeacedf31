use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::StorageLocation;
use crate::store::{CourseRecord, CourseStore};
use crate::validation::{ValidCourse, ValidPatch};

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Audit entry for one change to a course ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CourseEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub course_id: i64,
    pub data: serde_json::Value,
    pub actor: String,
}

impl CourseEvent {
    pub fn new(event_type: &str, course_id: i64, data: serde_json::Value, actor: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            course_id,
            data,
            actor: actor.to_string(),
        }
    }

    fn for_record(event_type: &str, record: &CourseRecord) -> Result<Self> {
        let data = serde_json::to_value(record)?;
        Ok(Self::new(event_type, record.id, data, "ledger"))
    }
}

// ============================================================================
// SCHEMA MIGRATIONS
// ============================================================================

/// Ordered migrations. `PRAGMA user_version` holds how many have run.
const MIGRATIONS: &[&str] = &[
    // 1: course records
    "CREATE TABLE IF NOT EXISTS courses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id TEXT NOT NULL,
        course_name TEXT NOT NULL,
        grade TEXT NOT NULL,
        credits REAL NOT NULL CHECK (credits > 0)
    );
    CREATE INDEX IF NOT EXISTS idx_courses_student ON courses(student_id);",
    // 2: audit trail
    "CREATE TABLE IF NOT EXISTS course_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id TEXT UNIQUE NOT NULL,
        timestamp TEXT NOT NULL,
        event_type TEXT NOT NULL,
        course_id INTEGER NOT NULL,
        data TEXT NOT NULL,
        actor TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_course_events_course ON course_events(course_id);",
];

pub fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version as usize)
}

/// Bring the schema up to date. Safe to run on every start.
pub fn setup_database(conn: &mut Connection) -> Result<()> {
    // WAL is a no-op (reports "memory") for in-memory databases
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let current = schema_version(conn)?;
    if current > MIGRATIONS.len() {
        return Err(anyhow!(
            "database schema version {} is newer than this build ({})",
            current,
            MIGRATIONS.len()
        ));
    }

    let tx = conn.transaction()?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        tx.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration {}", index + 1))?;
        tracing::info!(migration = index + 1, "applied schema migration");
    }
    tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)?;
    tx.commit()?;

    Ok(())
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// Durable store backed by a single SQLite connection.
///
/// The connection mutex serialises every operation; each one commits in its
/// own transaction together with its audit event.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(location: &StorageLocation) -> Result<Self> {
        let conn = match location {
            StorageLocation::Memory => Connection::open_in_memory()?,
            StorageLocation::File(path) => open_file(path)?,
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StorageLocation::Memory)
    }

    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        setup_database(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Audit trail for a course, newest first
    pub fn events_for_course(&self, course_id: i64) -> Result<Vec<CourseEvent>> {
        let conn = self.lock()?;
        get_events_for_course(&conn, course_id)
    }
}

fn open_file(path: &Path) -> Result<Connection> {
    Connection::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CourseRecord> {
    let grade: String = row.get(3)?;
    Ok(CourseRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_name: row.get(2)?,
        grade: grade.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        credits: row.get(4)?,
    })
}

fn select_course(conn: &Connection, id: i64) -> Result<Option<CourseRecord>> {
    let record = conn
        .query_row(
            "SELECT id, student_id, course_name, grade, credits FROM courses WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

/// Insert event into audit trail
fn insert_event(tx: &Transaction<'_>, event: &CourseEvent) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    tx.execute(
        "INSERT INTO course_events (
            event_id, timestamp, event_type, course_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.course_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

fn get_events_for_course(conn: &Connection, course_id: i64) -> Result<Vec<CourseEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, course_id, data, actor
         FROM course_events
         WHERE course_id = ?1
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![course_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(4)?;

            Ok(CourseEvent {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                course_id: row.get(3)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                actor: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

impl CourseStore for SqliteStore {
    fn insert(&self, course: ValidCourse) -> Result<CourseRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO courses (student_id, course_name, grade, credits)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                course.student_id,
                course.course_name,
                course.grade.as_str(),
                course.credits,
            ],
        )
        .context("Failed to insert course")?;

        let record = CourseRecord::from_valid(tx.last_insert_rowid(), course);
        insert_event(&tx, &CourseEvent::for_record("course_created", &record)?)?;
        tx.commit()?;

        Ok(record)
    }

    fn get(&self, id: i64) -> Result<Option<CourseRecord>> {
        let conn = self.lock()?;
        select_course(&conn, id)
    }

    fn list_by_student(&self, student_id: &str) -> Result<Vec<CourseRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, student_id, course_name, grade, credits
             FROM courses
             WHERE student_id = ?1
             ORDER BY id ASC",
        )?;

        let records = stmt
            .query_map(params![student_id], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn update(&self, id: i64, patch: &ValidPatch) -> Result<Option<CourseRecord>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(mut record) = select_course(&tx, id)? else {
            return Ok(None);
        };
        record.apply(patch);

        tx.execute(
            "UPDATE courses SET course_name = ?1, grade = ?2, credits = ?3 WHERE id = ?4",
            params![record.course_name, record.grade.as_str(), record.credits, id],
        )
        .context("Failed to update course")?;

        insert_event(&tx, &CourseEvent::for_record("course_updated", &record)?)?;
        tx.commit()?;

        Ok(Some(record))
    }

    fn remove(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(record) = select_course(&tx, id)? else {
            return Ok(false);
        };

        tx.execute("DELETE FROM courses WHERE id = ?1", params![id])
            .context("Failed to delete course")?;
        insert_event(&tx, &CourseEvent::for_record("course_deleted", &record)?)?;
        tx.commit()?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::Grade;
    use crate::store::tests::{course, exercise_store};

    #[test]
    fn test_sqlite_store_behaviour() {
        let store = SqliteStore::open_in_memory().unwrap();
        exercise_store(&store);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&mut conn).unwrap();
        setup_database(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), MIGRATIONS.len());
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
        assert!(setup_database(&mut conn).is_err());
    }

    #[test]
    fn test_partial_migration_resumes() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        let store = SqliteStore::from_connection(conn).unwrap();
        let record = store.insert(course("s1", "Algorithms", Grade::A, 3.0)).unwrap();
        assert_eq!(store.events_for_course(record.id).unwrap().len(), 1);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let location = StorageLocation::File(dir.path().join("gpa.db"));

        let created = {
            let store = SqliteStore::open(&location).unwrap();
            store.insert(course("s1", "Algorithms", Grade::A, 3.0)).unwrap()
        };

        let store = SqliteStore::open(&location).unwrap();
        assert_eq!(store.list_by_student("s1").unwrap(), vec![created]);
    }

    #[test]
    fn test_event_log() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = store.insert(course("s1", "History", Grade::B, 4.0)).unwrap();

        let patch = ValidPatch {
            credits: Some(3.0),
            ..Default::default()
        };
        store.update(record.id, &patch).unwrap();
        store.remove(record.id).unwrap();

        let events = store.events_for_course(record.id).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["course_deleted", "course_updated", "course_created"]);
        assert_eq!(events[1].data["credits"], serde_json::json!(3.0));
        assert_eq!(events[2].data["grade"], serde_json::json!("B"));
        assert!(events.iter().all(|e| e.actor == "ledger"));
    }

    #[test]
    fn test_missing_ids_write_no_events() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.update(42, &ValidPatch::default()).unwrap().is_none());
        assert!(!store.remove(42).unwrap());
        assert!(store.events_for_course(42).unwrap().is_empty());
    }

    #[test]
    fn test_credits_check_constraint() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO courses (student_id, course_name, grade, credits) VALUES ('s1', 'X', 'A', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
