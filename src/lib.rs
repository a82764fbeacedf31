// GPA Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod gpa;
pub mod grade;
pub mod import;
pub mod ledger;
pub mod store;
pub mod telemetry;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{Config, StorageLocation};
pub use db::{setup_database, CourseEvent, SqliteStore};
pub use error::{LedgerError, LedgerResult};
pub use gpa::compute_gpa;
pub use grade::{points_for, Grade, GRADE_POINTS};
pub use import::{import_csv, ImportReport, RejectedRow};
pub use ledger::{GpaSummary, Ledger};
pub use store::{CourseRecord, CourseStore, InMemoryStore};
pub use validation::{CoursePatch, NewCourse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
