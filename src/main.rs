use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use gpa_ledger::config::DEFAULT_DATABASE_URL;
use gpa_ledger::{
    import_csv, telemetry, Config, Ledger, LedgerError, SqliteStore, StorageLocation,
};

#[derive(Parser)]
#[command(name = "gpa-ledger", version, about = "Course records and GPA from the command line")]
struct Cli {
    /// Storage location, e.g. sqlite:///gpa.db
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import courses from a CSV file (student_id,course_name,grade,credits)
    Import { csv: PathBuf },
    /// List a student's courses
    List { student_id: String },
    /// Show a student's GPA
    Gpa { student_id: String },
    /// Show the change history of one course
    History { course_id: i64 },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init(Config::from_env().log_json);

    let store = Arc::new(SqliteStore::open(&StorageLocation::parse(&cli.database))?);
    let ledger = Ledger::new(store.clone());

    match cli.command {
        Command::Import { csv } => run_import(&ledger, &csv),
        Command::List { student_id } => run_list(&ledger, &student_id),
        Command::Gpa { student_id } => run_gpa(&ledger, &student_id),
        Command::History { course_id } => run_history(&store, course_id),
    }
}

fn run_import(ledger: &Ledger, csv: &Path) -> Result<ExitCode> {
    println!("📂 Importing courses from {}", csv.display());

    let report = import_csv(ledger, csv)?;

    println!("✓ Processed: {} rows", report.total());
    println!("✓ Imported: {} courses", report.imported);
    println!("✓ Rejected: {} rows", report.rejected.len());
    for rejected in &report.rejected {
        println!("   line {}: {}", rejected.line, rejected.error);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_list(ledger: &Ledger, student_id: &str) -> Result<ExitCode> {
    let courses = ledger.list_by_student(student_id)?;

    println!("📚 Courses for {} ({})", student_id, courses.len());
    for course in &courses {
        println!(
            "   #{:<5} {:<30} {:<3} {:>5.1} credits",
            course.id,
            course.course_name,
            course.grade.as_str(),
            course.credits
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn run_gpa(ledger: &Ledger, student_id: &str) -> Result<ExitCode> {
    match ledger.gpa(student_id) {
        Ok(summary) => {
            println!("🎓 GPA for {}: {:.2}", summary.student_id, summary.gpa);
            Ok(ExitCode::SUCCESS)
        }
        Err(LedgerError::NoCourses(_)) => {
            eprintln!("❌ No courses found for student {}", student_id);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_history(store: &SqliteStore, course_id: i64) -> Result<ExitCode> {
    let events = store.events_for_course(course_id)?;
    if events.is_empty() {
        eprintln!("❌ No history for course {}", course_id);
        return Ok(ExitCode::FAILURE);
    }

    println!("🕓 History for course {}", course_id);
    for event in &events {
        println!(
            "   {}  {:<15} {}",
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.data
        );
    }

    Ok(ExitCode::SUCCESS)
}
