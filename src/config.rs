// Configuration - everything comes from the environment

use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///gpa.db";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Where course records live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    File(PathBuf),
}

impl StorageLocation {
    /// Parse a connection string.
    ///
    /// Accepts `sqlite:///relative.db`, `sqlite:////abs/path.db`,
    /// `sqlite://:memory:`, `:memory:` or a bare path.
    pub fn parse(url: &str) -> Self {
        let rest = url
            .strip_prefix("sqlite:///")
            .or_else(|| url.strip_prefix("sqlite://"))
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        match rest {
            ":memory:" | "" => StorageLocation::Memory,
            path => StorageLocation::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageLocation,
    pub addr: String,
    pub log_json: bool,
}

impl Config {
    /// Read `DATABASE_URL`, `GPA_LEDGER_ADDR` and `LOG_FORMAT`
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let addr = env::var("GPA_LEDGER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let log_json = wants_json_logs(env::var("LOG_FORMAT").ok().as_deref());

        Config {
            storage: StorageLocation::parse(&database_url),
            addr,
            log_json,
        }
    }
}

/// `LOG_FORMAT=json` (any case) selects JSON logs
pub fn wants_json_logs(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|format| format.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_location() {
        assert_eq!(
            StorageLocation::parse("sqlite:///gpa.db"),
            StorageLocation::File(PathBuf::from("gpa.db"))
        );
        assert_eq!(
            StorageLocation::parse("sqlite:////var/lib/gpa.db"),
            StorageLocation::File(PathBuf::from("/var/lib/gpa.db"))
        );
        assert_eq!(StorageLocation::parse("sqlite://:memory:"), StorageLocation::Memory);
        assert_eq!(StorageLocation::parse(":memory:"), StorageLocation::Memory);
        assert_eq!(
            StorageLocation::parse("data/courses.db"),
            StorageLocation::File(PathBuf::from("data/courses.db"))
        );
    }

    #[test]
    fn test_default_url_is_a_file() {
        assert_eq!(
            StorageLocation::parse(DEFAULT_DATABASE_URL),
            StorageLocation::File(PathBuf::from("gpa.db"))
        );
    }

    #[test]
    fn test_log_format() {
        assert!(wants_json_logs(Some("json")));
        assert!(wants_json_logs(Some("JSON")));
        assert!(!wants_json_logs(Some("pretty")));
        assert!(!wants_json_logs(None));
    }
}
