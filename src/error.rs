//! Ledger error model.

use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors surfaced by ledger operations.
///
/// Everything except `Storage` is a deterministic client error: retrying the
/// same input never succeeds.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid grade '{0}'")]
    InvalidGrade(String),

    /// Holds the offending value as sent, e.g. `0`, `-1.5` or `null`
    #[error("credits must be positive, got {0}")]
    InvalidCredits(String),

    #[error("course {0} not found")]
    NotFound(i64),

    #[error("no courses found for student '{0}'")]
    NoCourses(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::MissingField(_) => "missing_field",
            LedgerError::InvalidGrade(_) => "invalid_grade",
            LedgerError::InvalidCredits(_) => "invalid_credits",
            LedgerError::NotFound(_) | LedgerError::NoCourses(_) => "not_found",
            LedgerError::Storage(_) => "storage_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(LedgerError::MissingField("grade").code(), "missing_field");
        assert_eq!(LedgerError::InvalidGrade("A++".into()).code(), "invalid_grade");
        assert_eq!(LedgerError::InvalidCredits("0".into()).code(), "invalid_credits");
        assert_eq!(LedgerError::NotFound(7).code(), "not_found");
        assert_eq!(LedgerError::NoCourses("s1".into()).code(), "not_found");
    }

    #[test]
    fn test_storage_error_keeps_cause() {
        let err = LedgerError::from(anyhow::anyhow!("disk full"));
        assert_eq!(err.code(), "storage_error");
        assert!(err.to_string().contains("disk full"));
    }
}
