// Validator - checks course input against the grade policy
// Pure functions, no side effects.

use crate::error::{LedgerError, LedgerResult};
use crate::grade::Grade;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Creation input. Fields are optional so a missing one is reported as
/// `MissingField` instead of a decode failure. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCourse {
    pub student_id: Option<String>,
    pub course_name: Option<String>,
    pub grade: Option<String>,
    pub credits: Option<f64>,
}

impl NewCourse {
    pub fn new(student_id: &str, course_name: &str, grade: &str, credits: f64) -> Self {
        NewCourse {
            student_id: Some(student_id.to_string()),
            course_name: Some(course_name.to_string()),
            grade: Some(grade.to_string()),
            credits: Some(credits),
        }
    }
}

/// Partial update. An absent field keeps the stored value.
///
/// `grade` and `credits` tell an explicit `null` (`Some(None)`) apart from an
/// absent key (`None`); a `null` is present and fails validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoursePatch {
    pub course_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub grade: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub credits: Option<Option<f64>>,
}

/// Only called when the key is present, so `null` becomes `Some(None)`
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A creation input that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCourse {
    pub student_id: String,
    pub course_name: String,
    pub grade: Grade,
    pub credits: f64,
}

/// A patch that passed validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidPatch {
    pub course_name: Option<String>,
    pub grade: Option<Grade>,
    pub credits: Option<f64>,
}

// ============================================================================
// RULES
// ============================================================================

pub fn validate_grade(grade: &str) -> LedgerResult<Grade> {
    grade
        .parse()
        .map_err(|_| LedgerError::InvalidGrade(grade.to_string()))
}

/// Credits must be strictly positive. NaN fails the comparison and is rejected.
pub fn validate_credits(credits: f64) -> LedgerResult<f64> {
    if credits > 0.0 {
        Ok(credits)
    } else {
        Err(LedgerError::InvalidCredits(credits.to_string()))
    }
}

/// Validate a creation input: presence first, then grade, then credits.
pub fn validate_new(input: NewCourse) -> LedgerResult<ValidCourse> {
    let NewCourse {
        student_id,
        course_name,
        grade,
        credits,
    } = input;

    let student_id = student_id.ok_or(LedgerError::MissingField("student_id"))?;
    let course_name = course_name.ok_or(LedgerError::MissingField("course_name"))?;
    let grade = grade.ok_or(LedgerError::MissingField("grade"))?;
    let credits = credits.ok_or(LedgerError::MissingField("credits"))?;

    Ok(ValidCourse {
        student_id,
        course_name,
        grade: validate_grade(&grade)?,
        credits: validate_credits(credits)?,
    })
}

/// Validate only the fields a patch supplies. A supplied `null` is invalid.
pub fn validate_patch(patch: CoursePatch) -> LedgerResult<ValidPatch> {
    let grade = match patch.grade {
        None => None,
        Some(None) => return Err(LedgerError::InvalidGrade("null".to_string())),
        Some(Some(grade)) => Some(validate_grade(&grade)?),
    };
    let credits = match patch.credits {
        None => None,
        Some(None) => return Err(LedgerError::InvalidCredits("null".to_string())),
        Some(Some(credits)) => Some(validate_credits(credits)?),
    };

    Ok(ValidPatch {
        grade,
        credits,
        course_name: patch.course_name,
    })
}
