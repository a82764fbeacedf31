// Grade Policy - letter grade to grade points
// Standard U.S. 4.0 scale with +/- steps. Fixed at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// GRADE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    APlus,
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    CMinus,
    DPlus,
    D,
    F,
}

/// The grade-points table. Order is best to worst.
pub const GRADE_POINTS: [(Grade, f64); 12] = [
    (Grade::APlus, 4.0),
    (Grade::A, 4.0),
    (Grade::AMinus, 3.7),
    (Grade::BPlus, 3.3),
    (Grade::B, 3.0),
    (Grade::BMinus, 2.7),
    (Grade::CPlus, 2.3),
    (Grade::C, 2.0),
    (Grade::CMinus, 1.7),
    (Grade::DPlus, 1.3),
    (Grade::D, 1.0),
    (Grade::F, 0.0),
];

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Grade points for this grade
    pub fn points(&self) -> f64 {
        GRADE_POINTS
            .iter()
            .find(|(grade, _)| grade == self)
            .map(|(_, points)| *points)
            .unwrap_or(0.0)
    }

    /// All grades in the policy, best to worst
    pub fn all() -> impl Iterator<Item = Grade> {
        GRADE_POINTS.into_iter().map(|(grade, _)| grade)
    }
}

/// Look up the grade points for a letter grade.
///
/// Matching is exact: `"a"` and `" A"` are not grades.
pub fn points_for(grade: &str) -> Option<f64> {
    grade.parse::<Grade>().ok().map(|g| g.points())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGrade(pub String);

impl fmt::Display for UnknownGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown grade '{}'", self.0)
    }
}

impl std::error::Error for UnknownGrade {}

impl FromStr for Grade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::all()
            .find(|grade| grade.as_str() == s)
            .ok_or_else(|| UnknownGrade(s.to_string()))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
