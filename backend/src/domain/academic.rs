//! Academic placement primitives shared by users, subjects, and materials.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest semester of a diploma programme.
pub const SEMESTER_MIN: u8 = 1;
/// Highest semester of a diploma programme.
pub const SEMESTER_MAX: u8 = 6;
/// Longest accepted branch name.
pub const BRANCH_MAX: usize = 100;

/// Validation failures for branch and semester values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcademicValidationError {
    /// Branch was blank.
    #[error("branch must not be empty")]
    EmptyBranch,
    /// Branch exceeded [`BRANCH_MAX`] characters.
    #[error("branch must be at most {max} characters")]
    BranchTooLong {
        /// Allowed maximum.
        max: usize,
    },
    /// Semester outside the programme range.
    #[error("semester must be between {min} and {max}")]
    SemesterOutOfRange {
        /// Lowest allowed semester.
        min: u8,
        /// Highest allowed semester.
        max: u8,
    },
}

/// Engineering branch such as "Computer Engineering".
///
/// Stored trimmed; comparisons are case-insensitive through [`Branch::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Branch(String);

impl Branch {
    /// Validate and construct a branch.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AcademicValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AcademicValidationError::EmptyBranch);
        }
        if trimmed.chars().count() > BRANCH_MAX {
            return Err(AcademicValidationError::BranchTooLong { max: BRANCH_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Case-insensitive equality, as the SPA sends mixed casing.
    pub fn matches(&self, other: &Branch) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl AsRef<str> for Branch {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Branch> for String {
    fn from(value: Branch) -> Self {
        value.0
    }
}

impl TryFrom<String> for Branch {
    type Error = AcademicValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Semester number within the programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Semester(u8);

impl Semester {
    /// Validate and construct a semester.
    pub fn new(value: u8) -> Result<Self, AcademicValidationError> {
        if (SEMESTER_MIN..=SEMESTER_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AcademicValidationError::SemesterOutOfRange {
                min: SEMESTER_MIN,
                max: SEMESTER_MAX,
            })
        }
    }

    /// Numeric value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<Semester> for u8 {
    fn from(value: Semester) -> Self {
        value.0
    }
}

impl TryFrom<u8> for Semester {
    type Error = AcademicValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(6, true)]
    #[case(7, false)]
    fn semester_range(#[case] value: u8, #[case] ok: bool) {
        assert_eq!(Semester::new(value).is_ok(), ok);
    }

    #[rstest]
    fn branch_is_trimmed_and_matches_case_insensitively() {
        let a = Branch::new("  Computer Engineering ").expect("valid");
        let b = Branch::new("computer engineering").expect("valid");
        assert_eq!(a.as_ref(), "Computer Engineering");
        assert!(a.matches(&b));
    }

    #[rstest]
    fn blank_branch_is_rejected() {
        assert_eq!(Branch::new("   "), Err(AcademicValidationError::EmptyBranch));
    }
}
