//! Subjects taught per branch and semester.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Branch, Semester, SubjectId};

/// Longest accepted subject code.
pub const SUBJECT_CODE_MAX: usize = 20;

/// Validation errors for subject fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectValidationError {
    /// Code was blank or contained unsupported characters.
    #[error("subject code must be 1-{SUBJECT_CODE_MAX} letters, digits, or dashes")]
    InvalidCode,
    /// Name was blank.
    #[error("subject name must not be empty")]
    EmptyName,
    /// Credits outside 0..=20.
    #[error("credits must be between 0 and 20")]
    InvalidCredits,
}

/// Upper-cased subject code such as `CO3I`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectCode(String);

impl SubjectCode {
    /// Validate and upper-case a code.
    ///
    /// # Examples
    /// ```
    /// use digidiploma::domain::SubjectCode;
    ///
    /// assert_eq!(SubjectCode::new(" co3i ").unwrap().as_ref(), "CO3I");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, SubjectValidationError> {
        let code = raw.as_ref().trim().to_ascii_uppercase();
        let valid = !code.is_empty()
            && code.len() <= SUBJECT_CODE_MAX
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(code))
        } else {
            Err(SubjectValidationError::InvalidCode)
        }
    }
}

impl AsRef<str> for SubjectCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SubjectCode> for String {
    fn from(value: SubjectCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for SubjectCode {
    type Error = SubjectValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A subject in the curriculum. `(code, branch)` is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: SubjectId,
    pub code: SubjectCode,
    pub name: String,
    pub branch: Branch,
    pub semester: Semester,
    pub credits: u8,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields an admin supplies when creating or replacing a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub code: SubjectCode,
    pub name: String,
    pub branch: Branch,
    pub semester: Semester,
    pub credits: u8,
    pub description: Option<String>,
}

impl SubjectDraft {
    /// Validate free-form fields not covered by the newtypes.
    pub fn validate(&self) -> Result<(), SubjectValidationError> {
        if self.name.trim().is_empty() {
            return Err(SubjectValidationError::EmptyName);
        }
        if self.credits > 20 {
            return Err(SubjectValidationError::InvalidCredits);
        }
        Ok(())
    }
}

/// Public subject listing filter. Only active subjects are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFilter {
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
}

impl SubjectFilter {
    /// In-process evaluation used by adapters without query support.
    pub fn matches(&self, subject: &Subject) -> bool {
        subject.is_active
            && self.branch.as_ref().is_none_or(|b| subject.branch.matches(b))
            && self.semester.is_none_or(|s| subject.semester == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("co3i", Some("CO3I"))]
    #[case(" 22412 ", Some("22412"))]
    #[case("", None)]
    #[case("bad code", None)]
    #[case("A-VERY-LONG-SUBJECT-CODE", None)]
    fn subject_code_normalisation(#[case] raw: &str, #[case] expected: Option<&str>) {
        let code = SubjectCode::new(raw).ok();
        assert_eq!(code.as_ref().map(AsRef::as_ref), expected);
    }
}
