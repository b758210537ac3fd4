//! Study materials and the rules deciding who may download them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Branch, CurrentUser, MaterialId, Semester, StoredFile, SubjectCode, UserId};

/// Validation errors for material fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialValidationError {
    /// Title was blank.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Paid materials need a positive price.
    #[error("paid materials require a price greater than zero")]
    MissingPrice,
    /// Drive-protected materials need a Google Drive link.
    #[error("drive-protected materials require a drive URL")]
    MissingDriveUrl,
    /// Free and paid materials need an uploaded file.
    #[error("a file is required for this access type")]
    MissingFile,
    /// Unknown kind or access type.
    #[error("unknown {field}: {value}")]
    Unknown {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

/// What sort of document a material is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Notes,
    Pyq,
    LabManual,
    Syllabus,
    Book,
    Other,
}

impl MaterialKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Pyq => "pyq",
            Self::LabManual => "lab_manual",
            Self::Syllabus => "syllabus",
            Self::Book => "book",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for MaterialKind {
    type Err = MaterialValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "notes" => Ok(Self::Notes),
            "pyq" => Ok(Self::Pyq),
            "lab_manual" => Ok(Self::LabManual),
            "syllabus" => Ok(Self::Syllabus),
            "book" => Ok(Self::Book),
            "other" => Ok(Self::Other),
            _ => Err(MaterialValidationError::Unknown {
                field: "kind",
                value: s.to_owned(),
            }),
        }
    }
}

/// How a material is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Anyone signed in may download.
    Free,
    /// Needs a purchase, an active subscription, or the admin role.
    Paid,
    /// Hosted on Google Drive; the link carries its own sharing rules.
    DriveProtected,
}

impl AccessType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
            Self::DriveProtected => "drive_protected",
        }
    }
}

impl std::str::FromStr for AccessType {
    type Err = MaterialValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            "drive_protected" | "drive" => Ok(Self::DriveProtected),
            _ => Err(MaterialValidationError::Unknown {
                field: "accessType",
                value: s.to_owned(),
            }),
        }
    }
}

/// Uploaded study material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: MaterialId,
    pub title: String,
    pub description: Option<String>,
    pub subject_code: SubjectCode,
    pub subject_name: Option<String>,
    pub branch: Branch,
    pub semester: Semester,
    pub kind: MaterialKind,
    pub file: Option<StoredFile>,
    pub access_type: AccessType,
    /// Price in paise; zero unless paid.
    pub price: u64,
    pub drive_url: Option<String>,
    pub downloads: u64,
    pub views: u64,
    pub tags: Vec<String>,
    pub uploaded_by: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Facts about the caller that can unlock paid materials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Entitlements {
    pub has_active_subscription: bool,
    pub purchased: bool,
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// Anonymous callers must sign in first.
    LoginRequired,
    /// Paid material not unlocked for this user.
    PaymentRequired,
}

impl Material {
    /// Decide whether `viewer` may download this material.
    ///
    /// # Examples
    /// ```
    /// # use digidiploma::domain::{AccessDecision, AccessType, Entitlements};
    /// # fn check(material: &digidiploma::domain::Material) {
    /// let decision = material.access_for(None, Entitlements::default());
    /// assert_eq!(decision, AccessDecision::LoginRequired);
    /// # }
    /// ```
    pub fn access_for(&self, viewer: Option<&CurrentUser>, entitlements: Entitlements) -> AccessDecision {
        let Some(viewer) = viewer else {
            return AccessDecision::LoginRequired;
        };
        match self.access_type {
            AccessType::Free | AccessType::DriveProtected => AccessDecision::Granted,
            AccessType::Paid
                if viewer.is_admin()
                    || entitlements.purchased
                    || entitlements.has_active_subscription =>
            {
                AccessDecision::Granted
            }
            AccessType::Paid => AccessDecision::PaymentRequired,
        }
    }

    /// Where a download should point the client.
    pub fn download_url(&self) -> Option<&str> {
        match self.access_type {
            AccessType::DriveProtected => self
                .drive_url
                .as_deref()
                .or_else(|| self.file.as_ref().map(|f| f.url.as_str())),
            AccessType::Free | AccessType::Paid => self.file.as_ref().map(|f| f.url.as_str()),
        }
    }
}

/// Metadata an admin supplies for a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialDraft {
    pub title: String,
    pub description: Option<String>,
    pub subject_code: SubjectCode,
    pub subject_name: Option<String>,
    pub branch: Branch,
    pub semester: Semester,
    pub kind: MaterialKind,
    pub access_type: AccessType,
    pub price: u64,
    pub drive_url: Option<String>,
    pub tags: Vec<String>,
}

impl MaterialDraft {
    /// Check cross-field rules. `has_file` says whether a file accompanies the
    /// draft or is already stored on the material being updated.
    pub fn validate(&self, has_file: bool) -> Result<(), MaterialValidationError> {
        if self.title.trim().is_empty() {
            return Err(MaterialValidationError::EmptyTitle);
        }
        match self.access_type {
            AccessType::Paid if self.price == 0 => Err(MaterialValidationError::MissingPrice),
            AccessType::DriveProtected
                if self.drive_url.as_deref().is_none_or(|u| u.trim().is_empty()) =>
            {
                Err(MaterialValidationError::MissingDriveUrl)
            }
            AccessType::Free | AccessType::Paid if !has_file => {
                Err(MaterialValidationError::MissingFile)
            }
            _ => Ok(()),
        }
    }

    /// Price as stored: zero unless the material is paid.
    pub fn effective_price(&self) -> u64 {
        if self.access_type == AccessType::Paid {
            self.price
        } else {
            0
        }
    }
}

/// Listing filter for materials. Only active materials are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialFilter {
    pub subject_code: Option<SubjectCode>,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub kind: Option<MaterialKind>,
    pub access_type: Option<AccessType>,
    /// Case-insensitive match on title, description, or tags.
    pub search: Option<String>,
}

impl MaterialFilter {
    /// In-process evaluation used by adapters without query support.
    pub fn matches(&self, material: &Material) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            material.title.to_lowercase().contains(&needle)
                || material
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
                || material.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        });
        material.is_active
            && self.subject_code.as_ref().is_none_or(|c| &material.subject_code == c)
            && self.branch.as_ref().is_none_or(|b| material.branch.matches(b))
            && self.semester.is_none_or(|s| material.semester == s)
            && self.kind.is_none_or(|k| material.kind == k)
            && self.access_type.is_none_or(|a| material.access_type == a)
            && search_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Email, UserRole};
    use rstest::{fixture, rstest};

    #[fixture]
    fn paid_material() -> Material {
        let now = Utc::now();
        Material {
            id: MaterialId::random(),
            title: "Data Structures PYQ".into(),
            description: None,
            subject_code: SubjectCode::new("22317").expect("code"),
            subject_name: Some("Data Structures".into()),
            branch: Branch::new("Computer Engineering").expect("branch"),
            semester: Semester::new(3).expect("semester"),
            kind: MaterialKind::Pyq,
            file: None,
            access_type: AccessType::Paid,
            price: 4900,
            drive_url: None,
            downloads: 0,
            views: 0,
            tags: vec!["dsa".into()],
            uploaded_by: UserId::random(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn viewer(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::random(),
            name: "Ada".into(),
            email: Email::new("ada@example.com").expect("email"),
            role,
            branch: None,
            semester: None,
        }
    }

    #[rstest]
    #[case(UserRole::Student, Entitlements::default(), AccessDecision::PaymentRequired)]
    #[case(UserRole::Student, Entitlements { purchased: true, has_active_subscription: false }, AccessDecision::Granted)]
    #[case(UserRole::Student, Entitlements { purchased: false, has_active_subscription: true }, AccessDecision::Granted)]
    #[case(UserRole::Admin, Entitlements::default(), AccessDecision::Granted)]
    fn paid_access_requires_entitlement(
        paid_material: Material,
        #[case] role: UserRole,
        #[case] entitlements: Entitlements,
        #[case] expected: AccessDecision,
    ) {
        let user = viewer(role);
        assert_eq!(paid_material.access_for(Some(&user), entitlements), expected);
    }

    #[rstest]
    fn anonymous_callers_must_log_in(paid_material: Material) {
        assert_eq!(
            paid_material.access_for(None, Entitlements::default()),
            AccessDecision::LoginRequired
        );
    }

    #[rstest]
    #[case(AccessType::Paid, 0, None, true, Err(MaterialValidationError::MissingPrice))]
    #[case(AccessType::DriveProtected, 0, None, false, Err(MaterialValidationError::MissingDriveUrl))]
    #[case(AccessType::DriveProtected, 0, Some("https://drive.google.com/x"), false, Ok(()))]
    #[case(AccessType::Free, 0, None, false, Err(MaterialValidationError::MissingFile))]
    #[case(AccessType::Free, 0, None, true, Ok(()))]
    fn draft_cross_field_rules(
        #[case] access_type: AccessType,
        #[case] price: u64,
        #[case] drive_url: Option<&str>,
        #[case] has_file: bool,
        #[case] expected: Result<(), MaterialValidationError>,
    ) {
        let draft = MaterialDraft {
            title: "Notes".into(),
            description: None,
            subject_code: SubjectCode::new("22317").expect("code"),
            subject_name: None,
            branch: Branch::new("IT").expect("branch"),
            semester: Semester::new(3).expect("semester"),
            kind: MaterialKind::Notes,
            access_type,
            price,
            drive_url: drive_url.map(str::to_owned),
            tags: Vec::new(),
        };
        assert_eq!(draft.validate(has_file), expected);
    }

    #[rstest]
    #[case("lab-manual", Some(MaterialKind::LabManual))]
    #[case("PYQ", Some(MaterialKind::Pyq))]
    #[case("video", None)]
    fn kind_parsing(#[case] raw: &str, #[case] expected: Option<MaterialKind>) {
        assert_eq!(raw.parse::<MaterialKind>().ok(), expected);
    }

    #[rstest]
    fn filter_matches_subject_code_and_search(paid_material: Material) {
        let filter = MaterialFilter {
            subject_code: SubjectCode::new("22317").ok(),
            search: Some("DSA".into()),
            ..MaterialFilter::default()
        };
        assert!(filter.matches(&paid_material));
        let other = MaterialFilter {
            subject_code: SubjectCode::new("22318").ok(),
            ..MaterialFilter::default()
        };
        assert!(!other.matches(&paid_material));
    }
}
