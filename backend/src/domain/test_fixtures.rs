//! Shared fixtures for domain unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::{
    AccessType, Branch, CurrentUser, Email, Material, MaterialId, MaterialKind, PasswordHash,
    Semester, SubjectCode, User, UserId, UserRole,
};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    clock_at(fixture_timestamp())
}

pub(crate) fn clock_at(utc_now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixtureClock { utc_now })
}

pub(crate) fn user(role: UserRole) -> User {
    let now = fixture_timestamp();
    User {
        id: UserId::random(),
        name: "Asha Patil".into(),
        email: Email::new("asha@example.in").expect("email"),
        password_hash: PasswordHash::new("$argon2id$fixture"),
        role,
        branch: Some(Branch::new("Computer Engineering").expect("branch")),
        semester: Some(Semester::new(3).expect("semester")),
        phone: None,
        college: None,
        enrollment_number: None,
        avatar_url: None,
        is_active: true,
        device_tokens: Vec::new(),
        password_reset: None,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn current(role: UserRole) -> CurrentUser {
    CurrentUser::from(&user(role))
}

pub(crate) fn material(access_type: AccessType) -> Material {
    let now = fixture_timestamp();
    Material {
        id: MaterialId::random(),
        title: "Data Structures notes".into(),
        description: None,
        subject_code: SubjectCode::new("CS301").expect("code"),
        subject_name: Some("Data Structures".into()),
        branch: Branch::new("Computer Engineering").expect("branch"),
        semester: Semester::new(3).expect("semester"),
        kind: MaterialKind::Notes,
        file: None,
        access_type,
        price: if access_type == AccessType::Paid { 4_900 } else { 0 },
        drive_url: (access_type == AccessType::DriveProtected)
            .then(|| "https://drive.google.com/file/d/abc".to_owned()),
        downloads: 0,
        views: 0,
        tags: Vec::new(),
        uploaded_by: UserId::random(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
