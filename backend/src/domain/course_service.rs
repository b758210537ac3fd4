//! Course catalogue and enrolment.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{CourseRepository, PaymentRepository};
use crate::domain::{
    AuditAction, AuditEntry, AuditRecorder, Branch, Course, CourseDraft, CourseId, CurrentUser,
    Error, PaymentPurpose,
};

/// Course service.
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    payments: Arc<dyn PaymentRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        payments: Arc<dyn PaymentRepository>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            courses,
            payments,
            audit,
            clock,
        }
    }

    pub async fn list(&self, branch: Option<Branch>) -> Result<Vec<Course>, Error> {
        Ok(self.courses.list_active(branch).await?)
    }

    /// Active course by id; inactive ones are hidden from non-admins.
    pub async fn get(&self, viewer: Option<&CurrentUser>, id: &CourseId) -> Result<Course, Error> {
        let course = self.find(id).await?;
        if !course.is_active && !viewer.is_some_and(CurrentUser::is_admin) {
            return Err(not_found());
        }
        Ok(course)
    }

    pub async fn create(&self, draft: CourseDraft) -> Result<Course, Error> {
        draft
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let now = self.clock.utc();
        let course = Course {
            id: CourseId::random(),
            title: draft.title.trim().to_owned(),
            description: draft.description.trim().to_owned(),
            branch: draft.branch,
            instructor: draft.instructor,
            duration: draft.duration,
            price: draft.price,
            thumbnail_url: draft.thumbnail_url,
            enrolled_students: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.courses.insert(&course).await?;
        info!(course_id = %course.id, "course created");
        Ok(course)
    }

    pub async fn update(&self, id: &CourseId, draft: CourseDraft) -> Result<Course, Error> {
        draft
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let mut course = self.find(id).await?;
        course.title = draft.title.trim().to_owned();
        course.description = draft.description.trim().to_owned();
        course.branch = draft.branch;
        course.instructor = draft.instructor;
        course.duration = draft.duration;
        course.price = draft.price;
        course.thumbnail_url = draft.thumbnail_url;
        course.updated_at = self.clock.utc();
        self.courses.update(&course).await?;
        Ok(course)
    }

    pub async fn delete(&self, id: &CourseId) -> Result<(), Error> {
        if self.courses.delete(id).await? {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    /// Enrol the caller. Paid courses need a settled order first (402).
    ///
    /// Enrolling twice is a no-op that returns the course.
    pub async fn enroll(&self, user: &CurrentUser, id: &CourseId) -> Result<Course, Error> {
        let mut course = self.get(Some(user), id).await?;
        if course.has_student(&user.id) {
            return Ok(course);
        }
        if !course.is_free()
            && !self
                .payments
                .has_paid_for(&user.id, &PaymentPurpose::Course { id: id.clone() })
                .await?
        {
            return Err(Error::payment_required("Purchase this course to enrol")
                .with_details(json!({ "courseId": id, "price": course.price })));
        }
        self.courses.add_student(id, &user.id).await?;
        course.enrolled_students.push(user.id.clone());
        self.audit
            .record(AuditEntry::new(AuditAction::CourseEnrolled, Some(&user.id)).target(id))
            .await;
        Ok(course)
    }

    async fn find(&self, id: &CourseId) -> Result<Course, Error> {
        self.courses.find_by_id(id).await?.ok_or_else(not_found)
    }
}

fn not_found() -> Error {
    Error::not_found("Course not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockAuditLogRepository, MockCourseRepository, MockPaymentRepository};
    use crate::domain::test_fixtures::{current, fixture_clock, fixture_timestamp};
    use crate::domain::{ErrorCode, UserRole};
    use rstest::rstest;

    fn course(price: u64) -> Course {
        let now = fixture_timestamp();
        Course {
            id: CourseId::random(),
            title: "Full-stack bootcamp".into(),
            description: "Eight weeks of projects".into(),
            branch: None,
            instructor: None,
            duration: Some("8 weeks".into()),
            price,
            thumbnail_url: None,
            enrolled_students: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(courses: MockCourseRepository, payments: MockPaymentRepository) -> CourseService {
        let mut audit = MockAuditLogRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        CourseService::new(
            Arc::new(courses),
            Arc::new(payments),
            AuditRecorder::new(Arc::new(audit), fixture_clock()),
            fixture_clock(),
        )
    }

    #[rstest]
    #[case::free(0, false, None)]
    #[case::paid_and_bought(49_900, true, None)]
    #[case::paid_not_bought(49_900, false, Some(ErrorCode::PaymentRequired))]
    #[tokio::test]
    async fn enrolment_requires_payment_for_paid_courses(
        #[case] price: u64,
        #[case] paid: bool,
        #[case] expected: Option<ErrorCode>,
    ) {
        let stored = course(price);
        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        courses
            .expect_add_student()
            .times(usize::from(expected.is_none()))
            .returning(|_, _| Ok(true));
        let mut payments = MockPaymentRepository::new();
        payments.expect_has_paid_for().returning(move |_, _| Ok(paid));

        let result = service(courses, payments)
            .enroll(&current(UserRole::Student), &CourseId::random())
            .await;
        assert_eq!(result.err().map(|e| e.code()), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn hides_inactive_courses_from_students() {
        let mut stored = course(0);
        stored.is_active = false;
        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let service = service(courses, MockPaymentRepository::new());

        let err = service
            .get(Some(&current(UserRole::Student)), &CourseId::random())
            .await
            .expect_err("hidden");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(service.get(Some(&current(UserRole::Admin)), &CourseId::random()).await.is_ok());
    }
}
