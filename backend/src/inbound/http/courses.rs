//! Course catalogue and enrolment endpoints.
//!
//! ```text
//! GET    /api/courses?branch=
//! GET    /api/courses/{id}
//! POST   /api/courses               admin
//! PUT    /api/courses/{id}          admin
//! DELETE /api/courses/{id}          admin
//! POST   /api/courses/{id}/enroll   402 until a paid course is purchased
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{Course, CourseDraft, CourseId, CourseValidationError, CurrentUser, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser, OptionalUser};
use crate::inbound::http::dto::MessageResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_field, parse_branch, parse_id};

/// Course as returned to clients.
///
/// The enrolled student list stays private; callers see a count and,
/// when signed in, whether they are enrolled.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub branch: Option<String>,
    pub instructor: Option<String>,
    pub duration: Option<String>,
    /// Price in paise; zero means free.
    pub price: u64,
    pub thumbnail_url: Option<String>,
    pub enrolled_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enrolled: Option<bool>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseDto {
    fn for_viewer(course: Course, viewer: Option<&CurrentUser>) -> Self {
        let is_enrolled = viewer.map(|user| course.has_student(&user.id));
        Self {
            id: course.id.to_string(),
            enrolled_count: course.enrolled_students.len(),
            is_enrolled,
            title: course.title,
            description: course.description,
            branch: course.branch.map(|b| b.to_string()),
            instructor: course.instructor,
            duration: course.duration,
            price: course.price,
            thumbnail_url: course.thumbnail_url,
            is_active: course.is_active,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

impl From<Course> for CourseDto {
    fn from(course: Course) -> Self {
        Self::for_viewer(course, None)
    }
}

/// Body for creating or replacing a course.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub title: String,
    pub description: String,
    pub branch: Option<String>,
    pub instructor: Option<String>,
    pub duration: Option<String>,
    /// Price in paise.
    #[serde(default)]
    pub price: u64,
    pub thumbnail_url: Option<String>,
}

impl CourseRequest {
    fn into_draft(self) -> Result<CourseDraft, Error> {
        let draft = CourseDraft {
            branch: parse_branch(self.branch.as_deref(), FieldName::new("branch"))?,
            instructor: optional_text(self.instructor.as_deref()),
            duration: optional_text(self.duration.as_deref()),
            thumbnail_url: optional_text(self.thumbnail_url.as_deref()),
            title: self.title,
            description: self.description,
            price: self.price,
        };
        draft.validate().map_err(|err| {
            let field = match err {
                CourseValidationError::EmptyTitle => "title",
                CourseValidationError::EmptyDescription => "description",
            };
            invalid_field(FieldName::new(field), err)
        })?;
        Ok(draft)
    }
}

/// `?branch=` filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseListQuery {
    pub branch: Option<String>,
}

fn course_id(raw: &str) -> Result<CourseId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Active courses, optionally for one branch.
#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseListQuery),
    responses(
        (status = 200, description = "Courses", body = [CourseDto]),
        (status = 400, description = "Invalid filter", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "listCourses",
    security((), ("bearerAuth" = []))
)]
#[get("/courses")]
pub async fn list_courses(
    state: web::Data<HttpState>,
    viewer: OptionalUser,
    query: web::Query<CourseListQuery>,
) -> ApiResult<web::Json<Vec<CourseDto>>> {
    let branch = parse_branch(query.branch.as_deref(), FieldName::new("branch"))?;
    let courses = state.courses.list(branch).await?;
    Ok(web::Json(
        courses
            .into_iter()
            .map(|course| CourseDto::for_viewer(course, viewer.as_ref()))
            .collect(),
    ))
}

/// One course.
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseDto),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "getCourse",
    security((), ("bearerAuth" = []))
)]
#[get("/courses/{id}")]
pub async fn get_course(
    state: web::Data<HttpState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseDto>> {
    let id = course_id(&path)?;
    let course = state.courses.get(viewer.as_ref(), &id).await?;
    Ok(web::Json(CourseDto::for_viewer(course, viewer.as_ref())))
}

/// Create a course.
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Created", body = CourseDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "createCourse"
)]
#[post("/courses")]
pub async fn create_course(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    payload: web::Json<CourseRequest>,
) -> ApiResult<HttpResponse> {
    let draft = payload.into_inner().into_draft()?;
    let course = state.courses.create(draft).await?;
    Ok(HttpResponse::Created().json(CourseDto::from(course)))
}

/// Replace a course's fields.
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Updated", body = CourseDto),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "updateCourse"
)]
#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    path: web::Path<String>,
    payload: web::Json<CourseRequest>,
) -> ApiResult<web::Json<CourseDto>> {
    let id = course_id(&path)?;
    let draft = payload.into_inner().into_draft()?;
    let course = state.courses.update(&id, draft).await?;
    Ok(web::Json(course.into()))
}

/// Remove a course.
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "deleteCourse"
)]
#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = course_id(&path)?;
    state.courses.delete(&id).await?;
    Ok(web::Json(MessageResponse::new("Course deleted")))
}

/// Enrol the caller.
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enroll",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled", body = CourseDto),
        (status = 402, description = "Course must be purchased first", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "enrollCourse"
)]
#[post("/courses/{id}/enroll")]
pub async fn enroll_course(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseDto>> {
    let id = course_id(&path)?;
    let course = state.courses.enroll(&user, &id).await?;
    Ok(web::Json(CourseDto::for_viewer(course, Some(&user.0))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    fn request(title: &str, price: u64) -> CourseRequest {
        CourseRequest {
            title: title.into(),
            description: "Hands-on sessions".into(),
            branch: Some("Computer Engineering".into()),
            instructor: Some("Prof. Kulkarni".into()),
            duration: Some("6 weeks".into()),
            price,
            thumbnail_url: None,
        }
    }

    #[actix_web::test]
    async fn free_course_enrolment_is_idempotent() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/courses")
            .insert_header(harness.bearer(&admin))
            .set_json(request("Rust basics", 0))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        let id = created["id"].as_str().expect("id").to_owned();

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri(&format!("/api/courses/{id}/enroll"))
                .insert_header(harness.bearer(&student))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["enrolledCount"], 1);
            assert_eq!(body["isEnrolled"], true);
        }

        let req = test::TestRequest::get().uri("/api/courses").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed[0]["title"], "Rust basics");
        assert!(listed[0].get("isEnrolled").is_none());
    }

    #[actix_web::test]
    async fn paid_course_requires_purchase() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/courses")
            .insert_header(harness.bearer(&admin))
            .set_json(request("Embedded C", 49_900))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().expect("id");

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{id}/enroll"))
            .insert_header(harness.bearer(&student))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["price"], 49_900);
    }

    #[actix_web::test]
    async fn blank_title_is_reported_and_delete_is_admin_only() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/courses")
            .insert_header(harness.bearer(&admin))
            .set_json(request("  ", 0))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "title");

        let req = test::TestRequest::delete()
            .uri("/api/courses/65f1c0ffee0123456789abcd")
            .insert_header(harness.bearer(&student))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
    }
}
