//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: every HTTP endpoint under `/api` plus the health probes
//! - **Schemas**: request/response DTOs and the domain error wrappers
//!   ([`ErrorSchema`], [`ErrorCodeSchema`], [`PageSchema`])
//! - **Security**: bearer JWT authentication scheme
//!
//! The generated document is served by Swagger UI in debug builds.

use crate::inbound::http::dto::{MessageResponse, PageSchema, StoredFileDto, UserDto};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::{
    analytics, contact, courses, health, internships, maintenance, materials, notices,
    notifications, payments, projects, subjects, subscriptions, users,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "Access token issued by POST /api/users/login or /api/users/register.",
                    ))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "DigiDiploma API",
        description = "Study materials, notices, payments, and student services for diploma engineering students."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("bearerAuth" = [])),
    paths(
        users::register,
        users::login,
        users::refresh_token,
        users::current_user,
        users::update_profile,
        users::upload_avatar,
        users::add_device_token,
        users::change_password,
        users::forgot_password,
        users::reset_password,
        users::list_users,
        users::set_user_status,
        users::set_user_role,
        users::delete_user,
        subjects::list_subjects,
        subjects::get_subject,
        subjects::create_subject,
        subjects::update_subject,
        subjects::disable_subject,
        materials::list_materials,
        materials::list_by_subject,
        materials::proxy_file,
        materials::get_material,
        materials::download_material,
        materials::create_material,
        materials::update_material,
        materials::delete_material,
        notices::list_notices,
        notices::get_notice,
        notices::create_notice,
        notices::update_notice,
        notices::delete_notice,
        notices::list_announcements,
        notices::create_announcement,
        notices::delete_announcement,
        payments::payment_config,
        payments::create_order,
        payments::create_payment_link,
        payments::verify_payment,
        payments::payment_webhook,
        payments::list_orders,
        payments::get_order,
        payments::refund_order,
        subscriptions::my_subscription,
        subscriptions::cancel_subscription,
        subscriptions::list_subscriptions,
        projects::submit_project,
        projects::my_projects,
        projects::list_projects,
        projects::review_project,
        projects::delete_project,
        internships::apply_internship,
        internships::my_internships,
        internships::list_internships,
        internships::set_internship_status,
        courses::list_courses,
        courses::get_course,
        courses::create_course,
        courses::update_course,
        courses::delete_course,
        courses::enroll_course,
        analytics::overview,
        analytics::audit_logs,
        analytics::dashboard,
        contact::submit_contact,
        contact::list_contact,
        contact::resolve_contact,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::publish_notification,
        maintenance::maintenance_status,
        maintenance::set_maintenance,
        health::ready,
        health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PageSchema,
        MessageResponse,
        StoredFileDto,
        UserDto,
    )),
    tags(
        (name = "users", description = "Accounts, authentication, and profiles"),
        (name = "subjects", description = "Subject catalogue per branch and semester"),
        (name = "materials", description = "Study materials and file downloads"),
        (name = "notices", description = "Notices and announcements"),
        (name = "payments", description = "Razorpay checkout, webhooks, and refunds"),
        (name = "subscriptions", description = "Subscription plans held by students"),
        (name = "projects", description = "Student project submissions"),
        (name = "internships", description = "Internship applications"),
        (name = "courses", description = "Courses and enrolment"),
        (name = "analytics", description = "Admin analytics, audit trail, and the student dashboard"),
        (name = "contact", description = "Contact form messages"),
        (name = "notifications", description = "In-app notifications"),
        (name = "maintenance", description = "Maintenance mode switch"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated document.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_has_wire_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "error");
        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[rstest]
    fn registers_bearer_security_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.as_ref().expect("components");
        assert!(components.security_schemes.contains_key("bearerAuth"));
    }

    #[rstest]
    #[case("/api/users/login")]
    #[case("/api/materials/subject/{code}")]
    #[case("/api/payments/webhook")]
    #[case("/api/notifications/unread-count")]
    #[case("/api/maintenance/status")]
    #[case("/health/ready")]
    fn documents_paths(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(
            doc.paths.paths.contains_key(path),
            "missing path {path}"
        );
    }
}
