//! Public contact form and its admin inbox.
//!
//! ```text
//! POST  /api/contact                 public
//! GET   /api/contact?status=         admin
//! PATCH /api/contact/{id}/resolve    admin
//! ```

use actix_web::{HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{
    ContactDraft, ContactMessage, ContactMessageId, ContactStatus, ContactValidationError,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AdminUser;
use crate::inbound::http::dto::PageParamsQuery;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field, parse_email, parse_id, parse_optional_keyword, parse_page,
};

/// Contact message as shown to admins.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    #[schema(example = "new")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContactMessage> for ContactDto {
    fn from(message: ContactMessage) -> Self {
        Self {
            id: message.id.to_string(),
            name: message.name,
            email: message.email.to_string(),
            subject: message.subject,
            message: message.message,
            status: message.status.as_str().to_owned(),
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

/// Contact form body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    #[schema(example = "parent@example.in")]
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

/// `?status=` filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactListQuery {
    pub status: Option<String>,
}

/// Send a message to the administrators.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Received", body = ContactDto),
        (status = 400, description = "Invalid request", body = ErrorSchema)
    ),
    tags = ["contact"],
    operation_id = "submitContact",
    security([])
)]
#[post("/contact")]
pub async fn submit_contact(
    state: web::Data<HttpState>,
    payload: web::Json<ContactRequest>,
) -> ApiResult<HttpResponse> {
    let ContactRequest {
        name,
        email,
        subject,
        message,
    } = payload.into_inner();
    let draft = ContactDraft {
        email: parse_email(&email, FieldName::new("email"))?,
        subject: optional_text(subject.as_deref()),
        name,
        message,
    };
    draft.validate().map_err(|err| {
        let field = match err {
            ContactValidationError::EmptyName => "name",
            ContactValidationError::EmptyMessage | ContactValidationError::MessageTooLong => {
                "message"
            }
        };
        invalid_field(FieldName::new(field), err)
    })?;
    let stored = state.contact.submit(draft).await?;
    Ok(HttpResponse::Created().json(ContactDto::from(stored)))
}

/// Inbox, newest first.
#[utoipa::path(
    get,
    path = "/api/contact",
    params(ContactListQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Messages; items are ContactDto", body = crate::inbound::http::dto::PageSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["contact"],
    operation_id = "listContact"
)]
#[get("/contact")]
pub async fn list_contact(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    query: web::Query<ContactListQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let status: Option<ContactStatus> =
        parse_optional_keyword(query.status.as_deref(), FieldName::new("status"), "new, resolved")?;
    let page = parse_page(page.into_inner().into())?;
    let messages = state.contact.list(status, page).await?;
    Ok(HttpResponse::Ok().json(messages.map(ContactDto::from)))
}

/// Mark a message handled.
#[utoipa::path(
    patch,
    path = "/api/contact/{id}/resolve",
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Resolved", body = ContactDto),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["contact"],
    operation_id = "resolveContact"
)]
#[patch("/contact/{id}/resolve")]
pub async fn resolve_contact(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<ContactDto>> {
    let id: ContactMessageId = parse_id(&path, FieldName::new("id"))?;
    let message = state.contact.resolve(&id).await?;
    Ok(web::Json(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::Value;

    fn request(name: &str, email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: name.into(),
            email: email.into(),
            subject: Some("Admissions".into()),
            message: message.into(),
        }
    }

    #[actix_web::test]
    async fn message_is_forwarded_and_resolved() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/contact")
            .set_json(request("Priya", "priya@example.in", "When do classes start?"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        assert_eq!(created["status"], "new");

        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.as_ref(), "admin@digidiploma.in");

        let id = created["id"].as_str().expect("id");
        let req = test::TestRequest::patch()
            .uri(&format!("/api/contact/{id}/resolve"))
            .insert_header(harness.bearer(&admin))
            .to_request();
        let resolved: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resolved["status"], "resolved");

        let req = test::TestRequest::get()
            .uri("/api/contact?status=new")
            .insert_header(harness.bearer(&admin))
            .to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 0);
    }

    #[rstest]
    #[case::bad_email("Priya", "not-an-email", "Hello", "email")]
    #[case::blank_name(" ", "priya@example.in", "Hello", "name")]
    #[case::blank_message("Priya", "priya@example.in", "  ", "message")]
    #[actix_web::test]
    async fn invalid_submissions_name_the_field(
        #[case] name: &str,
        #[case] email: &str,
        #[case] message: &str,
        #[case] field: &str,
    ) {
        let harness = TestHarness::new();
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/contact")
            .set_json(request(name, email, message))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], field);
        assert!(harness.mailer.sent().is_empty());
    }
}
