//! Razorpay checkout endpoints.
//!
//! ```text
//! GET  /api/payments/config
//! POST /api/payments/orders                 {"type":"subscription","plan":"monthly"}
//! GET  /api/payments/orders?all=true        own orders; admins may ask for all
//! GET  /api/payments/orders/{id}
//! POST /api/payments/orders/{id}/refund     admin
//! POST /api/payments/verify                 checkout callback
//! POST /api/payments/payment-links          hosted UPI/QR link
//! POST /api/payments/webhook                X-Razorpay-Signature over the raw body
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    CheckoutConfirmation, Error, PaymentConfig, PaymentOrder, PaymentOrderId, PaymentPurpose,
    PlanOffer, SubscriptionPlan,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser, client_ip};
use crate::inbound::http::dto::PageParamsQuery;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_flag, parse_id, parse_keyword, parse_page,
    require_text,
};

/// Header carrying the webhook HMAC.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";
const PURPOSES: &str = "material, subscription, course";
const PLANS: &str = "monthly, quarterly, yearly";

/// Plan entry in the public catalogue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanOfferDto {
    #[schema(example = "monthly")]
    pub plan: String,
    /// Price in paise.
    #[schema(example = 9900)]
    pub price: u64,
    pub duration_days: i64,
}

impl From<PlanOffer> for PlanOfferDto {
    fn from(offer: PlanOffer) -> Self {
        Self {
            plan: offer.plan.as_str().to_owned(),
            price: offer.price,
            duration_days: offer.duration_days,
        }
    }
}

/// Checkout configuration for the SPA.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigDto {
    pub enabled: bool,
    /// Razorpay public key id.
    pub key_id: Option<String>,
    pub currency: String,
    pub plans: Vec<PlanOfferDto>,
}

impl From<PaymentConfig> for PaymentConfigDto {
    fn from(config: PaymentConfig) -> Self {
        Self {
            enabled: config.enabled,
            key_id: config.key_id,
            currency: crate::domain::CURRENCY.to_owned(),
            plans: config.plans.into_iter().map(PlanOfferDto::from).collect(),
        }
    }
}

/// Payment order as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderDto {
    pub id: String,
    pub user_id: String,
    /// `{"type":"material","id":...}`, `{"type":"subscription","plan":...}`,
    /// or `{"type":"course","id":...}`.
    #[schema(value_type = Object)]
    pub purpose: PaymentPurpose,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub gateway_order_id: Option<String>,
    pub payment_link_url: Option<String>,
    #[schema(example = "paid")]
    pub status: String,
    pub refund_id: Option<String>,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentOrder> for PaymentOrderDto {
    fn from(order: PaymentOrder) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            purpose: order.purpose,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
            gateway_order_id: order.gateway_order_id,
            payment_link_url: order.payment_link_url,
            status: order.status.as_str().to_owned(),
            refund_id: order.refund_id,
            failure_reason: order.failure_reason,
            paid_at: order.paid_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// What the caller wants to buy.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PurchaseRequest {
    #[serde(rename = "type")]
    #[schema(example = "subscription")]
    pub kind: String,
    /// Material or course id.
    pub id: Option<String>,
    #[schema(example = "monthly")]
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum PurposeKind {
    Material,
    Subscription,
    Course,
}

impl std::str::FromStr for PurposeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "material" => Ok(Self::Material),
            "subscription" => Ok(Self::Subscription),
            "course" => Ok(Self::Course),
            _ => Err(()),
        }
    }
}

impl PurchaseRequest {
    fn into_purpose(self) -> Result<PaymentPurpose, Error> {
        let kind: PurposeKind = parse_keyword(&self.kind, FieldName::new("type"), PURPOSES)?;
        let id_field = FieldName::new("id");
        Ok(match kind {
            PurposeKind::Material => PaymentPurpose::Material {
                id: parse_id(&require_text(self.id, id_field)?, id_field)?,
            },
            PurposeKind::Course => PaymentPurpose::Course {
                id: parse_id(&require_text(self.id, id_field)?, id_field)?,
            },
            PurposeKind::Subscription => {
                let raw = self
                    .plan
                    .ok_or_else(|| missing_field_error(FieldName::new("plan")))?;
                let plan: SubscriptionPlan = parse_keyword(&raw, FieldName::new("plan"), PLANS)?;
                PaymentPurpose::Subscription { plan }
            }
        })
    }
}

/// Checkout callback fields. Razorpay's snake_case names are accepted too.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub razorpay_order_id: Option<String>,
    #[serde(alias = "razorpay_payment_id")]
    pub razorpay_payment_id: Option<String>,
    #[serde(alias = "razorpay_signature")]
    pub razorpay_signature: Option<String>,
}

impl VerifyPaymentRequest {
    fn into_confirmation(self) -> Result<CheckoutConfirmation, Error> {
        Ok(CheckoutConfirmation {
            gateway_order_id: require_text(
                self.razorpay_order_id,
                FieldName::new("razorpayOrderId"),
            )?,
            gateway_payment_id: require_text(
                self.razorpay_payment_id,
                FieldName::new("razorpayPaymentId"),
            )?,
            signature: require_text(
                self.razorpay_signature,
                FieldName::new("razorpaySignature"),
            )?,
        })
    }
}

/// `?all=true` on the order listing.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// Admins only: list every user's orders.
    pub all: Option<String>,
}

fn order_id(raw: &str) -> Result<PaymentOrderId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Public key id and plan catalogue.
#[utoipa::path(
    get,
    path = "/api/payments/config",
    responses((status = 200, description = "Checkout configuration", body = PaymentConfigDto)),
    tags = ["payments"],
    operation_id = "paymentConfig",
    security([])
)]
#[get("/payments/config")]
pub async fn payment_config(state: web::Data<HttpState>) -> web::Json<PaymentConfigDto> {
    web::Json(state.payments.config().into())
}

/// Create a checkout order.
#[utoipa::path(
    post,
    path = "/api/payments/orders",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Order created", body = PaymentOrderDto),
        (status = 400, description = "Invalid purpose or item not for sale", body = ErrorSchema),
        (status = 404, description = "Item not found", body = ErrorSchema),
        (status = 409, description = "Already purchased", body = ErrorSchema),
        (status = 503, description = "Payments not configured", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createPaymentOrder"
)]
#[post("/payments/orders")]
pub async fn create_order(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<PurchaseRequest>,
) -> ApiResult<HttpResponse> {
    let purpose = payload.into_inner().into_purpose()?;
    let order = state.payments.create_order(&user, purpose).await?;
    Ok(HttpResponse::Created().json(PaymentOrderDto::from(order)))
}

/// Create a hosted payment link.
#[utoipa::path(
    post,
    path = "/api/payments/payment-links",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Link created; see paymentLinkUrl", body = PaymentOrderDto),
        (status = 400, description = "Invalid purpose", body = ErrorSchema),
        (status = 409, description = "Already purchased", body = ErrorSchema),
        (status = 503, description = "Payments not configured", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createPaymentLink"
)]
#[post("/payments/payment-links")]
pub async fn create_payment_link(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<PurchaseRequest>,
) -> ApiResult<HttpResponse> {
    let purpose = payload.into_inner().into_purpose()?;
    let order = state.payments.create_payment_link(&user, purpose).await?;
    Ok(HttpResponse::Created().json(PaymentOrderDto::from(order)))
}

/// Confirm a checkout and grant what was bought.
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Order paid", body = PaymentOrderDto),
        (status = 400, description = "Signature mismatch", body = ErrorSchema),
        (status = 404, description = "Unknown order", body = ErrorSchema),
        (status = 503, description = "Payments not configured", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "verifyPayment"
)]
#[post("/payments/verify")]
pub async fn verify_payment(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    req: HttpRequest,
    payload: web::Json<VerifyPaymentRequest>,
) -> ApiResult<web::Json<PaymentOrderDto>> {
    let confirmation = payload.into_inner().into_confirmation()?;
    let order = state
        .payments
        .verify(&user, &confirmation, client_ip(&req))
        .await?;
    Ok(web::Json(order.into()))
}

/// Gateway webhook. The signature covers the raw body, so it is read as bytes.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, content_type = "application/json", description = "Raw Razorpay event"),
    params(("X-Razorpay-Signature" = String, Header, description = "HMAC-SHA256 of the body")),
    responses(
        (status = 200, description = "Event accepted"),
        (status = 400, description = "Missing or invalid signature", body = ErrorSchema),
        (status = 503, description = "Payments not configured", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "paymentWebhook",
    security([])
)]
#[post("/payments/webhook")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let signature = req
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing_field_error(FieldName::new("X-Razorpay-Signature")))?;
    state.payments.handle_webhook(&body, signature).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

/// Orders, newest first.
#[utoipa::path(
    get,
    path = "/api/payments/orders",
    params(OrderListQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Orders; items are PaymentOrderDto", body = crate::inbound::http::dto::PageSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "listPaymentOrders"
)]
#[get("/payments/orders")]
pub async fn list_orders(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    query: web::Query<OrderListQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let all = parse_flag(query.all.as_deref());
    let page = parse_page(page.into_inner().into())?;
    let orders = state.payments.list_orders(&user, all, page).await?;
    Ok(HttpResponse::Ok().json(orders.map(PaymentOrderDto::from)))
}

/// Order status, for polling after a payment link.
#[utoipa::path(
    get,
    path = "/api/payments/orders/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = PaymentOrderDto),
        (status = 404, description = "Not found or not yours", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "getPaymentOrder"
)]
#[get("/payments/orders/{id}")]
pub async fn get_order(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<PaymentOrderDto>> {
    let id = order_id(&path)?;
    let order = state.payments.order(&user, &id).await?;
    Ok(web::Json(order.into()))
}

/// Refund a paid order in full.
#[utoipa::path(
    post,
    path = "/api/payments/orders/{id}/refund",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Refunded", body = PaymentOrderDto),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Order is not paid", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "refundPaymentOrder"
)]
#[post("/payments/orders/{id}/refund")]
pub async fn refund_order(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<PaymentOrderDto>> {
    let id = order_id(&path)?;
    let order = state.payments.refund(&admin, &id).await?;
    Ok(web::Json(order.into()))
}
