//! Razorpay adapter for the [`PaymentGateway`] port.
//!
//! Orders, payment links, and refunds go over the REST API with basic auth.
//! Checkout and webhook signatures are HMAC-SHA256, hex encoded:
//! checkout signs `"{order_id}|{payment_id}"` with the key secret, webhooks
//! sign the raw request body with the webhook secret.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::{
    GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentGatewayError, PaymentLink,
    PaymentLinkRequest,
};
use crate::domain::{CheckoutConfirmation, PaymentEvent};

const API_BASE: &str = "https://api.razorpay.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type HmacSha256 = Hmac<Sha256>;

/// API credentials.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Zeroizing<String>,
    /// Secret configured on the dashboard webhook. Webhooks are rejected
    /// when unset.
    pub webhook_secret: Option<Zeroizing<String>>,
}

/// Reqwest-backed Razorpay client.
pub struct RazorpayGateway {
    client: Client,
    config: RazorpayConfig,
    api_base: String,
}

impl RazorpayGateway {
    /// # Errors
    /// Returns the reqwest error when the HTTP client cannot be built.
    pub fn new(config: RazorpayConfig) -> Result<Self, reqwest::Error> {
        Self::with_api_base(config, API_BASE)
    }

    /// # Errors
    /// Returns the reqwest error when the HTTP client cannot be built.
    pub fn with_api_base(
        config: RazorpayConfig,
        api_base: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            config,
            api_base: api_base.into(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, PaymentGatewayError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_base))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.as_str()))
            .json(&body)
            .send()
            .await
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, &bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| PaymentGatewayError::malformed_payload(err.to_string()))
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    description: Option<String>,
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let description = serde_json::from_slice::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.description)
        .unwrap_or_else(|| status.to_string());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PaymentGatewayError::unavailable(description)
    } else {
        PaymentGatewayError::rejected(description)
    }
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
///
/// # Errors
/// Returns [`PaymentGatewayError::InvalidSignature`] if the key is rejected.
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, PaymentGatewayError> {
    let mut mac = mac(secret)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn mac(secret: &str) -> Result<HmacSha256, PaymentGatewayError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentGatewayError::invalid_signature())
}

/// Constant-time check of a hex signature.
fn verify(secret: &str, payload: &[u8], signature: &str) -> Result<(), PaymentGatewayError> {
    let expected =
        hex::decode(signature.trim()).map_err(|_| PaymentGatewayError::invalid_signature())?;
    let mut mac = mac(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentGatewayError::invalid_signature())
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: u64,
    currency: String,
}

#[derive(Deserialize)]
struct LinkResponse {
    id: String,
    short_url: String,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: String,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Default, Deserialize)]
struct WebhookPayload {
    payment: Option<Wrapped<PaymentEntity>>,
    payment_link: Option<Wrapped<LinkEntity>>,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct LinkEntity {
    id: String,
}

fn missing(field: &str) -> PaymentGatewayError {
    PaymentGatewayError::malformed_payload(format!("webhook payload is missing {field}"))
}

/// Translate a verified webhook body into a [`PaymentEvent`].
fn parse_event(body: &[u8]) -> Result<PaymentEvent, PaymentGatewayError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(body)
        .map_err(|err| PaymentGatewayError::malformed_payload(err.to_string()))?;
    let payment = envelope.payload.payment.map(|wrapped| wrapped.entity);
    match envelope.event.as_str() {
        "payment.captured" => {
            let payment = payment.ok_or_else(|| missing("payment"))?;
            Ok(PaymentEvent::Captured {
                gateway_order_id: payment.order_id.ok_or_else(|| missing("order_id"))?,
                gateway_payment_id: payment.id,
            })
        }
        "payment_link.paid" => {
            let link = envelope
                .payload
                .payment_link
                .ok_or_else(|| missing("payment_link"))?;
            let payment = payment.ok_or_else(|| missing("payment"))?;
            Ok(PaymentEvent::LinkPaid {
                payment_link_id: link.entity.id,
                gateway_payment_id: payment.id,
            })
        }
        "payment.failed" => {
            let payment = payment.ok_or_else(|| missing("payment"))?;
            Ok(PaymentEvent::Failed {
                gateway_order_id: payment.order_id.ok_or_else(|| missing("order_id"))?,
                reason: payment.error_description,
            })
        }
        other => Ok(PaymentEvent::Ignored(other.to_owned())),
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> String {
        self.config.key_id.clone()
    }

    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentGatewayError> {
        let created: OrderResponse = self
            .post(
                "/orders",
                json!({
                    "amount": request.amount,
                    "currency": request.currency,
                    "receipt": request.receipt,
                    "notes": { "description": request.description },
                }),
            )
            .await?;
        debug!(order_id = %created.id, "razorpay order created");
        Ok(GatewayOrder {
            id: created.id,
            amount: created.amount,
            currency: created.currency,
        })
    }

    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> Result<PaymentLink, PaymentGatewayError> {
        let created: LinkResponse = self
            .post(
                "/payment_links",
                json!({
                    "amount": request.amount,
                    "currency": request.currency,
                    "reference_id": request.reference_id,
                    "description": request.description,
                    "customer": {
                        "name": request.customer_name,
                        "email": request.customer_email,
                    },
                    "notify": { "email": true },
                }),
            )
            .await?;
        Ok(PaymentLink {
            id: created.id,
            short_url: created.short_url,
        })
    }

    async fn refund(&self, payment_id: &str, amount: u64) -> Result<String, PaymentGatewayError> {
        let refund: RefundResponse = self
            .post(
                &format!("/payments/{payment_id}/refund"),
                json!({ "amount": amount }),
            )
            .await?;
        Ok(refund.id)
    }

    fn verify_checkout(
        &self,
        confirmation: &CheckoutConfirmation,
    ) -> Result<(), PaymentGatewayError> {
        let payload = format!(
            "{}|{}",
            confirmation.gateway_order_id, confirmation.gateway_payment_id
        );
        verify(
            &self.config.key_secret,
            payload.as_bytes(),
            &confirmation.signature,
        )
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, PaymentGatewayError> {
        let Some(secret) = &self.config.webhook_secret else {
            return Err(PaymentGatewayError::invalid_signature());
        };
        verify(secret, body, signature)?;
        parse_event(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn gateway() -> RazorpayGateway {
        RazorpayGateway::new(RazorpayConfig {
            key_id: "rzp_test_key".into(),
            key_secret: Zeroizing::new("key-secret".into()),
            webhook_secret: Some(Zeroizing::new("hook-secret".into())),
        })
        .expect("client")
    }

    fn confirmation(signature: String) -> CheckoutConfirmation {
        CheckoutConfirmation {
            gateway_order_id: "order_123".into(),
            gateway_payment_id: "pay_456".into(),
            signature,
        }
    }

    #[rstest]
    fn accepts_the_correct_checkout_signature(gateway: RazorpayGateway) {
        let signature = sign("key-secret", b"order_123|pay_456").expect("sign");
        assert_eq!(gateway.verify_checkout(&confirmation(signature)), Ok(()));
    }

    #[rstest]
    #[case(sign("other-secret", b"order_123|pay_456").expect("sign"))]
    #[case(sign("key-secret", b"order_123|pay_999").expect("sign"))]
    #[case("not-hex".to_owned())]
    #[case(String::new())]
    fn rejects_wrong_checkout_signatures(gateway: RazorpayGateway, #[case] signature: String) {
        assert_eq!(
            gateway.verify_checkout(&confirmation(signature)),
            Err(PaymentGatewayError::InvalidSignature)
        );
    }

    #[rstest]
    fn parses_signed_capture_webhook(gateway: RazorpayGateway) {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_1"}}}}"#;
        let event = gateway
            .parse_webhook(body, &sign("hook-secret", body).expect("sign"))
            .expect("event");
        assert_eq!(
            event,
            PaymentEvent::Captured {
                gateway_order_id: "order_1".into(),
                gateway_payment_id: "pay_1".into(),
            }
        );
    }

    #[rstest]
    fn rejects_webhook_signed_with_key_secret(gateway: RazorpayGateway) {
        let body = br#"{"event":"payment.captured"}"#;
        assert_eq!(
            gateway.parse_webhook(body, &sign("key-secret", body).expect("sign")),
            Err(PaymentGatewayError::InvalidSignature)
        );
    }

    #[rstest]
    #[case(
        r#"{"event":"payment_link.paid","payload":{"payment_link":{"entity":{"id":"plink_1"}},"payment":{"entity":{"id":"pay_2"}}}}"#,
        PaymentEvent::LinkPaid { payment_link_id: "plink_1".into(), gateway_payment_id: "pay_2".into() }
    )]
    #[case(
        r#"{"event":"payment.failed","payload":{"payment":{"entity":{"id":"pay_3","order_id":"order_3","error_description":"card declined"}}}}"#,
        PaymentEvent::Failed { gateway_order_id: "order_3".into(), reason: Some("card declined".into()) }
    )]
    #[case(r#"{"event":"order.paid"}"#, PaymentEvent::Ignored("order.paid".into()))]
    fn maps_webhook_events(#[case] body: &str, #[case] expected: PaymentEvent) {
        assert_eq!(parse_event(body.as_bytes()), Ok(expected));
    }

    #[rstest]
    fn capture_without_order_is_malformed() {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1"}}}}"#;
        assert!(matches!(
            parse_event(body),
            Err(PaymentGatewayError::MalformedPayload { .. })
        ));
    }

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, br#"{"error":{"description":"amount too low"}}"#.as_slice(), PaymentGatewayError::rejected("amount too low"))]
    #[case(StatusCode::BAD_GATEWAY, b"".as_slice(), PaymentGatewayError::unavailable("502 Bad Gateway"))]
    fn maps_http_failures(
        #[case] status: StatusCode,
        #[case] body: &[u8],
        #[case] expected: PaymentGatewayError,
    ) {
        assert_eq!(map_status_error(status, body), expected);
    }
}
