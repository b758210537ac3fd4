//! Port abstraction for the payment gateway.
use async_trait::async_trait;

use crate::domain::{CheckoutConfirmation, PaymentEvent};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment gateway adapters.
    pub enum PaymentGatewayError {
        /// The gateway is unreachable or returned a server error.
        Unavailable { message: String } => "payment gateway unavailable: {message}",
        /// The gateway rejected the request.
        Rejected { message: String } => "payment gateway rejected request: {message}",
        /// A signature did not match.
        InvalidSignature => "payment signature mismatch",
        /// A webhook body could not be parsed.
        MalformedPayload { message: String } => "malformed gateway payload: {message}",
    }
}

/// Order creation request sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrderRequest {
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub description: String,
}

/// Order as created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

/// Hosted payment link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkRequest {
    pub amount: u64,
    pub currency: String,
    pub reference_id: String,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
}

/// Hosted payment link as created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub id: String,
    pub short_url: String,
}

/// Port for the payment gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to the checkout widget.
    fn key_id(&self) -> String;

    /// Create a checkout order.
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentGatewayError>;

    /// Create a hosted payment link (UPI/QR).
    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> Result<PaymentLink, PaymentGatewayError>;

    /// Refund a captured payment in full. Returns the refund id.
    async fn refund(&self, payment_id: &str, amount: u64) -> Result<String, PaymentGatewayError>;

    /// Check the checkout signature returned to the browser.
    fn verify_checkout(&self, confirmation: &CheckoutConfirmation)
    -> Result<(), PaymentGatewayError>;

    /// Check a webhook signature and parse the event.
    fn parse_webhook(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, PaymentGatewayError>;
}
