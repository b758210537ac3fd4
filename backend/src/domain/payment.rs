//! Payment orders tracked against the Razorpay gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CourseId, MaterialId, PaymentOrderId, SubscriptionPlan, UserId};

/// Currency used for every order.
pub const CURRENCY: &str = "INR";

/// What an order pays for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaymentPurpose {
    /// Single paid material.
    Material {
        /// Material being bought.
        id: MaterialId,
    },
    /// Subscription plan.
    Subscription {
        /// Plan being bought.
        plan: SubscriptionPlan,
    },
    /// Paid course enrolment.
    Course {
        /// Course being bought.
        id: CourseId,
    },
}

impl PaymentPurpose {
    /// Short description used for receipts and gateway notes.
    pub fn describe(&self) -> String {
        match self {
            Self::Material { id } => format!("Material {id}"),
            Self::Subscription { plan } => format!("{} subscription", plan.label()),
            Self::Course { id } => format!("Course {id}"),
        }
    }
}

/// Order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Order recorded before redirecting the user to checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    pub id: PaymentOrderId,
    pub user_id: UserId,
    pub purpose: PaymentPurpose,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub payment_link_id: Option<String>,
    pub payment_link_url: Option<String>,
    pub status: PaymentStatus,
    pub refund_id: Option<String>,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    /// Draft a new order in the `created` state.
    pub fn new(user_id: UserId, purpose: PaymentPurpose, amount: u64, now: DateTime<Utc>) -> Self {
        let id = PaymentOrderId::random();
        let receipt = format!("rcpt_{}", &id.as_ref()[id.as_ref().len().saturating_sub(12)..]);
        Self {
            id,
            user_id,
            purpose,
            amount,
            currency: CURRENCY.to_owned(),
            receipt,
            gateway_order_id: None,
            gateway_payment_id: None,
            payment_link_id: None,
            payment_link_url: None,
            status: PaymentStatus::Created,
            refund_id: None,
            failure_reason: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the order has been settled.
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Checkout callback sent by the client after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfirmation {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Gateway events the webhook reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// A payment for an order was captured.
    Captured {
        gateway_order_id: String,
        gateway_payment_id: String,
    },
    /// A hosted payment link was paid.
    LinkPaid {
        payment_link_id: String,
        gateway_payment_id: String,
    },
    /// A payment attempt failed.
    Failed {
        gateway_order_id: String,
        reason: Option<String>,
    },
    /// Anything else; acknowledged and ignored.
    Ignored(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn new_orders_start_created_in_inr() {
        let order = PaymentOrder::new(
            UserId::random(),
            PaymentPurpose::Subscription {
                plan: SubscriptionPlan::Monthly,
            },
            9_900,
            Utc::now(),
        );
        assert_eq!(order.status, PaymentStatus::Created);
        assert_eq!(order.currency, "INR");
        assert!(order.receipt.starts_with("rcpt_"));
        assert!(order.receipt.len() <= 40);
    }

    #[rstest]
    fn purpose_serialises_with_type_tag() {
        let purpose = PaymentPurpose::Subscription {
            plan: SubscriptionPlan::Yearly,
        };
        let value = serde_json::to_value(&purpose).expect("serialise");
        assert_eq!(value, serde_json::json!({ "type": "subscription", "plan": "yearly" }));
    }
}
