//! Checkout, verification, webhooks, and refunds against the payment gateway.
//!
//! An order is created locally and at the gateway before the browser opens
//! checkout. Fulfilment (subscription activation, course enrolment) happens
//! exactly once, when the order first transitions to `paid`, whether that is
//! triggered by the checkout callback or by the webhook.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::email_templates;
use crate::domain::ports::{
    CourseRepository, GatewayOrderRequest, Mailer, MaterialRepository, PaymentGateway,
    PaymentGatewayError, PaymentLinkRequest, PaymentRepository, SubscriptionRepository,
    UserRepository,
};
use crate::domain::{
    AccessType, AuditAction, AuditEntry, AuditRecorder, CheckoutConfirmation, CurrentUser, Error,
    NotificationDraft, NotificationKind, NotificationService, PaymentEvent, PaymentOrder,
    PaymentOrderId, PaymentPurpose, PaymentStatus, Subscription, SubscriptionCoverage,
    SubscriptionPlan, SubscriptionStatus, UserId,
};

/// Plan entry in the public catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOffer {
    pub plan: SubscriptionPlan,
    pub price: u64,
    pub duration_days: i64,
}

/// Public checkout configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub enabled: bool,
    pub key_id: Option<String>,
    pub plans: Vec<PlanOffer>,
}

/// Ports the payment service works against.
#[derive(Clone)]
pub struct PaymentPorts {
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
}

/// Payment service.
#[derive(Clone)]
pub struct PaymentService {
    ports: PaymentPorts,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifications: NotificationService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    pub fn new(
        ports: PaymentPorts,
        gateway: Option<Arc<dyn PaymentGateway>>,
        notifications: NotificationService,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ports,
            gateway,
            notifications,
            audit,
            clock,
        }
    }

    /// Key id and plan catalogue for the checkout widget.
    pub fn config(&self) -> PaymentConfig {
        PaymentConfig {
            enabled: self.gateway.is_some(),
            key_id: self.gateway.as_ref().map(|g| g.key_id()),
            plans: SubscriptionPlan::ALL
                .into_iter()
                .map(|plan| PlanOffer {
                    plan,
                    price: plan.price(),
                    duration_days: plan.duration_days(),
                })
                .collect(),
        }
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, Error> {
        self.gateway
            .as_ref()
            .ok_or_else(|| Error::service_unavailable("Payments are not configured"))
    }

    /// Create a checkout order for `purpose`.
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        purpose: PaymentPurpose,
    ) -> Result<PaymentOrder, Error> {
        let gateway = self.gateway()?;
        let amount = self.price_for(user, &purpose).await?;
        let mut order = PaymentOrder::new(user.id.clone(), purpose, amount, self.clock.utc());
        let created = gateway
            .create_order(&GatewayOrderRequest {
                amount,
                currency: order.currency.clone(),
                receipt: order.receipt.clone(),
                description: order.purpose.describe(),
            })
            .await
            .map_err(map_gateway_error)?;
        order.gateway_order_id = Some(created.id);
        self.ports.payments.insert(&order).await?;
        info!(order_id = %order.id, user_id = %user.id, amount, "payment order created");
        self.audit
            .record(
                AuditEntry::new(AuditAction::PaymentOrderCreated, Some(&user.id))
                    .target(&order.id)
                    .details(json!({ "purpose": order.purpose, "amount": amount })),
            )
            .await;
        Ok(order)
    }

    /// Create a hosted payment link (UPI/QR) for `purpose`.
    pub async fn create_payment_link(
        &self,
        user: &CurrentUser,
        purpose: PaymentPurpose,
    ) -> Result<PaymentOrder, Error> {
        let gateway = self.gateway()?;
        let amount = self.price_for(user, &purpose).await?;
        let mut order = PaymentOrder::new(user.id.clone(), purpose, amount, self.clock.utc());
        let link = gateway
            .create_payment_link(&PaymentLinkRequest {
                amount,
                currency: order.currency.clone(),
                reference_id: order.receipt.clone(),
                description: order.purpose.describe(),
                customer_name: user.name.clone(),
                customer_email: user.email.to_string(),
            })
            .await
            .map_err(map_gateway_error)?;
        order.payment_link_id = Some(link.id);
        order.payment_link_url = Some(link.short_url);
        self.ports.payments.insert(&order).await?;
        info!(order_id = %order.id, "payment link created");
        Ok(order)
    }

    /// Confirm a checkout from the browser callback.
    pub async fn verify(
        &self,
        user: &CurrentUser,
        confirmation: &CheckoutConfirmation,
        ip: Option<String>,
    ) -> Result<PaymentOrder, Error> {
        let gateway = self.gateway()?;
        let order = self
            .ports
            .payments
            .find_by_gateway_order_id(&confirmation.gateway_order_id)
            .await?
            .filter(|order| order.user_id == user.id || user.is_admin())
            .ok_or_else(order_not_found)?;
        if order.is_paid() {
            return Ok(order);
        }
        if let Err(err) = gateway.verify_checkout(confirmation) {
            warn!(order_id = %order.id, error = %err, "checkout signature rejected");
            self.audit
                .record(
                    AuditEntry::new(AuditAction::PaymentFailed, Some(&user.id))
                        .target(&order.id)
                        .ip(ip),
                )
                .await;
            return Err(map_gateway_error(err));
        }
        self.mark_paid(order, &confirmation.gateway_payment_id, ip)
            .await
    }

    /// Apply a signed gateway webhook.
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<(), Error> {
        let gateway = self.gateway()?;
        let event = gateway
            .parse_webhook(body, signature)
            .map_err(map_gateway_error)?;
        match event {
            PaymentEvent::Captured {
                gateway_order_id,
                gateway_payment_id,
            } => {
                let order = self
                    .ports
                    .payments
                    .find_by_gateway_order_id(&gateway_order_id)
                    .await?;
                self.settle_from_webhook(order, &gateway_payment_id, &gateway_order_id)
                    .await
            }
            PaymentEvent::LinkPaid {
                payment_link_id,
                gateway_payment_id,
            } => {
                let order = self
                    .ports
                    .payments
                    .find_by_payment_link_id(&payment_link_id)
                    .await?;
                self.settle_from_webhook(order, &gateway_payment_id, &payment_link_id)
                    .await
            }
            PaymentEvent::Failed {
                gateway_order_id,
                reason,
            } => {
                let Some(mut order) = self
                    .ports
                    .payments
                    .find_by_gateway_order_id(&gateway_order_id)
                    .await?
                else {
                    warn!(gateway_order_id, "failure webhook for unknown order");
                    return Ok(());
                };
                if order.status != PaymentStatus::Created {
                    return Ok(());
                }
                order.status = PaymentStatus::Failed;
                order.failure_reason = reason;
                order.updated_at = self.clock.utc();
                self.ports.payments.update(&order).await?;
                self.audit
                    .record(
                        AuditEntry::new(AuditAction::PaymentFailed, Some(&order.user_id))
                            .target(&order.id),
                    )
                    .await;
                Ok(())
            }
            PaymentEvent::Ignored(kind) => {
                debug!(event = %kind, "ignoring webhook event");
                Ok(())
            }
        }
    }

    async fn settle_from_webhook(
        &self,
        order: Option<PaymentOrder>,
        payment_id: &str,
        reference: &str,
    ) -> Result<(), Error> {
        match order {
            Some(order) if order.is_paid() => Ok(()),
            Some(order) => self.mark_paid(order, payment_id, None).await.map(|_| ()),
            None => {
                warn!(reference, "payment webhook for unknown order");
                Ok(())
            }
        }
    }

    async fn mark_paid(
        &self,
        mut order: PaymentOrder,
        payment_id: &str,
        ip: Option<String>,
    ) -> Result<PaymentOrder, Error> {
        let now = self.clock.utc();
        order.status = PaymentStatus::Paid;
        order.gateway_payment_id = Some(payment_id.to_owned());
        order.failure_reason = None;
        order.paid_at = Some(now);
        order.updated_at = now;
        self.ports.payments.update(&order).await?;
        self.fulfil(&order).await?;
        info!(order_id = %order.id, user_id = %order.user_id, "payment captured");

        self.audit
            .record(
                AuditEntry::new(AuditAction::PaymentVerified, Some(&order.user_id))
                    .target(&order.id)
                    .details(json!({ "amount": order.amount, "paymentId": payment_id }))
                    .ip(ip),
            )
            .await;
        self.send_receipt(&order).await;
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: Some(order.user_id.clone()),
                audience: crate::domain::Audience::All,
                title: "Payment successful".into(),
                message: format!(
                    "{} for {}",
                    email_templates::format_inr(order.amount),
                    order.purpose.describe()
                ),
                kind: NotificationKind::Payment,
                link: None,
            })
            .await;
        Ok(order)
    }

    async fn fulfil(&self, order: &PaymentOrder) -> Result<(), Error> {
        match &order.purpose {
            PaymentPurpose::Material { .. } => Ok(()),
            PaymentPurpose::Course { id } => {
                self.ports.courses.add_student(id, &order.user_id).await?;
                Ok(())
            }
            PaymentPurpose::Subscription { plan } => {
                let now = self.clock.utc();
                let current_end = SubscriptionCoverage::new(
                    self.ports
                        .subscriptions
                        .unexpired_for_user(&order.user_id, now)
                        .await?,
                )
                .paid_until(now);
                let subscription = Subscription::start(
                    order.user_id.clone(),
                    *plan,
                    now,
                    current_end,
                    Some(order.id.clone()),
                );
                self.ports.subscriptions.insert(&subscription).await?;
                Ok(())
            }
        }
    }

    async fn send_receipt(&self, order: &PaymentOrder) {
        let user = match self.ports.users.find_by_id(&order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "could not load user for receipt");
                return;
            }
        };
        if let Err(err) = self
            .ports
            .mailer
            .send(&email_templates::payment_receipt(&user, order))
            .await
        {
            warn!(error = %err, order_id = %order.id, "receipt email not sent");
        }
    }

    /// Order status for polling; owners and admins only.
    pub async fn order(&self, user: &CurrentUser, id: &PaymentOrderId) -> Result<PaymentOrder, Error> {
        self.ports
            .payments
            .find_by_id(id)
            .await?
            .filter(|order| order.user_id == user.id || user.is_admin())
            .ok_or_else(order_not_found)
    }

    /// The caller's orders, or everyone's for admins asking for all.
    pub async fn list_orders(
        &self,
        user: &CurrentUser,
        all: bool,
        page: PageParams,
    ) -> Result<Paginated<PaymentOrder>, Error> {
        let owner = if all && user.is_admin() {
            None
        } else {
            Some(user.id.clone())
        };
        Ok(self.ports.payments.list(owner, page).await?)
    }

    /// Refund a paid order in full and revoke what it granted.
    pub async fn refund(
        &self,
        admin: &CurrentUser,
        id: &PaymentOrderId,
    ) -> Result<PaymentOrder, Error> {
        let gateway = self.gateway()?;
        let mut order = self
            .ports
            .payments
            .find_by_id(id)
            .await?
            .ok_or_else(order_not_found)?;
        if !order.is_paid() {
            return Err(Error::conflict("Only paid orders can be refunded"));
        }
        let payment_id = order
            .gateway_payment_id
            .clone()
            .ok_or_else(|| Error::conflict("Order has no captured payment"))?;
        let refund_id = gateway
            .refund(&payment_id, order.amount)
            .await
            .map_err(map_gateway_error)?;
        order.status = PaymentStatus::Refunded;
        order.refund_id = Some(refund_id);
        order.updated_at = self.clock.utc();
        self.ports.payments.update(&order).await?;
        if matches!(order.purpose, PaymentPurpose::Subscription { .. }) {
            self.cancel_granted_subscription(&order).await?;
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::PaymentRefunded, Some(&admin.id))
                    .target(&order.id)
                    .details(json!({ "amount": order.amount })),
            )
            .await;
        Ok(order)
    }

    async fn cancel_granted_subscription(&self, order: &PaymentOrder) -> Result<(), Error> {
        let Some(mut subscription) = self
            .ports
            .subscriptions
            .find_by_payment_order(&order.id)
            .await?
            .filter(|s| s.status == SubscriptionStatus::Active)
        else {
            return Ok(());
        };
        subscription.status = SubscriptionStatus::Cancelled;
        subscription.updated_at = self.clock.utc();
        self.ports.subscriptions.update(&subscription).await?;
        Ok(())
    }

    async fn price_for(&self, user: &CurrentUser, purpose: &PaymentPurpose) -> Result<u64, Error> {
        match purpose {
            PaymentPurpose::Subscription { plan } => Ok(plan.price()),
            PaymentPurpose::Material { id } => {
                let material = self
                    .ports
                    .materials
                    .find_by_id(id)
                    .await?
                    .filter(|m| m.is_active)
                    .ok_or_else(|| Error::not_found("Material not found"))?;
                if material.access_type != AccessType::Paid || material.price == 0 {
                    return Err(Error::invalid_request("This material is not for sale"));
                }
                self.reject_if_owned(&user.id, purpose).await?;
                Ok(material.price)
            }
            PaymentPurpose::Course { id } => {
                let course = self
                    .ports
                    .courses
                    .find_by_id(id)
                    .await?
                    .filter(|c| c.is_active)
                    .ok_or_else(|| Error::not_found("Course not found"))?;
                if course.has_student(&user.id) {
                    return Err(Error::conflict("Already enrolled in this course"));
                }
                if course.is_free() {
                    return Err(Error::invalid_request("This course is free; enrol directly"));
                }
                self.reject_if_owned(&user.id, purpose).await?;
                Ok(course.price)
            }
        }
    }

    async fn reject_if_owned(&self, user: &UserId, purpose: &PaymentPurpose) -> Result<(), Error> {
        if self.ports.payments.has_paid_for(user, purpose).await? {
            return Err(Error::conflict("Already purchased"));
        }
        Ok(())
    }
}

fn order_not_found() -> Error {
    Error::not_found("Payment order not found")
}

fn map_gateway_error(err: PaymentGatewayError) -> Error {
    match err {
        PaymentGatewayError::Unavailable { message } => {
            warn!(error = %message, "payment gateway unavailable");
            Error::service_unavailable("Payment gateway unavailable")
        }
        PaymentGatewayError::Rejected { message } => {
            warn!(error = %message, "payment gateway rejected request");
            Error::invalid_request("Payment gateway rejected the request")
        }
        PaymentGatewayError::InvalidSignature => Error::invalid_request("Invalid payment signature"),
        PaymentGatewayError::MalformedPayload { message } => {
            Error::invalid_request(format!("Malformed payment payload: {message}"))
        }
    }
}

#[cfg(test)]
#[path = "payment_service_tests.rs"]
mod tests;
