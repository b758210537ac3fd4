//! Tests for the payment service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::ports::{
    GatewayOrder, MockAuditLogRepository, MockCourseRepository, MockMailer,
    MockMaterialRepository, MockNotificationBroadcaster, MockNotificationRepository,
    MockPaymentGateway, MockPaymentRepository, MockSubscriptionRepository, MockUserRepository,
};
use crate::domain::test_fixtures::{current, fixture_clock, fixture_timestamp, material};
use crate::domain::{ErrorCode, UserRole};

struct Mocks {
    payments: MockPaymentRepository,
    subscriptions: MockSubscriptionRepository,
    materials: MockMaterialRepository,
    gateway: MockPaymentGateway,
}

impl Mocks {
    fn new() -> Self {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_key_id().returning(|| "rzp_test_key".into());
        Self {
            payments: MockPaymentRepository::new(),
            subscriptions: MockSubscriptionRepository::new(),
            materials: MockMaterialRepository::new(),
            gateway,
        }
    }

    fn into_service(self, with_gateway: bool) -> PaymentService {
        let clock = fixture_clock();
        let mut audit = MockAuditLogRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_insert().returning(|_| Ok(()));
        let mut broadcaster = MockNotificationBroadcaster::new();
        broadcaster.expect_publish().returning(|_| 0);
        let notifications = NotificationService::new(
            Arc::new(notifications),
            Arc::new(MockUserRepository::new()),
            Arc::new(broadcaster),
            None,
            clock.clone(),
        );
        PaymentService::new(
            PaymentPorts {
                payments: Arc::new(self.payments),
                subscriptions: Arc::new(self.subscriptions),
                materials: Arc::new(self.materials),
                courses: Arc::new(MockCourseRepository::new()),
                users: Arc::new(users),
                mailer: Arc::new(MockMailer::new()),
            },
            with_gateway.then(|| Arc::new(self.gateway) as Arc<dyn PaymentGateway>),
            notifications,
            AuditRecorder::new(Arc::new(audit), clock.clone()),
            clock,
        )
    }
}

fn subscription_order(user: &CurrentUser) -> PaymentOrder {
    let mut order = PaymentOrder::new(
        user.id.clone(),
        PaymentPurpose::Subscription {
            plan: SubscriptionPlan::Quarterly,
        },
        SubscriptionPlan::Quarterly.price(),
        fixture_timestamp(),
    );
    order.gateway_order_id = Some("order_abc".into());
    order
}

fn confirmation() -> CheckoutConfirmation {
    CheckoutConfirmation {
        gateway_order_id: "order_abc".into(),
        gateway_payment_id: "pay_123".into(),
        signature: "sig".into(),
    }
}

#[rstest]
#[tokio::test]
async fn create_order_requires_a_gateway() {
    let err = Mocks::new()
        .into_service(false)
        .create_order(
            &current(UserRole::Student),
            PaymentPurpose::Subscription {
                plan: SubscriptionPlan::Monthly,
            },
        )
        .await
        .expect_err("no gateway");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn create_order_prices_subscriptions_from_the_catalogue() {
    let mut mocks = Mocks::new();
    mocks
        .gateway
        .expect_create_order()
        .withf(|req| req.amount == 24_900 && req.currency == "INR")
        .times(1)
        .returning(|req| {
            Ok(GatewayOrder {
                id: "order_abc".into(),
                amount: req.amount,
                currency: req.currency.clone(),
            })
        });
    mocks.payments.expect_insert().times(1).returning(|_| Ok(()));

    let order = mocks
        .into_service(true)
        .create_order(
            &current(UserRole::Student),
            PaymentPurpose::Subscription {
                plan: SubscriptionPlan::Quarterly,
            },
        )
        .await
        .expect("order created");
    assert_eq!(order.gateway_order_id.as_deref(), Some("order_abc"));
    assert_eq!(order.status, PaymentStatus::Created);
}

#[rstest]
#[tokio::test]
async fn create_order_rejects_already_purchased_material() {
    let mut mocks = Mocks::new();
    mocks
        .materials
        .expect_find_by_id()
        .returning(|_| Ok(Some(material(AccessType::Paid))));
    mocks.payments.expect_has_paid_for().returning(|_, _| Ok(true));
    mocks.gateway.expect_create_order().times(0);

    let err = mocks
        .into_service(true)
        .create_order(
            &current(UserRole::Student),
            PaymentPurpose::Material {
                id: crate::domain::MaterialId::random(),
            },
        )
        .await
        .expect_err("already owned");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn verify_marks_paid_and_activates_subscription() {
    let student = current(UserRole::Student);
    let order = subscription_order(&student);
    let mut mocks = Mocks::new();
    mocks
        .payments
        .expect_find_by_gateway_order_id()
        .returning(move |_| Ok(Some(order.clone())));
    mocks.gateway.expect_verify_checkout().returning(|_| Ok(()));
    mocks
        .payments
        .expect_update()
        .withf(|o| o.status == PaymentStatus::Paid && o.gateway_payment_id.as_deref() == Some("pay_123"))
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .subscriptions
        .expect_unexpired_for_user()
        .returning(|_, _| Ok(Vec::new()));
    mocks
        .subscriptions
        .expect_insert()
        .withf(|s| s.plan == SubscriptionPlan::Quarterly && s.starts_at == fixture_timestamp())
        .times(1)
        .returning(|_| Ok(()));

    let paid = mocks
        .into_service(true)
        .verify(&student, &confirmation(), None)
        .await
        .expect("verified");
    assert!(paid.is_paid());
}

#[rstest]
#[tokio::test]
async fn renewal_starts_after_queued_renewals_end() {
    let student = current(UserRole::Student);
    let order = subscription_order(&student);
    let first = Subscription::start(
        student.id.clone(),
        SubscriptionPlan::Monthly,
        fixture_timestamp() - chrono::Duration::days(10),
        None,
        None,
    );
    let queued = Subscription::start(
        student.id.clone(),
        SubscriptionPlan::Monthly,
        fixture_timestamp(),
        Some(first.ends_at),
        None,
    );
    let paid_until = queued.ends_at;
    let mut mocks = Mocks::new();
    mocks
        .payments
        .expect_find_by_gateway_order_id()
        .returning(move |_| Ok(Some(order.clone())));
    mocks.gateway.expect_verify_checkout().returning(|_| Ok(()));
    mocks.payments.expect_update().returning(|_| Ok(()));
    mocks
        .subscriptions
        .expect_unexpired_for_user()
        .returning(move |_, _| Ok(vec![queued.clone(), first.clone()]));
    mocks
        .subscriptions
        .expect_insert()
        .withf(move |s| s.starts_at == paid_until)
        .times(1)
        .returning(|_| Ok(()));

    mocks
        .into_service(true)
        .verify(&student, &confirmation(), None)
        .await
        .expect("verified");
}

#[rstest]
#[tokio::test]
async fn refund_cancels_the_subscription_the_order_granted() {
    let admin = current(UserRole::Admin);
    let student = current(UserRole::Student);
    let mut order = subscription_order(&student);
    order.status = PaymentStatus::Paid;
    order.gateway_payment_id = Some("pay_123".into());
    let order_id = order.id.clone();
    let granted = Subscription::start(
        student.id.clone(),
        SubscriptionPlan::Quarterly,
        fixture_timestamp(),
        None,
        Some(order_id.clone()),
    );
    let granted_id = granted.id.clone();
    let mut mocks = Mocks::new();
    mocks
        .payments
        .expect_find_by_id()
        .returning(move |_| Ok(Some(order.clone())));
    mocks
        .gateway
        .expect_refund()
        .returning(|_, _| Ok("rfnd_1".into()));
    mocks
        .payments
        .expect_update()
        .withf(|o| o.status == PaymentStatus::Refunded)
        .times(1)
        .returning(|_| Ok(()));
    let wanted = order_id.clone();
    mocks
        .subscriptions
        .expect_find_by_payment_order()
        .withf(move |id| id == &wanted)
        .returning(move |_| Ok(Some(granted.clone())));
    mocks.subscriptions.expect_latest_for_user().times(0);
    mocks
        .subscriptions
        .expect_update()
        .withf(move |s| s.id == granted_id && s.status == SubscriptionStatus::Cancelled)
        .times(1)
        .returning(|_| Ok(()));

    let refunded = mocks
        .into_service(true)
        .refund(&admin, &order_id)
        .await
        .expect("refunded");
    assert_eq!(refunded.refund_id.as_deref(), Some("rfnd_1"));
}

#[rstest]
#[tokio::test]
async fn verify_rejects_bad_signatures() {
    let student = current(UserRole::Student);
    let order = subscription_order(&student);
    let mut mocks = Mocks::new();
    mocks
        .payments
        .expect_find_by_gateway_order_id()
        .returning(move |_| Ok(Some(order.clone())));
    mocks
        .gateway
        .expect_verify_checkout()
        .returning(|_| Err(PaymentGatewayError::invalid_signature()));
    mocks.payments.expect_update().times(0);

    let err = mocks
        .into_service(true)
        .verify(&student, &confirmation(), None)
        .await
        .expect_err("bad signature");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn verify_hides_other_users_orders() {
    let owner = current(UserRole::Student);
    let order = subscription_order(&owner);
    let mut mocks = Mocks::new();
    mocks
        .payments
        .expect_find_by_gateway_order_id()
        .returning(move |_| Ok(Some(order.clone())));

    let err = mocks
        .into_service(true)
        .verify(&current(UserRole::Student), &confirmation(), None)
        .await
        .expect_err("not the owner");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn captured_webhook_for_paid_order_is_a_no_op() {
    let student = current(UserRole::Student);
    let mut order = subscription_order(&student);
    order.status = PaymentStatus::Paid;
    let mut mocks = Mocks::new();
    mocks.gateway.expect_parse_webhook().returning(|_, _| {
        Ok(PaymentEvent::Captured {
            gateway_order_id: "order_abc".into(),
            gateway_payment_id: "pay_123".into(),
        })
    });
    mocks
        .payments
        .expect_find_by_gateway_order_id()
        .returning(move |_| Ok(Some(order.clone())));
    mocks.payments.expect_update().times(0);
    mocks.subscriptions.expect_insert().times(0);

    mocks
        .into_service(true)
        .handle_webhook(b"{}", "sig")
        .await
        .expect("acknowledged");
}

#[rstest]
fn config_lists_every_plan() {
    let config = Mocks::new().into_service(true).config();
    assert!(config.enabled);
    assert_eq!(config.key_id.as_deref(), Some("rzp_test_key"));
    assert_eq!(config.plans.len(), 3);
}
