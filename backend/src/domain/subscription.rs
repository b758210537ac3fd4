//! Subscription plans and subscriptions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{PaymentOrderId, SubscriptionId, UserId};

/// Purchasable plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Monthly,
    Quarterly,
    Yearly,
}

impl SubscriptionPlan {
    /// Every plan, cheapest first.
    pub const ALL: [Self; 3] = [Self::Monthly, Self::Quarterly, Self::Yearly];

    /// Length of the plan in days.
    pub fn duration_days(self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }

    /// Price in paise.
    pub fn price(self) -> u64 {
        match self {
            Self::Monthly => 9_900,
            Self::Quarterly => 24_900,
            Self::Yearly => 89_900,
        }
    }

    /// Human label used in receipts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Yearly => "Yearly",
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for SubscriptionPlan {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" | "annual" => Ok(Self::Yearly),
            _ => Err(()),
        }
    }
}

/// Stored lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A user's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan: SubscriptionPlan,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub payment_order_id: Option<PaymentOrderId>,
    pub amount: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Start a new subscription, extending from `extend_from` when the user
    /// still has time left on an earlier one.
    pub fn start(
        user_id: UserId,
        plan: SubscriptionPlan,
        now: DateTime<Utc>,
        extend_from: Option<DateTime<Utc>>,
        payment_order_id: Option<PaymentOrderId>,
    ) -> Self {
        let starts_at = extend_from.filter(|end| *end > now).unwrap_or(now);
        Self {
            id: SubscriptionId::random(),
            user_id,
            plan,
            starts_at,
            ends_at: starts_at + Duration::days(plan.duration_days()),
            status: SubscriptionStatus::Active,
            payment_order_id,
            amount: plan.price(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Status as seen at `now`: an active subscription past its end is expired.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use digidiploma::domain::{Subscription, SubscriptionPlan, SubscriptionStatus, UserId};
    ///
    /// let now = Utc::now();
    /// let sub = Subscription::start(UserId::random(), SubscriptionPlan::Monthly, now, None, None);
    /// assert_eq!(sub.effective_status(now), SubscriptionStatus::Active);
    /// assert_eq!(sub.effective_status(now + Duration::days(31)), SubscriptionStatus::Expired);
    /// ```
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active if self.ends_at <= now => SubscriptionStatus::Expired,
            other => other,
        }
    }

    /// Whether the subscription unlocks paid content at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == SubscriptionStatus::Active && self.starts_at <= now
    }
}

/// A user's unexpired subscriptions: the one in force and queued renewals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionCoverage {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionCoverage {
    pub fn new(mut subscriptions: Vec<Subscription>) -> Self {
        subscriptions.sort_by_key(|s| s.starts_at);
        Self { subscriptions }
    }

    /// The subscription unlocking paid content at `now`.
    pub fn in_force(&self, now: DateTime<Utc>) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.is_active_at(now))
    }

    /// End of paid-up time at `now`, counting queued renewals.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use digidiploma::domain::{Subscription, SubscriptionCoverage, SubscriptionPlan, UserId};
    ///
    /// let now = Utc::now();
    /// let user = UserId::random();
    /// let first = Subscription::start(user.clone(), SubscriptionPlan::Monthly, now, None, None);
    /// let renewal = Subscription::start(user, SubscriptionPlan::Monthly, now, Some(first.ends_at), None);
    /// let coverage = SubscriptionCoverage::new(vec![renewal, first]);
    /// assert_eq!(coverage.paid_until(now), Some(now + Duration::days(60)));
    /// ```
    pub fn paid_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.subscriptions
            .iter()
            .filter(|s| s.effective_status(now) == SubscriptionStatus::Active)
            .map(|s| s.ends_at)
            .max()
    }

    /// Every subscription still to run out, in force or queued.
    pub fn remaining(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Subscription> {
        self.subscriptions
            .iter()
            .filter(move |s| s.effective_status(now) == SubscriptionStatus::Active)
    }
}
