//! Admin overview, audit trail, and the student dashboard.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};

use crate::domain::ports::{
    MaterialRepository, NoticeRepository, PaymentRepository, SubjectRepository,
    SubscriptionRepository, UserRepository,
};
use crate::domain::{
    AnalyticsOverview, AuditLog, AuditRecorder, CurrentUser, Error, MaterialFilter,
    NoticeService, NotificationService, StudentDashboard, SubscriptionCoverage, TopMaterial,
    UserRole,
};

/// Rows in the top-downloads leaderboard.
pub const TOP_MATERIALS: u32 = 5;
/// Recent materials and notices shown on the dashboard.
pub const DASHBOARD_ITEMS: u32 = 5;

/// Repositories read by the analytics service.
#[derive(Clone)]
pub struct AnalyticsPorts {
    pub users: Arc<dyn UserRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub notices: Arc<dyn NoticeRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

/// Analytics service.
#[derive(Clone)]
pub struct AnalyticsService {
    ports: AnalyticsPorts,
    notice_board: NoticeService,
    notifications: NotificationService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(
        ports: AnalyticsPorts,
        notice_board: NoticeService,
        notifications: NotificationService,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ports,
            notice_board,
            notifications,
            audit,
            clock,
        }
    }

    /// Platform-wide counters.
    pub async fn overview(&self) -> Result<AnalyticsOverview, Error> {
        let p = &self.ports;
        let all_materials = MaterialFilter::default();
        let (total_users, students, admins, materials, subjects, active_notices) = tokio::try_join!(
            p.users.count(None),
            p.users.count(Some(UserRole::Student)),
            p.users.count(Some(UserRole::Admin)),
            p.materials.count(&all_materials),
            p.subjects.count_active(),
            p.notices.count_active(),
        )?;
        let (active_subscriptions, revenue, downloads, top) = tokio::try_join!(
            p.subscriptions.count_active(self.clock.utc()),
            p.payments.total_revenue(),
            p.materials.total_downloads(),
            p.materials.top_downloaded(TOP_MATERIALS),
        )?;
        Ok(AnalyticsOverview {
            total_users,
            students,
            admins,
            materials,
            subjects,
            active_notices,
            active_subscriptions,
            revenue,
            downloads,
            top_materials: top.into_iter().map(TopMaterial::from).collect(),
        })
    }

    /// Audit trail, newest first.
    pub async fn logs(
        &self,
        action: Option<String>,
        page: PageParams,
    ) -> Result<Paginated<AuditLog>, Error> {
        self.audit.list(action, page).await
    }

    /// Dashboard for a signed-in student.
    pub async fn dashboard(&self, user: &CurrentUser) -> Result<StudentDashboard, Error> {
        let filter = MaterialFilter {
            branch: user.branch.clone(),
            semester: user.semester,
            ..MaterialFilter::default()
        };
        let recent_page = PageParams::new(Some(1), Some(DASHBOARD_ITEMS))
            .map_err(|err| Error::internal(err.to_string()))?;
        let p = &self.ports;
        let now = self.clock.utc();
        let (material_count, recent, unexpired) = tokio::try_join!(
            p.materials.count(&filter),
            p.materials.list(&filter, recent_page),
            p.subscriptions.unexpired_for_user(&user.id, now),
        )?;
        let mut notices = self.notice_board.board(Some(user)).await?;
        notices.truncate(DASHBOARD_ITEMS as usize);
        let unread_notifications = self.notifications.unread_count(user).await?;
        Ok(StudentDashboard {
            material_count,
            recent_materials: recent.items,
            notices,
            subscription: SubscriptionCoverage::new(unexpired).in_force(now).cloned(),
            unread_notifications,
        })
    }
}
