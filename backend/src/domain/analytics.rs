//! Read models for the admin overview and the student dashboard.

use super::{Material, MaterialId, Notice, Subscription, SubjectCode};

/// Headline numbers for the admin console.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsOverview {
    pub total_users: u64,
    pub students: u64,
    pub admins: u64,
    pub materials: u64,
    pub subjects: u64,
    pub active_notices: u64,
    pub active_subscriptions: u64,
    /// Paise collected across paid orders.
    pub revenue: u64,
    pub downloads: u64,
    pub top_materials: Vec<TopMaterial>,
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopMaterial {
    pub id: MaterialId,
    pub title: String,
    pub subject_code: SubjectCode,
    pub downloads: u64,
}

impl From<Material> for TopMaterial {
    fn from(material: Material) -> Self {
        Self {
            id: material.id,
            title: material.title,
            subject_code: material.subject_code,
            downloads: material.downloads,
        }
    }
}

/// What a student sees after signing in.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDashboard {
    /// Materials for the student's branch and semester.
    pub material_count: u64,
    pub recent_materials: Vec<Material>,
    pub notices: Vec<Notice>,
    pub subscription: Option<Subscription>,
    pub unread_notifications: u64,
}
