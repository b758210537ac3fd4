//! Shared row storage for the in-memory adapters.

use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use tokio::sync::RwLock;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    Announcement, AuditLog, ContactMessage, Course, InternshipApplication, Material, Notice,
    Notification, PaymentOrder, ProjectSubmission, Subject, Subscription, User,
};

/// Row with a primary key and an insertion timestamp.
pub(crate) trait Record: Clone + Send + Sync + 'static {
    fn key(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

macro_rules! impl_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Record for $ty {
                fn key(&self) -> &str {
                    self.id.as_ref()
                }

                fn created_at(&self) -> DateTime<Utc> {
                    self.created_at
                }
            }
        )+
    };
}

impl_record!(
    Announcement,
    AuditLog,
    ContactMessage,
    Course,
    InternshipApplication,
    Material,
    Notice,
    Notification,
    PaymentOrder,
    ProjectSubmission,
    Subject,
    Subscription,
    User,
);

/// Unique-constraint check: returns the clashing field name, if any.
pub(crate) type Conflict<T> = fn(&T, &T) -> Option<&'static str>;

/// Vector of rows behind an async lock.
pub(crate) struct Collection<T> {
    rows: RwLock<Vec<T>>,
    unique: Option<Conflict<T>>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            unique: None,
        }
    }
}

impl<T: Record> Collection<T> {
    /// Collection enforcing a uniqueness rule on insert and replace.
    pub(crate) fn with_unique(unique: Conflict<T>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            unique: Some(unique),
        }
    }

    fn check_unique(&self, rows: &[T], candidate: &T) -> Result<(), RepositoryError> {
        let Some(unique) = self.unique else {
            return Ok(());
        };
        rows.iter()
            .filter(|row| row.key() != candidate.key())
            .find_map(|row| unique(row, candidate))
            .map_or(Ok(()), |field| Err(RepositoryError::duplicate(field)))
    }

    pub(crate) async fn insert(&self, row: &T) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|existing| existing.key() == row.key()) {
            return Err(RepositoryError::duplicate("_id"));
        }
        self.check_unique(&rows, row)?;
        rows.push(row.clone());
        Ok(())
    }

    /// Replace the row with the same key; a missing row is a no-op.
    pub(crate) async fn replace(&self, row: &T) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        self.check_unique(&rows, row)?;
        if let Some(slot) = rows.iter_mut().find(|existing| existing.key() == row.key()) {
            *slot = row.clone();
        }
        Ok(())
    }

    pub(crate) async fn get(&self, key: &str) -> Option<T> {
        self.find(|row| row.key() == key).await
    }

    pub(crate) async fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.read().await.iter().find(|row| pred(row)).cloned()
    }

    /// Matching rows, newest first.
    pub(crate) async fn newest(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut out: Vec<T> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| pred(row))
            .cloned()
            .collect();
        out.sort_by_key(|row| std::cmp::Reverse(row.created_at()));
        out
    }

    pub(crate) async fn page(&self, pred: impl Fn(&T) -> bool, page: PageParams) -> Paginated<T> {
        page.slice(self.newest(pred).await)
    }

    pub(crate) async fn count(&self, pred: impl Fn(&T) -> bool) -> u64 {
        self.rows.read().await.iter().filter(|row| pred(row)).count() as u64
    }

    /// Sum a field across matching rows.
    pub(crate) async fn sum(&self, pred: impl Fn(&T) -> bool, field: impl Fn(&T) -> u64) -> u64 {
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| pred(row))
            .map(field)
            .sum()
    }

    pub(crate) async fn remove(&self, key: &str) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.key() != key);
        rows.len() != before
    }

    /// Apply `change` to matching rows; returns how many it reported as modified.
    pub(crate) async fn modify(
        &self,
        pred: impl Fn(&T) -> bool,
        mut change: impl FnMut(&mut T) -> bool,
    ) -> u64 {
        let mut rows = self.rows.write().await;
        let mut modified = 0;
        for row in rows.iter_mut().filter(|row| pred(row)) {
            if change(row) {
                modified += 1;
            }
        }
        modified
    }
}
