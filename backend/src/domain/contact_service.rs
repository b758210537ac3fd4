//! Public contact form.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};
use tracing::warn;

use crate::domain::email_templates;
use crate::domain::ports::{ContactRepository, Mailer};
use crate::domain::{
    ContactDraft, ContactMessage, ContactMessageId, ContactStatus, Email, Error,
};

/// Contact service.
#[derive(Clone)]
pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
    mailer: Arc<dyn Mailer>,
    admin_email: Option<Email>,
    clock: Arc<dyn Clock>,
}

impl ContactService {
    pub fn new(
        repo: Arc<dyn ContactRepository>,
        mailer: Arc<dyn Mailer>,
        admin_email: Option<Email>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            mailer,
            admin_email,
            clock,
        }
    }

    /// Store a message and forward it to the admin inbox when one is set.
    pub async fn submit(&self, draft: ContactDraft) -> Result<ContactMessage, Error> {
        draft
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let now = self.clock.utc();
        let message = ContactMessage {
            id: ContactMessageId::random(),
            name: draft.name.trim().to_owned(),
            email: draft.email,
            subject: draft.subject.filter(|s| !s.trim().is_empty()),
            message: draft.message.trim().to_owned(),
            status: ContactStatus::New,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert(&message).await?;
        match &self.admin_email {
            Some(admin) => {
                let mail = email_templates::contact_forward(
                    admin,
                    &message.name,
                    &message.email,
                    message.subject.as_deref(),
                    &message.message,
                );
                if let Err(err) = self.mailer.send(&mail).await {
                    warn!(error = %err, contact_id = %message.id, "contact forward failed");
                }
            }
            None => warn!(contact_id = %message.id, "ADMIN_EMAIL unset; contact message not forwarded"),
        }
        Ok(message)
    }

    pub async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageParams,
    ) -> Result<Paginated<ContactMessage>, Error> {
        Ok(self.repo.list(status, page).await?)
    }

    pub async fn resolve(&self, id: &ContactMessageId) -> Result<ContactMessage, Error> {
        let mut message = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Message not found"))?;
        message.status = ContactStatus::Resolved;
        message.updated_at = self.clock.utc();
        self.repo.update(&message).await?;
        Ok(message)
    }
}
