//! Study material use-cases, including access control for downloads.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    MaterialRepository, PaymentRepository, StoredObject, SubjectRepository,
    SubscriptionRepository,
};
use crate::domain::{
    AccessDecision, Audience, AuditAction, AuditEntry, AuditRecorder, CurrentUser, Entitlements,
    Error, FileStorage, FileUpload, Material, MaterialDraft, MaterialFilter, MaterialId,
    NotificationDraft, NotificationKind, NotificationService, ObjectKey, PaymentPurpose,
    SubscriptionCoverage,
};

/// Material plus whether the caller may download it.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialView {
    pub material: Material,
    pub has_access: bool,
}

/// Ports the material service reads from.
#[derive(Clone)]
pub struct MaterialPorts {
    pub materials: Arc<dyn MaterialRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
}

/// Material service.
#[derive(Clone)]
pub struct MaterialService {
    ports: MaterialPorts,
    storage: FileStorage,
    notifications: NotificationService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl MaterialService {
    pub fn new(
        ports: MaterialPorts,
        storage: FileStorage,
        notifications: NotificationService,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ports,
            storage,
            notifications,
            audit,
            clock,
        }
    }

    /// Active materials matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: &MaterialFilter,
        page: PageParams,
    ) -> Result<Paginated<Material>, Error> {
        Ok(self.ports.materials.list(filter, page).await?)
    }

    /// One material; counts a view and resolves access for the caller.
    pub async fn view(
        &self,
        viewer: Option<&CurrentUser>,
        id: &MaterialId,
    ) -> Result<MaterialView, Error> {
        let mut material = self.get(id).await?;
        if !material.is_active && !viewer.is_some_and(CurrentUser::is_admin) {
            return Err(not_found());
        }
        self.ports.materials.increment_views(id).await?;
        material.views += 1;
        let entitlements = self.entitlements(viewer, &material).await?;
        let has_access = material.access_for(viewer, entitlements) == AccessDecision::Granted;
        Ok(MaterialView {
            material,
            has_access,
        })
    }

    /// Upload and publish a material, then tell students about it.
    pub async fn create(
        &self,
        admin: &CurrentUser,
        mut draft: MaterialDraft,
        upload: Option<FileUpload>,
    ) -> Result<Material, Error> {
        draft
            .validate(upload.is_some())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        if draft.subject_name.is_none() {
            draft.subject_name = self
                .ports
                .subjects
                .find_by_code(&draft.subject_code, Some(draft.branch.clone()))
                .await?
                .map(|subject| subject.name);
        }
        let file = match upload {
            Some(upload) => Some(self.storage.upload(upload, "materials").await?),
            None => None,
        };
        let now = self.clock.utc();
        let material = Material {
            id: MaterialId::random(),
            title: draft.title.trim().to_owned(),
            description: draft.description.clone(),
            subject_code: draft.subject_code.clone(),
            subject_name: draft.subject_name.clone(),
            branch: draft.branch.clone(),
            semester: draft.semester,
            kind: draft.kind,
            file,
            access_type: draft.access_type,
            price: draft.effective_price(),
            drive_url: draft.drive_url.clone(),
            downloads: 0,
            views: 0,
            tags: draft.tags,
            uploaded_by: admin.id.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.ports.materials.insert(&material).await {
            if let Some(file) = &material.file {
                self.storage.delete_quietly(&file.url).await;
            }
            return Err(err.into());
        }
        info!(material_id = %material.id, subject = %material.subject_code, "material created");
        self.audit
            .record(
                AuditEntry::new(AuditAction::MaterialCreated, Some(&admin.id))
                    .target(&material.id)
                    .details(json!({ "title": material.title, "accessType": material.access_type })),
            )
            .await;
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: None,
                audience: Audience::Students,
                title: "New study material".into(),
                message: format!("{} ({})", material.title, material.subject_code),
                kind: NotificationKind::Material,
                link: Some(format!("/materials/{}", material.id)),
            })
            .await;
        Ok(material)
    }

    /// Replace metadata and optionally the file.
    pub async fn update(
        &self,
        admin: &CurrentUser,
        id: &MaterialId,
        draft: MaterialDraft,
        upload: Option<FileUpload>,
    ) -> Result<Material, Error> {
        let mut material = self.get(id).await?;
        draft
            .validate(upload.is_some() || material.file.is_some())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let replaced = match upload {
            Some(upload) => {
                let stored = self.storage.upload(upload, "materials").await?;
                material.file.replace(stored)
            }
            None => None,
        };
        material.title = draft.title.trim().to_owned();
        material.description = draft.description.clone();
        material.subject_code = draft.subject_code.clone();
        if draft.subject_name.is_some() {
            material.subject_name = draft.subject_name.clone();
        }
        material.branch = draft.branch.clone();
        material.semester = draft.semester;
        material.kind = draft.kind;
        material.access_type = draft.access_type;
        material.price = draft.effective_price();
        material.drive_url = draft.drive_url;
        material.tags = draft.tags;
        material.updated_at = self.clock.utc();
        self.ports.materials.update(&material).await?;
        if let Some(old) = replaced {
            self.storage.delete_quietly(&old.url).await;
        }
        self.audit
            .record(AuditEntry::new(AuditAction::MaterialUpdated, Some(&admin.id)).target(id))
            .await;
        Ok(material)
    }

    /// Remove a material and its file.
    pub async fn delete(&self, admin: &CurrentUser, id: &MaterialId) -> Result<(), Error> {
        let material = self.get(id).await?;
        if !self.ports.materials.delete(id).await? {
            return Err(not_found());
        }
        if let Some(file) = &material.file {
            self.storage.delete_quietly(&file.url).await;
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::MaterialDeleted, Some(&admin.id))
                    .target(id)
                    .details(json!({ "title": material.title })),
            )
            .await;
        Ok(())
    }

    /// Resolve the download URL after checking access.
    pub async fn download(
        &self,
        user: &CurrentUser,
        id: &MaterialId,
        ip: Option<String>,
    ) -> Result<String, Error> {
        let material = self.get(id).await?;
        if !material.is_active && !user.is_admin() {
            return Err(not_found());
        }
        let entitlements = self.entitlements(Some(user), &material).await?;
        match material.access_for(Some(user), entitlements) {
            AccessDecision::Granted => {}
            AccessDecision::LoginRequired => {
                return Err(Error::unauthorized("Login required"));
            }
            AccessDecision::PaymentRequired => {
                return Err(Error::payment_required("Purchase or subscribe to download")
                    .with_details(json!({
                        "materialId": material.id,
                        "price": material.price,
                    })));
            }
        }
        let url = material
            .download_url()
            .ok_or_else(|| Error::not_found("No file attached to this material"))?
            .to_owned();
        self.ports.materials.increment_downloads(id).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::MaterialDownloaded, Some(&user.id))
                    .target(id)
                    .ip(ip),
            )
            .await;
        Ok(url)
    }

    /// Bytes for the storage proxy endpoint.
    pub async fn proxy(&self, key: &ObjectKey) -> Result<StoredObject, Error> {
        self.storage.fetch(key).await
    }

    async fn get(&self, id: &MaterialId) -> Result<Material, Error> {
        self.ports
            .materials
            .find_by_id(id)
            .await?
            .ok_or_else(not_found)
    }

    async fn entitlements(
        &self,
        viewer: Option<&CurrentUser>,
        material: &Material,
    ) -> Result<Entitlements, Error> {
        let Some(viewer) = viewer else {
            return Ok(Entitlements::default());
        };
        if viewer.is_admin() || material.access_type != crate::domain::AccessType::Paid {
            return Ok(Entitlements::default());
        }
        let now = self.clock.utc();
        let has_active_subscription = SubscriptionCoverage::new(
            self.ports
                .subscriptions
                .unexpired_for_user(&viewer.id, now)
                .await?,
        )
        .in_force(now)
        .is_some();
        let purchased = if has_active_subscription {
            false
        } else {
            self.ports
                .payments
                .has_paid_for(
                    &viewer.id,
                    &PaymentPurpose::Material {
                        id: material.id.clone(),
                    },
                )
                .await?
        };
        Ok(Entitlements {
            has_active_subscription,
            purchased,
        })
    }
}

fn not_found() -> Error {
    Error::not_found("Material not found")
}

#[cfg(test)]
#[path = "material_service_tests.rs"]
mod tests;
