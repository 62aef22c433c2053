//! Certificate requests
//!
//! ```text
//! pending ──▶ processing ──▶ ready ──▶ completed
//!    │  ▲          │
//!    │  └── additionalInfo ◀──┤
//!    └──────────▶ rejected ◀──┘
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::transition::{Transition, optional_text, require_text};
use super::{ArchiveService, SettingsService, load, load_all};
use crate::data::{
    ArchiveEntry, Certificate, CertificateStatus, EntityId, Store, child_path, collections,
    decode_rows, encode,
};
use crate::error::AppError;
use crate::metrics::{RECORDS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};
use crate::notify::{Dispatcher, EmailMessage, Notification, NotificationTarget};
use crate::storage::ObjectStorage;

const ENTITY: &str = "certificate";
const SIGNATURE_FOLDER: &str = "signatures";

/// Certificate request as submitted
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    #[serde(rename = "type", default)]
    pub certificate_type: String,
    #[serde(default)]
    pub requested_by: String,
    #[serde(default)]
    pub purpose: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

/// Staff action on a certificate request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CertificateAction {
    #[serde(rename_all = "camelCase")]
    Process {
        notes: Option<String>,
        estimated_completion: Option<NaiveDate>,
    },
    MarkReady {
        notes: Option<String>,
    },
    Complete,
    Reject {
        #[serde(default)]
        reason: String,
    },
    RequestInfo {
        #[serde(default)]
        notes: String,
    },
}

impl Transition for CertificateAction {
    type Status = CertificateStatus;
    const ENTITY: &'static str = ENTITY;

    fn allowed_from(&self) -> &'static [CertificateStatus] {
        use CertificateStatus::*;
        match self {
            Self::Process { .. } => &[Pending, AdditionalInfo],
            Self::MarkReady { .. } => &[Processing],
            Self::Complete => &[Ready],
            Self::Reject { .. } => &[Pending, Processing],
            Self::RequestInfo { .. } => &[Pending, Processing],
        }
    }

    fn target(&self) -> CertificateStatus {
        match self {
            Self::Process { .. } => CertificateStatus::Processing,
            Self::MarkReady { .. } => CertificateStatus::Ready,
            Self::Complete => CertificateStatus::Completed,
            Self::Reject { .. } => CertificateStatus::Rejected,
            Self::RequestInfo { .. } => CertificateStatus::AdditionalInfo,
        }
    }
}

/// Certificate service
pub struct CertificateService {
    store: Arc<dyn Store>,
    archives: Arc<ArchiveService>,
    dispatcher: Dispatcher,
    storage: Arc<dyn ObjectStorage>,
    settings: Arc<SettingsService>,
}

impl CertificateService {
    pub fn new(
        store: Arc<dyn Store>,
        archives: Arc<ArchiveService>,
        dispatcher: Dispatcher,
        storage: Arc<dyn ObjectStorage>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            store,
            archives,
            dispatcher,
            storage,
            settings,
        }
    }

    fn path(id: &str) -> String {
        child_path(collections::CERTIFICATES, id)
    }

    /// File a new certificate request
    pub async fn create(&self, request: NewCertificate) -> Result<Certificate, AppError> {
        let now = Utc::now();
        let certificate = Certificate {
            id: EntityId::new().0,
            certificate_type: require_text("type", &request.certificate_type)?,
            requested_by: require_text("requestedBy", &request.requested_by)?,
            purpose: require_text("purpose", &request.purpose)?,
            status: CertificateStatus::Pending,
            user_id: optional_text(request.user_id),
            email: optional_text(request.email),
            estimated_completion: None,
            notes: None,
            rejected_reason: None,
            completed_on: None,
            photo_url: optional_text(request.photo_url),
            signature_url: None,
            has_signature: false,
            pdf_url: None,
            generated_by: None,
            generated_on: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(&Self::path(&certificate.id), encode(&certificate)?)
            .await?;

        RECORDS_CREATED_TOTAL.with_label_values(&[ENTITY]).inc();
        tracing::info!(
            id = %certificate.id,
            certificate_type = %certificate.certificate_type,
            "Certificate request created"
        );
        Ok(certificate)
    }

    pub async fn get(&self, id: &str) -> Result<Certificate, AppError> {
        load(self.store.as_ref(), collections::CERTIFICATES, ENTITY, id).await
    }

    /// All requests, newest first
    pub async fn list(&self) -> Result<Vec<Certificate>, AppError> {
        let mut certificates: Vec<Certificate> =
            load_all(self.store.as_ref(), collections::CERTIFICATES).await?;
        certificates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(certificates)
    }

    pub async fn list_by_status(
        &self,
        status: CertificateStatus,
    ) -> Result<Vec<Certificate>, AppError> {
        let mut certificates = self.list().await?;
        certificates.retain(|c| c.status == status);
        Ok(certificates)
    }

    /// Requests filed by one resident, newest first
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Certificate>, AppError> {
        let rows = self
            .store
            .query_by_child(collections::CERTIFICATES, "userId", json!(user_id))
            .await?;
        let mut certificates: Vec<Certificate> = decode_rows(collections::CERTIFICATES, rows);
        certificates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(certificates)
    }

    /// Apply a staff action and notify the requester
    ///
    /// # Errors
    /// - `NotFound` for an unknown id (nothing is written)
    /// - `Validation` when a reject reason or info request is blank
    /// - `InvalidTransition` when the action does not apply to the current status
    pub async fn transition(
        &self,
        id: &str,
        action: CertificateAction,
    ) -> Result<Certificate, AppError> {
        let mut certificate = self.get(id).await?;
        let status = action.apply_to(certificate.status)?;
        let now = Utc::now();

        let mut fields = Map::new();
        match action {
            CertificateAction::Process {
                notes,
                estimated_completion,
            } => {
                if let Some(notes) = optional_text(notes) {
                    fields.insert("notes".to_string(), json!(notes));
                    certificate.notes = Some(notes);
                }
                if let Some(date) = estimated_completion {
                    fields.insert("estimatedCompletion".to_string(), json!(date));
                    certificate.estimated_completion = Some(date);
                }
            }
            CertificateAction::MarkReady { notes } => {
                if let Some(notes) = optional_text(notes) {
                    fields.insert("notes".to_string(), json!(notes));
                    certificate.notes = Some(notes);
                }
            }
            CertificateAction::Complete => {
                fields.insert("completedOn".to_string(), json!(now));
                certificate.completed_on = Some(now);
            }
            CertificateAction::Reject { reason } => {
                let reason = require_text("rejectedReason", &reason)?;
                fields.insert("rejectedReason".to_string(), json!(reason));
                certificate.rejected_reason = Some(reason);
            }
            CertificateAction::RequestInfo { notes } => {
                let notes = require_text("notes", &notes)?;
                fields.insert("notes".to_string(), json!(notes));
                certificate.notes = Some(notes);
            }
        }
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now));
        certificate.status = status;
        certificate.updated_at = now;

        self.store.update(&Self::path(id), fields).await?;

        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(id, %status, "Certificate status updated");

        self.notify_status(&certificate).await;
        Ok(certificate)
    }

    async fn notify_status(&self, certificate: &Certificate) {
        if let Some(user_id) = &certificate.user_id {
            let notification = Notification::new(
                "certificate_status",
                NotificationTarget::user(user_id),
                format!("{} update", certificate.certificate_type),
                format!(
                    "Your {} request is now {}.",
                    certificate.certificate_type, certificate.status
                ),
            )
            .with_click_action("/certificates")
            .with_data("certificateId", certificate.id.as_str())
            .with_data("status", certificate.status.as_str());
            self.dispatcher.push(notification).await;
        }

        let barangay = self.dispatcher.settings().await.barangay_info.name.clone();
        if let Some(message) = EmailMessage::certificate_status(certificate, &barangay) {
            self.dispatcher.email(message).await;
        }
    }

    /// Upload a signature image and attach it to the request
    ///
    /// The upload is removed again if the record cannot be updated, so a
    /// failed attach leaves no orphaned file.
    pub async fn attach_signature(
        &self,
        id: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<Certificate, AppError> {
        let mut certificate = self.get(id).await?;

        let object = self
            .storage
            .upload(data, SIGNATURE_FOLDER, content_type)
            .await?;

        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("signatureUrl".to_string(), json!(object.url));
        fields.insert("hasSignature".to_string(), Value::Bool(true));
        fields.insert("updatedAt".to_string(), json!(now));

        if let Err(error) = self.store.update(&Self::path(id), fields).await {
            if let Err(cleanup) = self.storage.delete(&object.key).await {
                tracing::warn!(key = %object.key, error = %cleanup, "Failed to remove orphaned signature");
            }
            return Err(error);
        }

        certificate.signature_url = Some(object.url);
        certificate.has_signature = true;
        certificate.updated_at = now;
        tracing::info!(id, "Signature attached to certificate");
        Ok(certificate)
    }

    /// Record a rendered certificate PDF, signed by the configured signatory
    pub async fn record_generated_pdf(
        &self,
        id: &str,
        pdf_url: &str,
    ) -> Result<Certificate, AppError> {
        let pdf_url = require_text("pdfUrl", pdf_url)?;
        url::Url::parse(&pdf_url)
            .map_err(|e| AppError::Validation(format!("pdfUrl is not a valid URL: {}", e)))?;

        let mut certificate = self.get(id).await?;
        let settings = self.settings.get().await?;
        let signing = &settings.certificate_settings;
        let generated_by = if signing.signatory_name.trim().is_empty() {
            signing.signatory_position.clone()
        } else {
            format!("{}, {}", signing.signatory_name, signing.signatory_position)
        };

        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("pdfUrl".to_string(), json!(pdf_url));
        fields.insert("generatedBy".to_string(), json!(generated_by));
        fields.insert("generatedOn".to_string(), json!(now));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        certificate.pdf_url = Some(pdf_url);
        certificate.generated_by = Some(generated_by);
        certificate.generated_on = Some(now);
        certificate.updated_at = now;
        Ok(certificate)
    }

    /// Soft delete through the archive
    pub async fn delete(
        &self,
        id: &str,
        archived_by: Option<&str>,
    ) -> Result<ArchiveEntry, AppError> {
        let certificate = self.get(id).await?;

        let mut preview = Map::new();
        preview.insert("type".to_string(), json!(certificate.certificate_type));
        preview.insert("requestedBy".to_string(), json!(certificate.requested_by));
        preview.insert("status".to_string(), json!(certificate.status));

        self.archives
            .archive_record(
                collections::CERTIFICATES,
                id,
                &[Self::path(id)],
                preview,
                archived_by,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SettingsCache;
    use crate::lifecycle::test_support::{
        FaultyStore, create_test_store, dispatcher_with, quiet_dispatcher,
    };
    use crate::notify::{MockEmailSender, MockNotificationSender};
    use crate::storage::{MockObjectStorage, StoredObject};
    use tempfile::TempDir;

    fn service_with(
        store: Arc<dyn Store>,
        dispatcher: Dispatcher,
        storage: MockObjectStorage,
    ) -> CertificateService {
        let settings = Arc::new(SettingsService::new(store.clone(), SettingsCache::new(0)));
        CertificateService::new(
            store.clone(),
            Arc::new(ArchiveService::new(store)),
            dispatcher,
            Arc::new(storage),
            settings,
        )
    }

    async fn create_service() -> (CertificateService, Arc<dyn Store>, TempDir) {
        let (store, temp_dir) = create_test_store().await;
        let service = service_with(
            store.clone(),
            quiet_dispatcher(store.clone()),
            MockObjectStorage::new(),
        );
        (service, store, temp_dir)
    }

    fn clearance() -> NewCertificate {
        NewCertificate {
            certificate_type: "Barangay Clearance".to_string(),
            requested_by: "Maria Santos".to_string(),
            purpose: "Employment".to_string(),
            user_id: Some("u1".to_string()),
            email: Some("maria@example.com".to_string()),
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn create_requires_type_requester_and_purpose() {
        let (service, store, _temp_dir) = create_service().await;

        let mut request = clearance();
        request.purpose = "  ".to_string();
        assert!(matches!(
            service.create(request).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(store.get("certificates").await.unwrap(), None);

        let certificate = service.create(clearance()).await.unwrap();
        assert_eq!(certificate.status, CertificateStatus::Pending);
        assert!(!certificate.has_signature);
        assert_eq!(certificate.created_at, certificate.updated_at);
    }

    #[tokio::test]
    async fn rejection_stores_reason_and_notifies_requester() {
        let (store, _temp_dir) = create_test_store().await;
        let mut push = MockNotificationSender::new();
        push.expect_send()
            .withf(|n| n.kind == "certificate_status" && n.data["status"] == "rejected")
            .times(1)
            .returning(|_| Ok(()));
        let mut email = MockEmailSender::new();
        email
            .expect_send()
            .withf(|m| m.to == "maria@example.com" && m.text.contains("Incomplete requirements"))
            .times(1)
            .returning(|_| Ok(()));
        let service = service_with(
            store.clone(),
            dispatcher_with(store.clone(), push, email),
            MockObjectStorage::new(),
        );

        let created = service.create(clearance()).await.unwrap();
        let rejected = service
            .transition(
                &created.id,
                CertificateAction::Reject {
                    reason: "Incomplete requirements".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(rejected.status, CertificateStatus::Rejected);
        let stored = service.get(&created.id).await.unwrap();
        assert_eq!(stored.status, CertificateStatus::Rejected);
        assert_eq!(stored.rejected_reason.as_deref(), Some("Incomplete requirements"));
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn full_happy_path_stamps_completion() {
        let (service, _store, _temp_dir) = create_service().await;
        let id = service.create(clearance()).await.unwrap().id;

        service
            .transition(
                &id,
                CertificateAction::Process {
                    notes: None,
                    estimated_completion: NaiveDate::from_ymd_opt(2025, 6, 1),
                },
            )
            .await
            .unwrap();
        service
            .transition(&id, CertificateAction::MarkReady { notes: None })
            .await
            .unwrap();
        let completed = service
            .transition(&id, CertificateAction::Complete)
            .await
            .unwrap();

        assert_eq!(completed.status, CertificateStatus::Completed);
        let stored = service.get(&id).await.unwrap();
        assert!(stored.completed_on.is_some());
        assert_eq!(stored.estimated_completion, NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    #[tokio::test]
    async fn completed_request_cannot_go_back() {
        let (service, _store, _temp_dir) = create_service().await;
        let id = service.create(clearance()).await.unwrap().id;
        for action in [
            CertificateAction::Process {
                notes: None,
                estimated_completion: None,
            },
            CertificateAction::MarkReady { notes: None },
            CertificateAction::Complete,
        ] {
            service.transition(&id, action).await.unwrap();
        }

        let result = service
            .transition(
                &id,
                CertificateAction::Reject {
                    reason: "late".to_string(),
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(AppError::InvalidTransition { from, .. }) if from == "completed"
        ));
        assert_eq!(
            service.get(&id).await.unwrap().status,
            CertificateStatus::Completed
        );
    }

    #[tokio::test]
    async fn blank_reject_reason_is_refused_without_writing() {
        let (service, _store, _temp_dir) = create_service().await;
        let created = service.create(clearance()).await.unwrap();

        let result = service
            .transition(
                &created.id,
                CertificateAction::Reject {
                    reason: " ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(service.get(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (service, store, _temp_dir) = create_service().await;

        let result = service
            .transition("missing", CertificateAction::Complete)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.delete("missing", None).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(store.get("certificates").await.unwrap(), None);
    }

    #[tokio::test]
    async fn signature_upload_is_removed_when_update_fails() {
        let (store, _temp_dir) = create_test_store().await;
        let created = service_with(
            store.clone(),
            quiet_dispatcher(store.clone()),
            MockObjectStorage::new(),
        )
        .create(clearance())
        .await
        .unwrap();

        let mut storage = MockObjectStorage::new();
        storage.expect_upload().times(1).returning(|_, _, _| {
            Ok(StoredObject {
                key: "signatures/sig.png".to_string(),
                url: "https://files.example.com/signatures/sig.png".to_string(),
            })
        });
        storage
            .expect_delete()
            .withf(|key| key == "signatures/sig.png")
            .times(1)
            .returning(|_| Ok(()));

        let failing: Arc<dyn Store> = Arc::new(FaultyStore::failing_updates(store.clone()));
        let service = service_with(failing, quiet_dispatcher(store.clone()), storage);

        let result = service
            .attach_signature(&created.id, vec![1, 2, 3], "image/png")
            .await;
        assert!(matches!(result, Err(AppError::Store(_))));
        assert!(!service.get(&created.id).await.unwrap().has_signature);
    }

    #[tokio::test]
    async fn generated_pdf_is_signed_by_configured_signatory() {
        let (service, _store, _temp_dir) = create_service().await;
        service
            .settings
            .update(json!({ "certificateSettings": { "signatoryName": "Hon. Jose Rizal" } }))
            .await
            .unwrap();
        let id = service.create(clearance()).await.unwrap().id;

        let certificate = service
            .record_generated_pdf(&id, "https://files.example.com/pdf/c.pdf")
            .await
            .unwrap();

        assert_eq!(
            certificate.generated_by.as_deref(),
            Some("Hon. Jose Rizal, Punong Barangay")
        );
        assert_eq!(service.get(&id).await.unwrap().pdf_url, certificate.pdf_url);
    }

    #[tokio::test]
    async fn delete_archives_with_preview() {
        let (service, store, _temp_dir) = create_service().await;
        let id = service.create(clearance()).await.unwrap().id;

        let entry = service.delete(&id, Some("staff-1")).await.unwrap();

        assert_eq!(entry.preview["type"], "Barangay Clearance");
        assert_eq!(entry.preview["status"], "pending");
        assert_eq!(store.get(&format!("certificates/{}", id)).await.unwrap(), None);
        assert!(matches!(service.get(&id).await, Err(AppError::NotFound(_))));
    }
}
