//! Resident verification
//!
//! A one-way admission gate: `pending` moves to `verified` or `rejected`
//! and never back. The status is mirrored onto the linked account profile
//! at `users/{uid}/verificationStatus`; both paths change in one write.

use std::sync::Arc;

use axum::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::transition::{Transition, optional_text, require_text};
use super::{ArchiveService, load};
use crate::data::{
    AddressInfo, ArchiveEntry, ContactInfo, EmergencyContact, PathWrite, PersonalInfo, Resident,
    Store, Verification, VerificationStatus, child_path, collections, decode_rows, encode,
};
use crate::error::AppError;
use crate::metrics::{RECORDS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};
use crate::notify::{Dispatcher, EmailMessage, Notification, NotificationTarget};

const ENTITY: &str = "resident";

/// Authentication account port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Prevent the account from signing in
    async fn disable(&self, uid: &str) -> Result<(), AppError>;
}

/// Directory used when no identity provider is wired in
#[derive(Debug, Clone, Default)]
pub struct LoggingAccountDirectory;

#[async_trait]
impl AccountDirectory for LoggingAccountDirectory {
    async fn disable(&self, uid: &str) -> Result<(), AppError> {
        tracing::info!(uid, "Account disable requested");
        Ok(())
    }
}

/// Review decision on a pending registration
struct Review(VerificationStatus);

impl Transition for Review {
    type Status = VerificationStatus;
    const ENTITY: &'static str = ENTITY;

    fn allowed_from(&self) -> &'static [VerificationStatus] {
        &[VerificationStatus::Pending]
    }

    fn target(&self) -> VerificationStatus {
        self.0
    }
}

/// Registration form with already-uploaded document URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentRegistration {
    pub personal_info: PersonalInfo,
    pub contact_info: ContactInfo,
    pub address_info: AddressInfo,
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub id_front_photo_url: String,
    #[serde(default)]
    pub id_back_photo_url: String,
    #[serde(default)]
    pub selfie_photo_url: String,
}

pub struct ResidentService {
    store: Arc<dyn Store>,
    archives: Arc<ArchiveService>,
    dispatcher: Dispatcher,
    accounts: Arc<dyn AccountDirectory>,
}

impl ResidentService {
    pub fn new(
        store: Arc<dyn Store>,
        archives: Arc<ArchiveService>,
        dispatcher: Dispatcher,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            store,
            archives,
            dispatcher,
            accounts,
        }
    }

    fn path(uid: &str) -> String {
        child_path(collections::RESIDENTS, uid)
    }

    fn user_path(uid: &str) -> String {
        child_path(collections::USERS, uid)
    }

    /// Store a registration awaiting review
    ///
    /// # Errors
    /// `Conflict` when the uid already has a registration; a reviewed
    /// record is never reset to `pending`.
    pub async fn submit(
        &self,
        uid: &str,
        registration: ResidentRegistration,
    ) -> Result<Resident, AppError> {
        let uid = require_text("uid", uid)?;
        if uid.contains('/') {
            return Err(AppError::Validation("uid must not contain '/'".to_string()));
        }

        if self.store.get(&Self::path(&uid)).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "resident {} already has a registration",
                uid
            )));
        }

        let now = Utc::now();
        let resident = Resident {
            uid: uid.clone(),
            personal_info: registration.personal_info,
            contact_info: registration.contact_info,
            address_info: registration.address_info,
            emergency_contact: registration.emergency_contact,
            verification: Verification {
                id_front_photo_url: require_text(
                    "idFrontPhotoUrl",
                    &registration.id_front_photo_url,
                )?,
                id_back_photo_url: require_text("idBackPhotoUrl", &registration.id_back_photo_url)?,
                selfie_photo_url: require_text("selfiePhotoUrl", &registration.selfie_photo_url)?,
                status: VerificationStatus::Pending,
                submitted_at: now,
                reviewed_at: None,
                reviewed_by: None,
                notes: None,
            },
            registration_date: now,
            status: "active".to_string(),
        };

        self.store
            .write_paths(vec![
                PathWrite::put(Self::path(&uid), encode(&resident)?),
                PathWrite::put(
                    format!("{}/verificationStatus", Self::user_path(&uid)),
                    json!(VerificationStatus::Pending),
                ),
            ])
            .await?;

        RECORDS_CREATED_TOTAL.with_label_values(&[ENTITY]).inc();
        tracing::info!(uid = %uid, "Resident registration submitted");
        Ok(resident)
    }

    pub async fn get(&self, uid: &str) -> Result<Resident, AppError> {
        let mut resident: Resident =
            load(self.store.as_ref(), collections::RESIDENTS, ENTITY, uid).await?;
        resident.uid = uid.to_string();
        Ok(resident)
    }

    /// All residents, newest registration first
    pub async fn list(&self) -> Result<Vec<Resident>, AppError> {
        let rows = match self.store.get(collections::RESIDENTS).await? {
            Some(Value::Object(children)) => children.into_iter().collect(),
            _ => Vec::new(),
        };
        Ok(Self::with_uids(rows))
    }

    pub async fn list_by_verification_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Resident>, AppError> {
        let rows = self
            .store
            .query_by_child(collections::RESIDENTS, "verification/status", json!(status))
            .await?;
        Ok(Self::with_uids(rows))
    }

    /// Decode rows keyed by uid, filling `uid` from the key
    fn with_uids(rows: Vec<(String, Value)>) -> Vec<Resident> {
        let rows = rows
            .into_iter()
            .map(|(uid, mut value)| {
                if let Some(record) = value.as_object_mut() {
                    record.insert("uid".to_string(), json!(uid));
                }
                (uid, value)
            })
            .collect();
        let mut residents: Vec<Resident> = decode_rows(collections::RESIDENTS, rows);
        residents.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        residents
    }

    /// Review a pending registration
    ///
    /// # Errors
    /// - `NotFound` when no resident record exists
    /// - `Validation` when `status` is `pending`
    /// - `InvalidTransition` when the registration was already reviewed
    pub async fn update_verification(
        &self,
        uid: &str,
        status: VerificationStatus,
        notes: Option<String>,
        reviewer: Option<String>,
    ) -> Result<Resident, AppError> {
        let mut resident = self.get(uid).await?;
        if status == VerificationStatus::Pending {
            return Err(AppError::Validation(
                "verification can only be set to verified or rejected".to_string(),
            ));
        }
        Review(status).apply_to(resident.verification.status)?;

        let now = Utc::now();
        let notes = optional_text(notes);
        let reviewer = optional_text(reviewer);
        let verification = format!("{}/verification", Self::path(uid));

        let optional = |field: &str, value: &Option<String>| {
            let path = format!("{}/{}", verification, field);
            match value {
                Some(value) => PathWrite::put(path, json!(value)),
                None => PathWrite::delete(path),
            }
        };

        self.store
            .write_paths(vec![
                PathWrite::put(format!("{}/status", verification), json!(status)),
                PathWrite::put(format!("{}/reviewedAt", verification), json!(now)),
                optional("reviewedBy", &reviewer),
                optional("notes", &notes),
                PathWrite::put(
                    format!("{}/verificationStatus", Self::user_path(uid)),
                    json!(status),
                ),
            ])
            .await?;

        resident.verification.status = status;
        resident.verification.reviewed_at = Some(now);
        resident.verification.reviewed_by = reviewer;
        resident.verification.notes = notes;

        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(uid, %status, "Resident verification reviewed");

        self.notify_status(&resident).await;
        Ok(resident)
    }

    async fn notify_status(&self, resident: &Resident) {
        let status = resident.verification.status;
        let body = match status {
            VerificationStatus::Verified => "Your account is verified. You can now request services.",
            VerificationStatus::Rejected => "Your verification was not approved.",
            VerificationStatus::Pending => "Your verification is pending review.",
        };
        let notification = Notification::new(
            "verification_status",
            NotificationTarget::user(&resident.uid),
            "Verification update",
            body,
        )
        .with_click_action("/profile")
        .with_data("status", status.as_str());
        self.dispatcher.push(notification).await;

        let barangay = self.dispatcher.settings().await.barangay_info.name.clone();
        self.dispatcher
            .email(EmailMessage::verification_status(resident, &barangay))
            .await;
    }

    /// Disable the account, then archive the resident and profile together
    pub async fn delete(
        &self,
        uid: &str,
        archived_by: Option<&str>,
    ) -> Result<ArchiveEntry, AppError> {
        let resident = self.get(uid).await?;

        if let Err(error) = self.accounts.disable(uid).await {
            tracing::warn!(uid, %error, "Failed to disable account, archiving anyway");
        }

        let mut preview = Map::new();
        preview.insert(
            "name".to_string(),
            json!(resident.personal_info.full_name()),
        );
        preview.insert("email".to_string(), json!(resident.contact_info.email));
        preview.insert(
            "verificationStatus".to_string(),
            json!(resident.verification.status),
        );

        self.archives
            .archive_record(
                collections::RESIDENTS,
                uid,
                &[Self::path(uid), Self::user_path(uid)],
                preview,
                archived_by,
            )
            .await
    }
}
