//! Blotter (incident) reports
//!
//! ```text
//! pending ──▶ investigating ──▶ resolved ──▶ closed
//!    │   ▲          │
//!    └──▶ additionalInfo ◀┘
//! ```
//!
//! Status changes are emailed to the reporter; there is no push hook.

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{Map, json};

use super::reference::{BLOTTER_PREFIX, ReferenceNumberGenerator};
use super::transition::{Transition, optional_text, require_text};
use super::{ArchiveService, load, load_all, local_today};
use crate::data::{
    ArchiveEntry, BlotterEntry, BlotterStatus, EntityId, Priority, Store, child_path,
    collections, decode_rows, encode,
};
use crate::error::AppError;
use crate::metrics::{RECORDS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};
use crate::notify::{Dispatcher, EmailMessage};

const ENTITY: &str = "blotter";

/// Incident report as filed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlotterEntry {
    #[serde(rename = "type", default)]
    pub incident_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reported_by: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub email: String,
    /// Required; absent fails validation rather than defaulting
    pub priority: Option<Priority>,
    pub user_id: Option<String>,
    pub location: Option<String>,
    pub incident_date: Option<String>,
}

/// Staff edits that do not touch the status
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlotterDetails {
    pub priority: Option<Priority>,
    pub location: Option<String>,
    pub incident_date: Option<String>,
    pub description: Option<String>,
}

/// Staff action on a blotter report
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BlotterAction {
    Investigate {
        notes: Option<String>,
    },
    RequestInfo {
        #[serde(default)]
        notes: String,
    },
    Resolve {
        notes: Option<String>,
    },
    Close {
        notes: Option<String>,
    },
}

impl Transition for BlotterAction {
    type Status = BlotterStatus;
    const ENTITY: &'static str = ENTITY;

    fn allowed_from(&self) -> &'static [BlotterStatus] {
        use BlotterStatus::*;
        match self {
            Self::Investigate { .. } => &[Pending, AdditionalInfo],
            Self::RequestInfo { .. } => &[Pending, Investigating],
            Self::Resolve { .. } => &[Investigating],
            Self::Close { .. } => &[Resolved],
        }
    }

    fn target(&self) -> BlotterStatus {
        match self {
            Self::Investigate { .. } => BlotterStatus::Investigating,
            Self::RequestInfo { .. } => BlotterStatus::AdditionalInfo,
            Self::Resolve { .. } => BlotterStatus::Resolved,
            Self::Close { .. } => BlotterStatus::Closed,
        }
    }
}

/// Case-insensitive substring match over the searchable fields
fn matches_query(entry: &BlotterEntry, needle: &str) -> bool {
    [
        Some(entry.incident_type.as_str()),
        Some(entry.description.as_str()),
        Some(entry.reported_by.as_str()),
        entry.location.as_deref(),
        Some(entry.reference_number.as_str()),
        Some(entry.id.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Blotter service
pub struct BlotterService {
    store: Arc<dyn Store>,
    archives: Arc<ArchiveService>,
    dispatcher: Dispatcher,
    references: Arc<ReferenceNumberGenerator>,
    offset: FixedOffset,
}

impl BlotterService {
    pub fn new(
        store: Arc<dyn Store>,
        archives: Arc<ArchiveService>,
        dispatcher: Dispatcher,
        references: Arc<ReferenceNumberGenerator>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            archives,
            dispatcher,
            references,
            offset,
        }
    }

    fn path(id: &str) -> String {
        child_path(collections::BLOTTER, id)
    }

    /// File a new incident report
    pub async fn create(&self, report: NewBlotterEntry) -> Result<BlotterEntry, AppError> {
        let incident_type = require_text("type", &report.incident_type)?;
        let description = require_text("description", &report.description)?;
        let reported_by = require_text("reportedBy", &report.reported_by)?;
        let contact_number = require_text("contactNumber", &report.contact_number)?;
        let email = require_text("email", &report.email)?;
        let priority = report
            .priority
            .ok_or_else(|| AppError::Validation("priority is required".to_string()))?;

        let reference_number = self
            .references
            .next(BLOTTER_PREFIX, collections::BLOTTER)
            .await?;
        let now = Utc::now();
        let entry = BlotterEntry {
            id: EntityId::new().0,
            reference_number,
            incident_type,
            description,
            reported_by,
            contact_number,
            email,
            status: BlotterStatus::Pending,
            priority,
            user_id: optional_text(report.user_id),
            location: optional_text(report.location),
            incident_date: optional_text(report.incident_date),
            date: local_today(self.offset).format("%B %-d, %Y").to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(&Self::path(&entry.id), encode(&entry)?)
            .await?;

        RECORDS_CREATED_TOTAL.with_label_values(&[ENTITY]).inc();
        tracing::info!(
            id = %entry.id,
            reference_number = %entry.reference_number,
            priority = %entry.priority,
            "Blotter report filed"
        );
        Ok(entry)
    }

    pub async fn get(&self, id: &str) -> Result<BlotterEntry, AppError> {
        load(self.store.as_ref(), collections::BLOTTER, ENTITY, id).await
    }

    /// All reports, newest first
    pub async fn list(&self) -> Result<Vec<BlotterEntry>, AppError> {
        let mut entries: Vec<BlotterEntry> =
            load_all(self.store.as_ref(), collections::BLOTTER).await?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn list_by_status(&self, status: BlotterStatus) -> Result<Vec<BlotterEntry>, AppError> {
        let rows = self
            .store
            .query_by_child(collections::BLOTTER, "status", json!(status))
            .await?;
        let mut entries: Vec<BlotterEntry> = decode_rows(collections::BLOTTER, rows);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn list_by_priority(&self, priority: Priority) -> Result<Vec<BlotterEntry>, AppError> {
        let rows = self
            .store
            .query_by_child(collections::BLOTTER, "priority", json!(priority))
            .await?;
        let mut entries: Vec<BlotterEntry> = decode_rows(collections::BLOTTER, rows);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Reports matching `query` in any searchable field; blank returns all
    pub async fn search(&self, query: &str) -> Result<Vec<BlotterEntry>, AppError> {
        let needle = query.trim().to_lowercase();
        let mut entries = self.list().await?;
        if !needle.is_empty() {
            entries.retain(|entry| matches_query(entry, &needle));
        }
        Ok(entries)
    }

    /// Apply a staff action and email the reporter
    pub async fn transition(
        &self,
        id: &str,
        action: BlotterAction,
    ) -> Result<BlotterEntry, AppError> {
        let mut entry = self.get(id).await?;
        let status = action.apply_to(entry.status)?;

        let notes = match action {
            BlotterAction::RequestInfo { notes } => Some(require_text("notes", &notes)?),
            BlotterAction::Investigate { notes }
            | BlotterAction::Resolve { notes }
            | BlotterAction::Close { notes } => optional_text(notes),
        };

        let now = Utc::now();
        let mut fields = Map::new();
        if let Some(notes) = notes {
            fields.insert("notes".to_string(), json!(notes));
            entry.notes = Some(notes);
        }
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        entry.status = status;
        entry.updated_at = now;
        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(id, %status, "Blotter status updated");

        let barangay = self.dispatcher.settings().await.barangay_info.name.clone();
        self.dispatcher
            .email(EmailMessage::blotter_status(&entry, &barangay))
            .await;

        Ok(entry)
    }

    /// Edit priority, location, incident date or description
    pub async fn update_details(
        &self,
        id: &str,
        details: BlotterDetails,
    ) -> Result<BlotterEntry, AppError> {
        let mut entry = self.get(id).await?;

        let mut fields = Map::new();
        if let Some(priority) = details.priority {
            fields.insert("priority".to_string(), json!(priority));
            entry.priority = priority;
        }
        if let Some(location) = details.location {
            let location = optional_text(Some(location));
            fields.insert("location".to_string(), json!(location));
            entry.location = location;
        }
        if let Some(incident_date) = details.incident_date {
            let incident_date = optional_text(Some(incident_date));
            fields.insert("incidentDate".to_string(), json!(incident_date));
            entry.incident_date = incident_date;
        }
        if let Some(description) = details.description {
            let description = require_text("description", &description)?;
            fields.insert("description".to_string(), json!(description));
            entry.description = description;
        }
        if fields.is_empty() {
            return Ok(entry);
        }

        let now = Utc::now();
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;
        entry.updated_at = now;

        tracing::info!(id, "Blotter details updated");
        Ok(entry)
    }

    /// Soft delete through the archive
    pub async fn delete(
        &self,
        id: &str,
        archived_by: Option<&str>,
    ) -> Result<ArchiveEntry, AppError> {
        let entry = self.get(id).await?;

        let mut preview = Map::new();
        preview.insert("type".to_string(), json!(entry.incident_type));
        preview.insert("reportedBy".to_string(), json!(entry.reported_by));
        preview.insert("referenceNumber".to_string(), json!(entry.reference_number));
        preview.insert("status".to_string(), json!(entry.status));

        self.archives
            .archive_record(
                collections::BLOTTER,
                id,
                &[Self::path(id)],
                preview,
                archived_by,
            )
            .await
    }
}
