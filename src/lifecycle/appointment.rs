//! Appointments
//!
//! ```text
//! pending ──▶ confirmed ──▶ completed
//!    │  ▲         │
//!    │  └─────────┤ (reschedule)
//!    └──▶ cancelled ◀┘
//! ```

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{Map, json};

use super::reference::{APPOINTMENT_PREFIX, ReferenceNumberGenerator};
use super::transition::{Transition, optional_text, require_text};
use super::{ArchiveService, load, load_all, local_today};
use crate::data::{
    Appointment, AppointmentStatus, ArchiveEntry, EntityId, Store, child_path, collections,
    decode_rows, encode,
};
use crate::error::AppError;
use crate::metrics::{RECORDS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};
use crate::notify::{
    Dispatcher, EmailMessage, Notification, NotificationPriority, NotificationTarget,
};

const ENTITY: &str = "appointment";

/// Appointment booking as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAppointment {
    pub user_id: String,
    pub title: String,
    pub description: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub time: String,
    pub requested_by: String,
    pub contact_number: String,
    pub email: String,
}

/// Staff action on an appointment
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AppointmentAction {
    Confirm { notes: Option<String> },
    Cancel { notes: Option<String> },
    Complete { notes: Option<String> },
}

impl AppointmentAction {
    fn notes(&self) -> Option<String> {
        match self {
            Self::Confirm { notes } | Self::Cancel { notes } | Self::Complete { notes } => {
                optional_text(notes.clone())
            }
        }
    }
}

impl Transition for AppointmentAction {
    type Status = AppointmentStatus;
    const ENTITY: &'static str = ENTITY;

    fn allowed_from(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Self::Confirm { .. } => &[Pending],
            Self::Cancel { .. } => &[Pending, Confirmed],
            Self::Complete { .. } => &[Confirmed],
        }
    }

    fn target(&self) -> AppointmentStatus {
        match self {
            Self::Confirm { .. } => AppointmentStatus::Confirmed,
            Self::Cancel { .. } => AppointmentStatus::Cancelled,
            Self::Complete { .. } => AppointmentStatus::Completed,
        }
    }
}

/// Reschedule is a transition back to `pending` with a new slot
struct Reschedule;

impl Transition for Reschedule {
    type Status = AppointmentStatus;
    const ENTITY: &'static str = ENTITY;

    fn allowed_from(&self) -> &'static [AppointmentStatus] {
        &[AppointmentStatus::Pending, AppointmentStatus::Confirmed]
    }

    fn target(&self) -> AppointmentStatus {
        AppointmentStatus::Pending
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("date must be YYYY-MM-DD, got {:?}", value)))
}

fn parse_time(value: &str) -> Result<String, AppError> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("time must be HH:MM, got {:?}", value)))?;
    Ok(time.format("%H:%M").to_string())
}

/// Appointment service
pub struct AppointmentService {
    store: Arc<dyn Store>,
    archives: Arc<ArchiveService>,
    dispatcher: Dispatcher,
    references: Arc<ReferenceNumberGenerator>,
    offset: FixedOffset,
}

impl AppointmentService {
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
        child_path(collections::APPOINTMENTS, id)
    }

    /// Book an appointment
    ///
    /// Sends a "request received" email to the requester and alerts staff.
    pub async fn create(&self, request: NewAppointment) -> Result<Appointment, AppError> {
        let user_id = require_text("userId", &request.user_id)?;
        let title = require_text("title", &request.title)?;
        let description = require_text("description", &request.description)?;
        let date = parse_date(&require_text("date", &request.date)?)?;
        let time = parse_time(&require_text("time", &request.time)?)?;
        let requested_by = require_text("requestedBy", &request.requested_by)?;
        let contact_number = require_text("contactNumber", &request.contact_number)?;
        let email = require_text("email", &request.email)?;

        let reference_number = self
            .references
            .next(APPOINTMENT_PREFIX, collections::APPOINTMENTS)
            .await?;
        let now = Utc::now();
        let appointment = Appointment {
            id: EntityId::new().0,
            reference_number,
            user_id,
            title,
            description,
            date,
            time,
            requested_by,
            contact_number,
            email,
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(&Self::path(&appointment.id), encode(&appointment)?)
            .await?;

        RECORDS_CREATED_TOTAL.with_label_values(&[ENTITY]).inc();
        tracing::info!(
            id = %appointment.id,
            reference_number = %appointment.reference_number,
            "Appointment created"
        );

        let barangay = self.dispatcher.settings().await.barangay_info.name.clone();
        self.dispatcher
            .email(EmailMessage::appointment_received(&appointment, &barangay))
            .await;
        let notification = Notification::new(
            "new_appointment",
            NotificationTarget::roles(self.dispatcher.staff_roles()),
            "New appointment request",
            format!(
                "{} requested \"{}\" on {} at {}",
                appointment.requested_by,
                appointment.title,
                appointment.date.format("%B %-d, %Y"),
                appointment.time
            ),
        )
        .with_click_action("/admin/appointments")
        .with_data("appointmentId", appointment.id.as_str())
        .with_data("referenceNumber", appointment.reference_number.as_str())
        .with_priority(NotificationPriority::High);
        self.dispatcher.push(notification).await;

        Ok(appointment)
    }

    pub async fn get(&self, id: &str) -> Result<Appointment, AppError> {
        load(self.store.as_ref(), collections::APPOINTMENTS, ENTITY, id).await
    }

    /// All appointments, newest first
    pub async fn list(&self) -> Result<Vec<Appointment>, AppError> {
        let mut appointments: Vec<Appointment> =
            load_all(self.store.as_ref(), collections::APPOINTMENTS).await?;
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Appointment>, AppError> {
        let rows = self
            .store
            .query_by_child(collections::APPOINTMENTS, "userId", json!(user_id))
            .await?;
        let mut appointments: Vec<Appointment> = decode_rows(collections::APPOINTMENTS, rows);
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    pub async fn list_by_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, AppError> {
        let rows = self
            .store
            .query_by_child(collections::APPOINTMENTS, "status", json!(status))
            .await?;
        let mut appointments: Vec<Appointment> = decode_rows(collections::APPOINTMENTS, rows);
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    /// Open appointments from today on, soonest first
    pub async fn upcoming(&self, limit: usize) -> Result<Vec<Appointment>, AppError> {
        let today = local_today(self.offset);
        let mut appointments: Vec<Appointment> = self
            .list()
            .await?
            .into_iter()
            .filter(|a| {
                matches!(
                    a.status,
                    AppointmentStatus::Pending | AppointmentStatus::Confirmed
                ) && a.date >= today
            })
            .collect();
        appointments.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
        appointments.truncate(limit);
        Ok(appointments)
    }

    /// Apply a staff action and notify the requester
    pub async fn transition(
        &self,
        id: &str,
        action: AppointmentAction,
    ) -> Result<Appointment, AppError> {
        let mut appointment = self.get(id).await?;
        let status = action.apply_to(appointment.status)?;
        let now = Utc::now();

        let mut fields = Map::new();
        if let Some(notes) = action.notes() {
            fields.insert("notes".to_string(), json!(notes));
            appointment.notes = Some(notes);
        }
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        appointment.status = status;
        appointment.updated_at = now;
        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(id, %status, "Appointment status updated");

        self.notify_status(&appointment).await;
        Ok(appointment)
    }

    /// Move an open appointment to a new slot; it goes back to `pending`
    ///
    /// # Errors
    /// `Validation` when the date is malformed or before today in the
    /// barangay's timezone.
    pub async fn reschedule(
        &self,
        id: &str,
        date: &str,
        time: &str,
    ) -> Result<Appointment, AppError> {
        let new_date = parse_date(date)?;
        let new_time = parse_time(time)?;
        if new_date < local_today(self.offset) {
            return Err(AppError::Validation(
                "appointments cannot be rescheduled to a past date".to_string(),
            ));
        }

        let mut appointment = self.get(id).await?;
        let status = Reschedule.apply_to(appointment.status)?;
        let now = Utc::now();

        let mut fields = Map::new();
        fields.insert("date".to_string(), json!(new_date));
        fields.insert("time".to_string(), json!(new_time));
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        appointment.date = new_date;
        appointment.time = new_time;
        appointment.status = status;
        appointment.updated_at = now;
        tracing::info!(id, date = %appointment.date, time = %appointment.time, "Appointment rescheduled");

        self.notify_status(&appointment).await;
        Ok(appointment)
    }

    async fn notify_status(&self, appointment: &Appointment) {
        let barangay = self.dispatcher.settings().await.barangay_info.name.clone();
        self.dispatcher
            .email(EmailMessage::appointment_status(appointment, &barangay))
            .await;

        let notification = Notification::new(
            "appointment_status",
            NotificationTarget::user(&appointment.user_id),
            format!("Appointment {}", appointment.status),
            format!(
                "\"{}\" on {} at {} is now {}.",
                appointment.title,
                appointment.date.format("%B %-d, %Y"),
                appointment.time,
                appointment.status
            ),
        )
        .with_click_action("/appointments")
        .with_data("appointmentId", appointment.id.as_str())
        .with_data("status", appointment.status.as_str());
        self.dispatcher.push(notification).await;
    }

    /// Soft delete through the archive
    pub async fn delete(
        &self,
        id: &str,
        archived_by: Option<&str>,
    ) -> Result<ArchiveEntry, AppError> {
        let appointment = self.get(id).await?;

        let mut preview = Map::new();
        preview.insert("title".to_string(), json!(appointment.title));
        preview.insert("requestedBy".to_string(), json!(appointment.requested_by));
        preview.insert("date".to_string(), json!(appointment.date));
        preview.insert("status".to_string(), json!(appointment.status));

        self.archives
            .archive_record(
                collections::APPOINTMENTS,
                id,
                &[Self::path(id)],
                preview,
                archived_by,
            )
            .await
    }
}
