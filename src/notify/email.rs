//! Email messages and senders
//!
//! Messages are rendered here, per lifecycle event, so the lifecycle
//! modules only decide *when* to send and to whom.

use std::sync::Arc;

use axum::async_trait;
use serde::Serialize;

use super::EmailSender;
use crate::data::{
    Announcement, Appointment, AppointmentStatus, BlotterEntry, BlotterStatus, Certificate,
    CertificateStatus, Resident, VerificationStatus,
};
use crate::error::AppError;

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl EmailMessage {
    pub fn new(to: &str, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.into(),
            text: text.into(),
        }
    }

    /// Sent to the requester right after an appointment is booked
    pub fn appointment_received(appointment: &Appointment, barangay: &str) -> Self {
        Self::new(
            &appointment.email,
            format!("Appointment request received ({})", appointment.reference_number),
            format!(
                "Hello {},\n\nWe received your appointment request \"{}\" for {} at {}.\n\
                 Reference number: {}\n\nYou will be notified once it is confirmed.\n\n{}",
                appointment.requested_by,
                appointment.title,
                appointment.date.format("%B %-d, %Y"),
                appointment.time,
                appointment.reference_number,
                barangay,
            ),
        )
    }

    pub fn appointment_status(appointment: &Appointment, barangay: &str) -> Self {
        let headline = match appointment.status {
            AppointmentStatus::Pending => "is pending review",
            AppointmentStatus::Confirmed => "has been confirmed",
            AppointmentStatus::Cancelled => "has been cancelled",
            AppointmentStatus::Completed => "has been completed",
        };
        Self::new(
            &appointment.email,
            format!("Appointment {} {}", appointment.reference_number, headline),
            format!(
                "Hello {},\n\nYour appointment \"{}\" on {} at {} {}.{}\n\n{}",
                appointment.requested_by,
                appointment.title,
                appointment.date.format("%B %-d, %Y"),
                appointment.time,
                headline,
                notes_line(appointment.notes.as_deref()),
                barangay,
            ),
        )
    }

    /// `None` when the certificate carries no email address
    pub fn certificate_status(certificate: &Certificate, barangay: &str) -> Option<Self> {
        let to = certificate.email.as_deref()?;
        let (headline, detail) = match certificate.status {
            CertificateStatus::Pending => ("is pending review", None),
            CertificateStatus::Processing => ("is being processed", certificate.notes.as_deref()),
            CertificateStatus::Ready => ("is ready for pickup", certificate.notes.as_deref()),
            CertificateStatus::Completed => ("has been released", None),
            CertificateStatus::Rejected => ("was rejected", certificate.rejected_reason.as_deref()),
            CertificateStatus::AdditionalInfo => {
                ("needs additional information", certificate.notes.as_deref())
            }
        };
        Some(Self::new(
            to,
            format!("Your {} request {}", certificate.certificate_type, headline),
            format!(
                "Hello {},\n\nYour {} request for \"{}\" {}.{}\n\n{}",
                certificate.requested_by,
                certificate.certificate_type,
                certificate.purpose,
                headline,
                notes_line(detail),
                barangay,
            ),
        ))
    }

    pub fn blotter_status(entry: &BlotterEntry, barangay: &str) -> Self {
        let headline = match entry.status {
            BlotterStatus::Pending => "is pending review",
            BlotterStatus::Investigating => "is under investigation",
            BlotterStatus::Resolved => "has been resolved",
            BlotterStatus::AdditionalInfo => "needs additional information",
            BlotterStatus::Closed => "has been closed",
        };
        Self::new(
            &entry.email,
            format!("Blotter report {} {}", entry.reference_number, headline),
            format!(
                "Hello {},\n\nYour {} report filed on {} {}.{}\n\n{}",
                entry.reported_by,
                entry.incident_type,
                entry.date,
                headline,
                notes_line(entry.notes.as_deref()),
                barangay,
            ),
        )
    }

    pub fn announcement_created(to: &str, announcement: &Announcement, barangay: &str) -> Self {
        Self::new(
            to,
            format!("{}: {}", barangay, announcement.title),
            format!(
                "{}\n\n{}\n\nCategory: {}\n\n{}",
                announcement.title, announcement.description, announcement.category, barangay,
            ),
        )
    }

    pub fn verification_status(resident: &Resident, barangay: &str) -> Self {
        let headline = match resident.verification.status {
            VerificationStatus::Pending => "is pending review",
            VerificationStatus::Verified => "has been approved",
            VerificationStatus::Rejected => "was not approved",
        };
        Self::new(
            &resident.contact_info.email,
            format!("Your resident verification {}", headline),
            format!(
                "Hello {},\n\nYour resident verification {}.{}\n\n{}",
                resident.personal_info.full_name(),
                headline,
                notes_line(resident.verification.notes.as_deref()),
                barangay,
            ),
        )
    }
}

fn notes_line(notes: Option<&str>) -> String {
    match notes.map(str::trim) {
        Some(notes) if !notes.is_empty() => format!("\n\nNotes: {}", notes),
        _ => String::new(),
    }
}

/// Email API client
#[derive(Clone)]
pub struct HttpEmailSender {
    http_client: Arc<reqwest::Client>,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpEmailSender {
    pub fn new(
        http_client: Arc<reqwest::Client>,
        endpoint: String,
        api_key: Option<String>,
        from_address: String,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            api_key,
            from_address,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        let body = EmailRequest {
            from: &self.from_address,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Failed to reach email API: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "Email API rejected message to {}: HTTP {}",
                message.to,
                response.status()
            )));
        }

        Ok(())
    }
}

/// Sender used when no email API is configured
#[derive(Debug, Clone, Default)]
pub struct LogOnlyEmailSender;

#[async_trait]
impl EmailSender for LogOnlyEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email (not delivered: no email API configured)"
        );
        Ok(())
    }
}
