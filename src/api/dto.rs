//! Request DTOs
//!
//! Query strings and bodies that are specific to the HTTP surface. Record
//! payloads (new records, actions, partial updates) are the lifecycle
//! types themselves.

use serde::Deserialize;

use crate::data::{
    AnnouncementStatus, AppointmentStatus, BlotterStatus, CertificateStatus, EventStatus, Priority,
    VerificationStatus,
};

/// `?archivedBy=` on delete routes
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    pub archived_by: Option<String>,
}

impl DeleteParams {
    pub fn actor(&self) -> Option<&str> {
        self.archived_by
            .as_deref()
            .map(str::trim)
            .filter(|actor| !actor.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateQuery {
    pub status: Option<CertificateStatus>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingParams {
    /// Maximum number of appointments (default: 10)
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlotterQuery {
    pub status: Option<BlotterStatus>,
    pub priority: Option<Priority>,
    /// Free-text search over type, reporter, description and reference
    pub q: Option<String>,
}

/// Who is reading announcements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Everything, including drafts (staff)
    #[default]
    Staff,
    /// Published residents-only and public announcements
    Residents,
    /// Published public announcements
    Public,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementQuery {
    pub status: Option<AnnouncementStatus>,
    pub category: Option<String>,
    #[serde(default)]
    pub audience: Audience,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub status: Option<EventStatus>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResidentQuery {
    pub status: Option<VerificationStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveQuery {
    pub entity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPdfRequest {
    #[serde(default)]
    pub pdf_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub status: VerificationStatus,
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
}
