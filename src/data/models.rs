//! Data models
//!
//! Rust structs representing the documents kept in the store.
//! Field names are camelCase on the wire and in the store; ids are ULIDs
//! and timestamps are chrono values.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire names for status-like enums, matching their serde names
macro_rules! wire_names {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// =============================================================================
// Collections
// =============================================================================

/// Top-level collection names
pub mod collections {
    pub const CERTIFICATES: &str = "certificates";
    pub const APPOINTMENTS: &str = "appointments";
    pub const BLOTTER: &str = "blotter";
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const EVENTS: &str = "events";
    pub const RESIDENTS: &str = "residents";
    pub const USERS: &str = "users";
    pub const ARCHIVES: &str = "archives";
    pub const COUNTERS: &str = "counters";
    pub const SETTINGS: &str = "settings";
}

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Time-sortable and collision resistant; assigned once at creation.
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Certificate
// =============================================================================

/// Certificate request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CertificateStatus {
    Pending,
    Processing,
    Ready,
    Completed,
    Rejected,
    AdditionalInfo,
}

wire_names!(CertificateStatus {
    Pending => "pending",
    Processing => "processing",
    Ready => "ready",
    Completed => "completed",
    Rejected => "rejected",
    AdditionalInfo => "additionalInfo",
});

/// A barangay certificate request (clearance, residency, indigency, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    #[serde(rename = "type")]
    pub certificate_type: String,
    pub requested_by: String,
    pub purpose: String,
    pub status: CertificateStatus,
    /// Requesting resident's uid, used for push notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_url: Option<String>,
    #[serde(default)]
    pub has_signature: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Appointment
// =============================================================================

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

wire_names!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

/// An appointment booked with the barangay office
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub reference_number: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    /// "HH:MM"
    pub time: String,
    pub requested_by: String,
    pub contact_number: String,
    pub email: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Blotter
// =============================================================================

/// Blotter report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlotterStatus {
    Pending,
    Investigating,
    Resolved,
    AdditionalInfo,
    Closed,
}

wire_names!(BlotterStatus {
    Pending => "pending",
    Investigating => "investigating",
    Resolved => "resolved",
    AdditionalInfo => "additionalInfo",
    Closed => "closed",
});

/// Blotter priority; independent of the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

wire_names!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// An incident ("blotter") report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlotterEntry {
    pub id: String,
    pub reference_number: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub description: String,
    pub reported_by: String,
    pub contact_number: String,
    pub email: String,
    pub status: BlotterStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<String>,
    /// Human readable filing date, e.g. "May 26, 2025"
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Announcement
// =============================================================================

/// Announcement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnouncementStatus {
    Draft,
    Published,
    Expired,
}

wire_names!(AnnouncementStatus {
    Draft => "draft",
    Published => "published",
    Expired => "expired",
});

/// Who may see an announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Public,
    Residents,
}

wire_names!(Visibility {
    Public => "public",
    Residents => "residents",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub visibility: Visibility,
    pub author: String,
    pub status: AnnouncementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Event
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventStatus {
    Active,
    Inactive,
}

wire_names!(EventStatus {
    Active => "active",
    Inactive => "inactive",
});

/// A community event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub description: String,
    pub category: String,
    pub organizer: String,
    pub contact: String,
    pub status: EventStatus,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Resident
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

wire_names!(VerificationStatus {
    Pending => "pending",
    Verified => "verified",
    Rejected => "rejected",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civil_status: Option<String>,
}

impl PersonalInfo {
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) if !middle.trim().is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purok: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

/// Identity documents and review state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub id_front_photo_url: String,
    pub id_back_photo_url: String,
    pub selfie_photo_url: String,
    pub status: VerificationStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Resident registration record at `residents/{uid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    /// Same as the key under `residents`
    #[serde(default)]
    pub uid: String,
    pub personal_info: PersonalInfo,
    pub contact_info: ContactInfo,
    pub address_info: AddressInfo,
    pub emergency_contact: EmergencyContact,
    pub verification: Verification,
    pub registration_date: DateTime<Utc>,
    /// Account standing, e.g. "active"
    pub status: String,
}

/// Linked account profile at `users/{uid}`
///
/// Only the fields the lifecycle reads are modelled; the rest of the
/// profile is left untouched because writes are field-level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub verification_status: Option<VerificationStatus>,
}

impl UserProfile {
    /// Resident accounts, as opposed to admin and official staff
    pub fn is_resident(&self) -> bool {
        self.role.as_deref() == Some("resident")
    }
}

// =============================================================================
// Archive
// =============================================================================

/// One captured `{path, value}` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedPath {
    pub path: String,
    pub value: Value,
}

/// Soft-deleted record snapshot at `archives/{entity}/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub entity: String,
    pub id: String,
    pub archived_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<String>,
    pub paths: Vec<ArchivedPath>,
    /// Small human-readable summary for listings
    #[serde(default)]
    pub preview: Map<String, Value>,
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BarangayInfo {
    pub name: String,
    pub address: String,
    pub contact_number: String,
    pub email: String,
}

impl Default for BarangayInfo {
    fn default() -> Self {
        Self {
            name: "Barangay".to_string(),
            address: String::new(),
            contact_number: String::new(),
            email: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfficeHours {
    pub weekdays: String,
    pub saturday: String,
    pub sunday: String,
}

impl Default for OfficeHours {
    fn default() -> Self {
        Self {
            weekdays: "8:00 AM - 5:00 PM".to_string(),
            saturday: "8:00 AM - 12:00 PM".to_string(),
            sunday: "Closed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    /// Global push notification switch
    pub system_notifications: bool,
    pub email_notifications: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            system_notifications: true,
            email_notifications: true,
        }
    }
}

/// Certificate signing identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateSettings {
    pub signatory_name: String,
    pub signatory_position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_url: Option<String>,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            signatory_name: String::new(),
            signatory_position: "Punong Barangay".to_string(),
            signature_url: None,
        }
    }
}

/// Process-wide settings document at `settings`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub barangay_info: BarangayInfo,
    pub office_hours: OfficeHours,
    pub notifications: NotificationSettings,
    pub certificate_settings: CertificateSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_use_camel_case_names() {
        assert_eq!(
            serde_json::to_value(CertificateStatus::AdditionalInfo).unwrap(),
            serde_json::json!("additionalInfo")
        );
        assert_eq!(
            serde_json::from_value::<BlotterStatus>(serde_json::json!("investigating")).unwrap(),
            BlotterStatus::Investigating
        );
        assert!(serde_json::from_value::<AppointmentStatus>(serde_json::json!("archived")).is_err());
    }

    #[test]
    fn wire_names_match_serde_names() {
        for status in [
            CertificateStatus::Pending,
            CertificateStatus::AdditionalInfo,
            CertificateStatus::Completed,
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert_eq!(BlotterStatus::AdditionalInfo.to_string(), "additionalInfo");
        assert_eq!(Priority::Urgent.to_string(), "urgent");
    }

    #[test]
    fn optional_fields_are_not_stored_as_null() {
        let now = Utc::now();
        let appointment = Appointment {
            id: "a1".to_string(),
            reference_number: "APT-2025-0526-001".to_string(),
            user_id: "u1".to_string(),
            title: "Consultation".to_string(),
            description: "Lot dispute".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 26).unwrap(),
            time: "09:00".to_string(),
            requested_by: "Juan Dela Cruz".to_string(),
            contact_number: "09171234567".to_string(),
            email: "juan@example.com".to_string(),
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&appointment).unwrap();
        assert!(value.get("notes").is_none());
        assert_eq!(value["date"], "2025-05-26");
        assert_eq!(value["referenceNumber"], "APT-2025-0526-001");
    }

    #[test]
    fn settings_fill_missing_sections_with_defaults() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "notifications": { "systemNotifications": false }
        }))
        .unwrap();
        assert!(!settings.notifications.system_notifications);
        assert!(settings.notifications.email_notifications);
        assert_eq!(settings.office_hours.sunday, "Closed");
    }
}
