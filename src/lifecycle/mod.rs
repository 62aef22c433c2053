//! Record lifecycle layer
//!
//! Business logic for every portal record: status machines, CRUD and
//! queries, archive/restore, reference numbers and settings. HTTP handlers
//! stay thin and call into these services.

mod announcement;
mod appointment;
mod archive;
mod blotter;
mod certificate;
mod dashboard;
mod event;
mod reference;
mod resident;
mod settings;
mod transition;

#[cfg(test)]
mod test_support;

pub use announcement::{AnnouncementService, AnnouncementUpdate, NewAnnouncement};
pub use appointment::{AppointmentAction, AppointmentService, NewAppointment};
pub use archive::ArchiveService;
pub use blotter::{BlotterAction, BlotterDetails, BlotterService, NewBlotterEntry};
pub use certificate::{CertificateAction, CertificateService, NewCertificate};
pub use dashboard::{DashboardService, DashboardStats, StatusCounts};
pub use event::{EventService, EventUpdate, NewEvent};
pub use reference::{
    APPOINTMENT_PREFIX, BLOTTER_PREFIX, ReferenceNumberGenerator, format_reference_number,
};
pub use resident::{
    AccountDirectory, LoggingAccountDirectory, ResidentRegistration, ResidentService,
};
pub use settings::SettingsService;
pub use transition::Transition;

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::de::DeserializeOwned;

use crate::data::{Store, child_path, decode, decode_children};
use crate::error::AppError;

/// Today's calendar date in the barangay's timezone
pub fn local_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Load one record or fail with `NotFound`
async fn load<T: DeserializeOwned>(
    store: &dyn Store,
    collection: &str,
    entity: &str,
    id: &str,
) -> Result<T, AppError> {
    if id.trim().is_empty() || id.contains('/') {
        return Err(AppError::not_found(entity, id));
    }
    let value = store
        .get(&child_path(collection, id))
        .await?
        .ok_or_else(|| AppError::not_found(entity, id))?;
    decode(value)
}

/// Every record in a collection, in key order
async fn load_all<T: DeserializeOwned>(
    store: &dyn Store,
    collection: &str,
) -> Result<Vec<T>, AppError> {
    Ok(decode_children(collection, store.get(collection).await?))
}
