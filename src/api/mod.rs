//! API layer
//!
//! HTTP handlers for:
//! - Record lifecycles (certificates, appointments, blotter, announcements,
//!   events, residents)
//! - Archive browsing, restore and purge
//! - Settings and dashboard
//! - Metrics (Prometheus)
//!
//! Every handler answers with the `{"success", "data" | "error"}` envelope.

mod announcements;
mod appointments;
mod archives;
mod blotter;
mod certificates;
mod dto;
mod events;
mod extract;
pub mod metrics;
mod residents;
mod settings;

use axum::Router;

use crate::AppState;

pub use dto::*;
pub use extract::{JsonBody, QueryParams};
pub use metrics::metrics_router;

/// Create the portal API router, mounted under `/api`
pub fn portal_router() -> Router<AppState> {
    Router::new()
        .nest("/certificates", certificates::certificates_router())
        .nest("/appointments", appointments::appointments_router())
        .nest("/blotter", blotter::blotter_router())
        .nest("/announcements", announcements::announcements_router())
        .nest("/events", events::events_router())
        .nest("/residents", residents::residents_router())
        .nest("/archives", archives::archives_router())
        .nest("/settings", settings::settings_router())
        .nest("/dashboard", settings::dashboard_router())
}
