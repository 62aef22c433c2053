//! Appointment endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::{AppointmentQuery, DeleteParams, RescheduleRequest, UpcomingParams};
use super::extract::{JsonBody, QueryParams};
use crate::AppState;
use crate::data::{Appointment, ArchiveEntry};
use crate::error::ActionResult;
use crate::lifecycle::{AppointmentAction, NewAppointment};

const DEFAULT_UPCOMING_LIMIT: usize = 10;

/// Create appointments router
///
/// Routes:
/// - GET /appointments?status=&userId=
/// - POST /appointments
/// - GET /appointments/upcoming?limit=
/// - GET /appointments/:id
/// - DELETE /appointments/:id?archivedBy=
/// - POST /appointments/:id/status
/// - POST /appointments/:id/reschedule
pub fn appointments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/upcoming", get(upcoming_appointments))
        .route("/:id", get(get_appointment).delete(delete_appointment))
        .route("/:id/status", post(update_status))
        .route("/:id/reschedule", post(reschedule_appointment))
}

async fn list_appointments(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<AppointmentQuery>,
) -> ActionResult<Vec<Appointment>> {
    match (params.status, params.user_id) {
        (Some(status), _) => state.appointments.list_by_status(status).await,
        (None, Some(user_id)) => state.appointments.list_by_user(&user_id).await,
        (None, None) => state.appointments.list().await,
    }
    .into()
}

async fn create_appointment(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewAppointment>,
) -> ActionResult<Appointment> {
    state.appointments.create(request).await.into()
}

async fn upcoming_appointments(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<UpcomingParams>,
) -> ActionResult<Vec<Appointment>> {
    let limit = params.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    state.appointments.upcoming(limit).await.into()
}

async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Appointment> {
    state.appointments.get(&id).await.into()
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(action): JsonBody<AppointmentAction>,
) -> ActionResult<Appointment> {
    state.appointments.transition(&id, action).await.into()
}

async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<RescheduleRequest>,
) -> ActionResult<Appointment> {
    state
        .appointments
        .reschedule(&id, &request.date, &request.time)
        .await
        .into()
}

async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> ActionResult<ArchiveEntry> {
    state.appointments.delete(&id, params.actor()).await.into()
}
