//! Community event endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::{DeleteParams, EventQuery};
use super::extract::{JsonBody, QueryParams};
use crate::AppState;
use crate::data::{ArchiveEntry, Event};
use crate::error::ActionResult;
use crate::lifecycle::{EventUpdate, NewEvent};

/// Create events router
///
/// Routes:
/// - GET /events?status=&category=
/// - POST /events
/// - GET /events/featured
/// - GET /events/upcoming
/// - GET /events/:id
/// - PATCH /events/:id
/// - DELETE /events/:id?archivedBy=
/// - POST /events/:id/toggle-status
/// - POST /events/:id/toggle-featured
pub fn events_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/featured", get(featured_events))
        .route("/upcoming", get(upcoming_events))
        .route(
            "/:id",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/:id/toggle-status", post(toggle_status))
        .route("/:id/toggle-featured", post(toggle_featured))
}

async fn list_events(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<EventQuery>,
) -> ActionResult<Vec<Event>> {
    match (params.status, params.category) {
        (Some(status), None) => state.events.list_by_status(status).await,
        (None, Some(category)) => state.events.list_by_category(&category).await,
        (Some(status), Some(category)) => {
            state.events.list_by_category(&category).await.map(|mut events| {
                events.retain(|e| e.status == status);
                events
            })
        }
        (None, None) => state.events.list().await,
    }
    .into()
}

async fn create_event(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewEvent>,
) -> ActionResult<Event> {
    state.events.create(request).await.into()
}

async fn featured_events(State(state): State<AppState>) -> ActionResult<Vec<Event>> {
    state.events.featured().await.into()
}

async fn upcoming_events(State(state): State<AppState>) -> ActionResult<Vec<Event>> {
    state.events.upcoming().await.into()
}

async fn get_event(State(state): State<AppState>, Path(id): Path<String>) -> ActionResult<Event> {
    state.events.get(&id).await.into()
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<EventUpdate>,
) -> ActionResult<Event> {
    state.events.update(&id, changes).await.into()
}

async fn toggle_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Event> {
    state.events.toggle_status(&id).await.into()
}

async fn toggle_featured(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Event> {
    state.events.toggle_featured(&id).await.into()
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> ActionResult<ArchiveEntry> {
    state.events.delete(&id, params.actor()).await.into()
}
