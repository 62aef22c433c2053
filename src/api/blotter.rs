//! Blotter (incident report) endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::{BlotterQuery, DeleteParams};
use super::extract::{JsonBody, QueryParams};
use crate::AppState;
use crate::data::{ArchiveEntry, BlotterEntry};
use crate::error::ActionResult;
use crate::lifecycle::{BlotterAction, BlotterDetails, NewBlotterEntry};

/// Create blotter router
///
/// Routes:
/// - GET /blotter?status=&priority=&q=
/// - POST /blotter
/// - GET /blotter/:id
/// - PATCH /blotter/:id
/// - DELETE /blotter/:id?archivedBy=
/// - POST /blotter/:id/status
pub fn blotter_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(file_report))
        .route(
            "/:id",
            get(get_entry).patch(update_details).delete(delete_entry),
        )
        .route("/:id/status", post(update_status))
}

async fn list_entries(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<BlotterQuery>,
) -> ActionResult<Vec<BlotterEntry>> {
    match params {
        BlotterQuery {
            status: Some(status),
            ..
        } => state.blotter.list_by_status(status).await,
        BlotterQuery {
            priority: Some(priority),
            ..
        } => state.blotter.list_by_priority(priority).await,
        BlotterQuery { q: Some(q), .. } => state.blotter.search(&q).await,
        _ => state.blotter.list().await,
    }
    .into()
}

async fn file_report(
    State(state): State<AppState>,
    JsonBody(report): JsonBody<NewBlotterEntry>,
) -> ActionResult<BlotterEntry> {
    state.blotter.create(report).await.into()
}

async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<BlotterEntry> {
    state.blotter.get(&id).await.into()
}

async fn update_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(details): JsonBody<BlotterDetails>,
) -> ActionResult<BlotterEntry> {
    state.blotter.update_details(&id, details).await.into()
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(action): JsonBody<BlotterAction>,
) -> ActionResult<BlotterEntry> {
    state.blotter.transition(&id, action).await.into()
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> ActionResult<ArchiveEntry> {
    state.blotter.delete(&id, params.actor()).await.into()
}
