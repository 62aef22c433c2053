//! Resident verification endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::{DeleteParams, ResidentQuery, VerificationRequest};
use super::extract::{JsonBody, QueryParams};
use crate::AppState;
use crate::data::{ArchiveEntry, Resident};
use crate::error::ActionResult;
use crate::lifecycle::ResidentRegistration;

/// Create residents router
///
/// Routes:
/// - GET /residents?status=
/// - GET /residents/:uid
/// - PUT /residents/:uid (submit registration)
/// - DELETE /residents/:uid?archivedBy=
/// - POST /residents/:uid/verification
pub fn residents_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_residents))
        .route(
            "/:uid",
            get(get_resident)
                .put(submit_registration)
                .delete(delete_resident),
        )
        .route("/:uid/verification", post(update_verification))
}

async fn list_residents(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ResidentQuery>,
) -> ActionResult<Vec<Resident>> {
    match params.status {
        Some(status) => state.residents.list_by_verification_status(status).await,
        None => state.residents.list().await,
    }
    .into()
}

async fn get_resident(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ActionResult<Resident> {
    state.residents.get(&uid).await.into()
}

async fn submit_registration(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    JsonBody(registration): JsonBody<ResidentRegistration>,
) -> ActionResult<Resident> {
    state.residents.submit(&uid, registration).await.into()
}

async fn update_verification(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    JsonBody(request): JsonBody<VerificationRequest>,
) -> ActionResult<Resident> {
    state
        .residents
        .update_verification(&uid, request.status, request.notes, request.reviewed_by)
        .await
        .into()
}

async fn delete_resident(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> ActionResult<ArchiveEntry> {
    state.residents.delete(&uid, params.actor()).await.into()
}
