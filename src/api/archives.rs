//! Archive endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::ArchiveQuery;
use super::extract::QueryParams;
use crate::AppState;
use crate::data::ArchiveEntry;
use crate::error::ActionResult;

/// Create archives router
///
/// Routes:
/// - GET /archives?entity=
/// - GET /archives/:entity/:id
/// - DELETE /archives/:entity/:id (purge)
/// - POST /archives/:entity/:id/restore
pub fn archives_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_archived))
        .route(
            "/:entity/:id",
            get(get_archived).delete(purge_archived),
        )
        .route("/:entity/:id/restore", post(restore_archived))
}

async fn list_archived(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ArchiveQuery>,
) -> ActionResult<Vec<ArchiveEntry>> {
    match params.entity {
        Some(entity) => state.archives.get_archived_items_for(&entity).await,
        None => state.archives.get_archived_items().await,
    }
    .into()
}

async fn get_archived(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> ActionResult<ArchiveEntry> {
    state.archives.get_archived_item(&entity, &id).await.into()
}

async fn restore_archived(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> ActionResult<ArchiveEntry> {
    state
        .archives
        .restore_archived_item(&entity, &id)
        .await
        .into()
}

async fn purge_archived(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> ActionResult<()> {
    state
        .archives
        .delete_archived_item(&entity, &id)
        .await
        .into()
}
