//! Announcement endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::{AnnouncementQuery, Audience, DeleteParams};
use super::extract::{JsonBody, QueryParams};
use crate::AppState;
use crate::data::{Announcement, ArchiveEntry};
use crate::error::ActionResult;
use crate::lifecycle::{AnnouncementUpdate, NewAnnouncement, local_today};

/// Create announcements router
///
/// Routes:
/// - GET /announcements?audience=&status=&category=
/// - POST /announcements
/// - POST /announcements/expire
/// - GET /announcements/:id
/// - PATCH /announcements/:id
/// - DELETE /announcements/:id?archivedBy=
/// - POST /announcements/:id/publish
/// - POST /announcements/:id/unpublish
pub fn announcements_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements).post(create_announcement))
        .route("/expire", post(expire_overdue))
        .route(
            "/:id",
            get(get_announcement)
                .patch(update_announcement)
                .delete(delete_announcement),
        )
        .route("/:id/publish", post(publish_announcement))
        .route("/:id/unpublish", post(unpublish_announcement))
}

async fn list_announcements(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<AnnouncementQuery>,
) -> ActionResult<Vec<Announcement>> {
    let result = match (params.audience, params.status) {
        (Audience::Public, _) => state.announcements.list_visible(false).await,
        (Audience::Residents, _) => state.announcements.list_visible(true).await,
        (Audience::Staff, Some(status)) => state.announcements.list_by_status(status).await,
        (Audience::Staff, None) => state.announcements.list().await,
    };

    match params.category {
        Some(category) => result
            .map(|mut announcements| {
                announcements.retain(|a| a.category.eq_ignore_ascii_case(category.trim()));
                announcements
            })
            .into(),
        None => result.into(),
    }
}

async fn create_announcement(
    State(state): State<AppState>,
    JsonBody(draft): JsonBody<NewAnnouncement>,
) -> ActionResult<Announcement> {
    state.announcements.create(draft).await.into()
}

/// POST /announcements/expire
///
/// Expires published announcements past their `expiresOn`; returns the
/// ids that changed.
async fn expire_overdue(State(state): State<AppState>) -> ActionResult<Vec<String>> {
    let today = local_today(state.config.barangay.offset());
    state.announcements.expire_overdue(today).await.into()
}

async fn get_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Announcement> {
    state.announcements.get(&id).await.into()
}

async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<AnnouncementUpdate>,
) -> ActionResult<Announcement> {
    state.announcements.update(&id, changes).await.into()
}

async fn publish_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Announcement> {
    state.announcements.publish(&id).await.into()
}

async fn unpublish_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Announcement> {
    state.announcements.unpublish(&id).await.into()
}

async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> ActionResult<ArchiveEntry> {
    state.announcements.delete(&id, params.actor()).await.into()
}
