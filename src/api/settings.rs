//! Settings and dashboard endpoints

use axum::{
    Router,
    extract::State,
    routing::get,
};
use serde_json::Value;

use super::extract::JsonBody;
use crate::AppState;
use crate::data::Settings;
use crate::error::ActionResult;
use crate::lifecycle::DashboardStats;

/// Create settings router
///
/// Routes:
/// - GET /settings
/// - PATCH /settings (partial document, deep-merged)
pub fn settings_router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).patch(update_settings))
}

/// Create dashboard router
///
/// Routes:
/// - GET /dashboard
pub fn dashboard_router() -> Router<AppState> {
    Router::new().route("/", get(dashboard_stats))
}

async fn get_settings(State(state): State<AppState>) -> ActionResult<Settings> {
    state
        .settings
        .get()
        .await
        .map(|settings| Settings::clone(&settings))
        .into()
}

async fn update_settings(
    State(state): State<AppState>,
    JsonBody(patch): JsonBody<Value>,
) -> ActionResult<Settings> {
    state.settings.update(patch).await.into()
}

async fn dashboard_stats(State(state): State<AppState>) -> ActionResult<DashboardStats> {
    state.dashboard.stats().await.into()
}
