//! Certificate request endpoints

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
    routing::{get, post, put},
};

use super::dto::{CertificateQuery, DeleteParams, GeneratedPdfRequest};
use super::extract::{JsonBody, QueryParams};
use crate::AppState;
use crate::data::{ArchiveEntry, Certificate};
use crate::error::ActionResult;
use crate::lifecycle::{CertificateAction, NewCertificate};

/// Create certificates router
///
/// Routes:
/// - GET /certificates?status=&userId=
/// - POST /certificates
/// - GET /certificates/:id
/// - DELETE /certificates/:id?archivedBy=
/// - POST /certificates/:id/status
/// - PUT /certificates/:id/signature (raw image body)
/// - POST /certificates/:id/pdf
pub fn certificates_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_certificates).post(create_certificate))
        .route("/:id", get(get_certificate).delete(delete_certificate))
        .route("/:id/status", post(update_status))
        .route("/:id/signature", put(attach_signature))
        .route("/:id/pdf", post(record_pdf))
}

async fn list_certificates(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CertificateQuery>,
) -> ActionResult<Vec<Certificate>> {
    match (params.status, params.user_id) {
        (Some(status), _) => state.certificates.list_by_status(status).await,
        (None, Some(user_id)) => state.certificates.list_by_user(&user_id).await,
        (None, None) => state.certificates.list().await,
    }
    .into()
}

async fn create_certificate(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewCertificate>,
) -> ActionResult<Certificate> {
    state.certificates.create(request).await.into()
}

async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<Certificate> {
    state.certificates.get(&id).await.into()
}

/// POST /certificates/:id/status
///
/// Body is a tagged action, e.g. `{"action": "reject", "reason": "..."}`.
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(action): JsonBody<CertificateAction>,
) -> ActionResult<Certificate> {
    state.certificates.transition(&id, action).await.into()
}

async fn attach_signature(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    data: Bytes,
) -> ActionResult<Certificate> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .unwrap_or("application/octet-stream");
    state
        .certificates
        .attach_signature(&id, data.to_vec(), content_type)
        .await
        .into()
}

async fn record_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<GeneratedPdfRequest>,
) -> ActionResult<Certificate> {
    state
        .certificates
        .record_generated_pdf(&id, &request.pdf_url)
        .await
        .into()
}

async fn delete_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> ActionResult<ArchiveEntry> {
    state.certificates.delete(&id, params.actor()).await.into()
}
