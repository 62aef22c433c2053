//! Object storage
//!
//! Uploaded files (certificate signatures, ID photos, generated PDFs) live
//! in Cloudflare R2; records only keep their public URL.

mod media;

use axum::async_trait;

use crate::error::AppError;

pub use media::MediaStorage;

/// An uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key, needed to delete it again
    pub key: String,
    /// Public URL stored on the record
    pub url: String,
}

/// Object storage port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `folder` with a generated name
    async fn upload(
        &self,
        data: Vec<u8>,
        folder: &str,
        content_type: &str,
    ) -> Result<StoredObject, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// File extension for an accepted upload type
pub fn extension_for(content_type: &str) -> Result<&'static str, AppError> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "application/pdf" => Ok("pdf"),
        other => Err(AppError::Validation(format!(
            "unsupported file type: {}",
            other
        ))),
    }
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
