//! Upload storage using Cloudflare R2
//!
//! Files are served via an R2 Custom Domain.

use aws_sdk_s3::Client as S3Client;
use axum::async_trait;

use super::{ObjectStorage, StoredObject, build_r2_http_client, extension_for};
use crate::data::EntityId;
use crate::error::AppError;
use crate::metrics::UPLOADS_TOTAL;

/// R2-backed object storage
pub struct MediaStorage {
    /// S3-compatible client for R2
    client: S3Client,
    bucket: String,
    /// Public URL base (Custom Domain), e.g. "https://files.example.gov.ph"
    public_url: String,
}

impl MediaStorage {
    /// Create new R2 client
    ///
    /// # Errors
    /// Returns error if the public URL is not a valid URL
    pub fn new(
        config: &crate::config::MediaStorageConfig,
        cloudflare: &crate::config::CloudflareConfig,
    ) -> Result<Self, AppError> {
        use aws_sdk_s3::config::BehaviorVersion;
        use aws_sdk_s3::config::{Credentials, Region};

        url::Url::parse(&config.public_url)
            .map_err(|e| AppError::Config(format!("storage.media.public_url: {}", e)))?;

        // R2 endpoint: https://{account_id}.r2.cloudflarestorage.com
        let endpoint = format!("https://{}.r2.cloudflarestorage.com", cloudflare.account_id);

        let credentials = Credentials::new(
            &cloudflare.r2_access_key_id,
            &cloudflare.r2_secret_access_key,
            None,
            None,
            "barangay-r2",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .http_client(build_r2_http_client())
            .region(Region::new("auto"))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Public URL for an object key
    pub fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[async_trait]
impl ObjectStorage for MediaStorage {
    async fn upload(
        &self,
        data: Vec<u8>,
        folder: &str,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        use aws_sdk_s3::primitives::ByteStream;

        if data.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_string()));
        }
        let key = format!(
            "{}/{}.{}",
            folder.trim_matches('/'),
            EntityId::new().0,
            extension_for(content_type)?
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .cache_control("public, max-age=31536000") // 1 year
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        UPLOADS_TOTAL.with_label_values(&[folder]).inc();
        tracing::debug!(%key, "Uploaded object");

        Ok(StoredObject {
            url: self.get_public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;

        tracing::debug!(%key, "Deleted object");
        Ok(())
    }
}
