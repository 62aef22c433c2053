//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Once;

use barangay::{AppState, config};
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

static METRICS: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Test configuration over a database in `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            allowed_origins: Vec::new(),
            max_body_bytes: 1024 * 1024,
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        storage: config::StorageConfig {
            media: config::MediaStorageConfig {
                bucket: "test-uploads".to_string(),
                public_url: "https://files.test.example.com".to_string(),
            },
        },
        cloudflare: config::CloudflareConfig {
            account_id: "test-account".to_string(),
            r2_access_key_id: "test-key".to_string(),
            r2_secret_access_key: "test-secret".to_string(),
        },
        notifications: config::NotificationsConfig {
            push: config::PushConfig::default(),
            email: config::EmailConfig {
                endpoint: None,
                api_key: None,
                from_address: "no-reply@test.example.com".to_string(),
            },
            staff_roles: vec!["admin".to_string(), "official".to_string()],
        },
        barangay: config::BarangayConfig {
            utc_offset_minutes: 480,
            expiry_sweep_seconds: 0,
        },
        reference_numbers: config::ReferenceNumberConfig {
            strategy: config::ReferenceStrategy::Atomic,
        },
        cache: config::CacheConfig { settings_ttl: 0 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        METRICS.call_once(barangay::metrics::init_metrics);

        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = barangay::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    pub async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .patch(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.delete(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

/// Today's date in the barangay's timezone, shifted by `days`
pub fn local_date(days: i64) -> String {
    let offset = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
    let date = barangay::lifecycle::local_today(offset) + chrono::Duration::days(days);
    date.format("%Y-%m-%d").to_string()
}
