//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cloudflare: CloudflareConfig,
    pub notifications: NotificationsConfig,
    pub barangay: BarangayConfig,
    pub reference_numbers: ReferenceNumberConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Browser origins allowed by CORS; any origin when empty
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body in bytes (default: 10 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

/// Store configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Storage configuration (Cloudflare R2)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub media: MediaStorageConfig,
}

/// Upload storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaStorageConfig {
    /// R2 bucket name for signatures, photos and verification documents
    pub bucket: String,
    /// Public URL for uploads (Custom Domain)
    /// e.g., "https://files.example.gov.ph"
    pub public_url: String,
}

/// Cloudflare credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// R2 access key ID
    pub r2_access_key_id: String,
    /// R2 secret access key
    pub r2_secret_access_key: String,
}

/// Outbound notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub push: PushConfig,
    pub email: EmailConfig,
    /// Roles that receive staff-facing push notifications
    #[serde(default = "default_staff_roles")]
    pub staff_roles: Vec<String>,
}

/// Push gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushConfig {
    /// Gateway URL; push is logged only when unset
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// Email API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Email API URL; email is logged only when unset
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Sender address
    pub from_address: String,
}

fn default_staff_roles() -> Vec<String> {
    vec!["admin".to_string(), "official".to_string()]
}

/// Barangay locality settings
#[derive(Debug, Clone, Deserialize)]
pub struct BarangayConfig {
    /// Local time offset from UTC in minutes (default: 480 = UTC+08:00)
    pub utc_offset_minutes: i32,
    /// Seconds between announcement expiry sweeps; 0 disables the sweep
    #[serde(default = "default_expiry_sweep_seconds")]
    pub expiry_sweep_seconds: u64,
}

fn default_expiry_sweep_seconds() -> u64 {
    3600
}

impl BarangayConfig {
    /// Fixed offset used for calendar dates (reference numbers, "today")
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

/// Reference number sequencing strategy
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceStrategy {
    /// Atomic increment-and-get counter per collection
    #[default]
    Atomic,
    /// Count existing records and add one (racy under concurrent creates)
    Count,
}

/// Reference number configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceNumberConfig {
    #[serde(default)]
    pub strategy: ReferenceStrategy,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Settings cache TTL in seconds (default: 30)
    pub settings_ttl: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (BARANGAY__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/barangay.db")?
            .set_default("notifications.email.from_address", "no-reply@barangay.local")?
            .set_default("barangay.utc_offset_minutes", 480)?
            .set_default("reference_numbers.strategy", "atomic")?
            .set_default("cache.settings_ttl", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (BARANGAY__*)
            .add_source(
                Environment::with_prefix("BARANGAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MAX_OFFSET_MINUTES: i32 = 14 * 60;

        if self.barangay.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(crate::error::AppError::Config(format!(
                "barangay.utc_offset_minutes must be within ±{}",
                MAX_OFFSET_MINUTES
            )));
        }

        for origin in &self.server.allowed_origins {
            url::Url::parse(origin).map_err(|e| {
                crate::error::AppError::Config(format!(
                    "server.allowed_origins entry {:?} is not a valid URL: {}",
                    origin, e
                ))
            })?;
        }

        for (key, endpoint) in [
            ("notifications.push.endpoint", &self.notifications.push.endpoint),
            ("notifications.email.endpoint", &self.notifications.email.endpoint),
        ] {
            if let Some(endpoint) = endpoint {
                url::Url::parse(endpoint).map_err(|e| {
                    crate::error::AppError::Config(format!("{} is not a valid URL: {}", key, e))
                })?;
            }
        }

        if self.notifications.push.endpoint.is_none() {
            tracing::warn!("notifications.push.endpoint is not set; push notifications will only be logged");
        }
        if self.notifications.email.endpoint.is_none() {
            tracing::warn!("notifications.email.endpoint is not set; emails will only be logged");
        }

        Ok(())
    }
}
