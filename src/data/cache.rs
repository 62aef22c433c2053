//! In-memory caches
//!
//! These caches are volatile and cleared on restart.
//! Uses Moka for concurrent caching.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::models::Settings;

const SETTINGS_KEY: &str = "settings";

// =============================================================================
// Settings Cache
// =============================================================================

/// Settings cache
///
/// The settings document is read on every notification dispatch; a short
/// TTL keeps that from becoming a store round-trip per send while still
/// picking up edits made by another process.
pub struct SettingsCache {
    entries: Cache<&'static str, Arc<Settings>>,
}

impl SettingsCache {
    /// Create new settings cache
    ///
    /// # Arguments
    /// * `ttl_seconds` - Time to live; 0 disables caching
    pub fn new(ttl_seconds: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();

        Self { entries }
    }

    /// Get cached settings
    pub async fn get(&self) -> Option<Arc<Settings>> {
        let result = self.entries.get(SETTINGS_KEY).await;

        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
        if result.is_some() {
            CACHE_HITS_TOTAL.with_label_values(&["settings"]).inc();
        } else {
            CACHE_MISSES_TOTAL.with_label_values(&["settings"]).inc();
        }

        result
    }

    /// Insert or replace cached settings
    pub async fn insert(&self, settings: Arc<Settings>) {
        self.entries.insert(SETTINGS_KEY, settings).await;
    }

    /// Drop cached settings so the next read goes to the store
    pub async fn invalidate(&self) {
        self.entries.invalidate(SETTINGS_KEY).await;
    }
}
