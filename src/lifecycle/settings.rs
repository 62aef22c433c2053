//! Settings service
//!
//! Reads and edits the process-wide settings document. Reads go through a
//! short-lived cache because every notification dispatch consults it.

use std::sync::Arc;

use serde_json::Value;

use crate::data::{Settings, SettingsCache, Store, collections, decode, encode};
use crate::error::AppError;

/// Settings service
pub struct SettingsService {
    store: Arc<dyn Store>,
    cache: SettingsCache,
}

impl SettingsService {
    /// Create new settings service
    pub fn new(store: Arc<dyn Store>, cache: SettingsCache) -> Self {
        Self { store, cache }
    }

    /// Current settings; defaults fill anything never saved
    pub async fn get(&self) -> Result<Arc<Settings>, AppError> {
        if let Some(settings) = self.cache.get().await {
            return Ok(settings);
        }

        let settings = match self.store.get(collections::SETTINGS).await? {
            Some(value) => decode::<Settings>(value)?,
            None => Settings::default(),
        };
        let settings = Arc::new(settings);
        self.cache.insert(settings.clone()).await;
        Ok(settings)
    }

    /// Merge a partial settings document into the stored one
    ///
    /// Nested sections merge key by key, so `{"notifications":
    /// {"emailNotifications": false}}` leaves every other toggle alone.
    ///
    /// # Errors
    /// Returns `Validation` if the merged document is not a valid settings
    /// document (wrong field types).
    pub async fn update(&self, patch: Value) -> Result<Settings, AppError> {
        let Value::Object(_) = patch else {
            return Err(AppError::Validation(
                "settings update must be an object".to_string(),
            ));
        };

        let current = match self.store.get(collections::SETTINGS).await? {
            Some(value) => decode::<Settings>(value)?,
            None => Settings::default(),
        };

        let mut merged = encode(&current)?;
        merge_into(&mut merged, patch);
        let settings: Settings = serde_json::from_value(merged)
            .map_err(|e| AppError::Validation(format!("invalid settings: {}", e)))?;

        self.store
            .set(collections::SETTINGS, encode(&settings)?)
            .await?;
        self.cache.invalidate().await;

        tracing::info!("Settings updated");
        Ok(settings)
    }
}

/// Deep merge: objects merge recursively, everything else replaces
fn merge_into(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_into(existing, value)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
