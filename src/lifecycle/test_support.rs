//! Shared fixtures for lifecycle tests

use std::sync::Arc;

use axum::async_trait;
use chrono::FixedOffset;
use serde_json::{Map, Value};
use tempfile::TempDir;

use super::SettingsService;
use crate::data::{PathWrite, SettingsCache, SqliteStore, Store};
use crate::error::AppError;
use crate::notify::{
    Dispatcher, EmailSender, LogOnlyEmailSender, LogOnlyPushSender, NotificationSender,
};

/// Fresh SQLite store in a temporary directory
pub async fn create_test_store() -> (Arc<dyn Store>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::connect(&temp_dir.path().join("test.db"))
        .await
        .unwrap();
    (Arc::new(store), temp_dir)
}

pub fn philippine_time() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

/// Dispatcher over the given senders, reading settings from `store`
pub fn dispatcher_with(
    store: Arc<dyn Store>,
    push: impl NotificationSender + 'static,
    email: impl EmailSender + 'static,
) -> Dispatcher {
    let settings = Arc::new(SettingsService::new(store, SettingsCache::new(0)));
    Dispatcher::new(
        Arc::new(push),
        Arc::new(email),
        settings,
        vec!["admin".to_string(), "official".to_string()],
    )
}

/// Dispatcher that only logs
pub fn quiet_dispatcher(store: Arc<dyn Store>) -> Dispatcher {
    dispatcher_with(store, LogOnlyPushSender, LogOnlyEmailSender)
}

/// Store that fails chosen write primitives; everything else passes through
pub struct FaultyStore {
    inner: Arc<dyn Store>,
    fail_writes: bool,
    fail_updates: bool,
}

impl FaultyStore {
    /// `write_paths` always fails
    pub fn failing_writes(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            fail_writes: true,
            fail_updates: false,
        }
    }

    /// `update` always fails
    pub fn failing_updates(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            fail_writes: false,
            fail_updates: true,
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, AppError> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), AppError> {
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError> {
        if self.fail_updates {
            return Err(AppError::Store("simulated update failure".to_string()));
        }
        self.inner.update(path, fields).await
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        self.inner.remove(path).await
    }

    async fn query_by_child(
        &self,
        path: &str,
        child: &str,
        equals: Value,
    ) -> Result<Vec<(String, Value)>, AppError> {
        self.inner.query_by_child(path, child, equals).await
    }

    async fn write_paths(&self, writes: Vec<PathWrite>) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::Store("simulated write failure".to_string()));
        }
        self.inner.write_paths(writes).await
    }

    async fn increment(&self, path: &str, seed: i64) -> Result<i64, AppError> {
        self.inner.increment(path, seed).await
    }
}
