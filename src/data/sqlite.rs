//! SQLite-backed document store
//!
//! The document tree is flattened into one row per leaf, keyed by its full
//! path. A subtree is the contiguous key range `[path/, path0)`, so reads
//! and deletes of a subtree are single indexed range scans. Multi-path
//! writes run inside one transaction.

use std::path::Path;
use std::time::{Duration, Instant};

use axum::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Pool, Sqlite, SqlitePool, Transaction};

use super::store::{PathWrite, Store, child_path, normalize_path};
use crate::error::AppError;
use crate::metrics::observe_store;

/// Store implementation over a single SQLite file
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

/// Key range holding every descendant of `path`.
///
/// `'0'` is the character right after `'/'`, so `[path/, path0)` contains
/// exactly the keys that start with `path/`.
fn subtree_bounds(path: &str) -> (String, String) {
    (format!("{}/", path), format!("{}0", path))
}

/// Proper ancestors of `path`, shortest first
fn ancestors(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').collect();
    (1..segments.len())
        .map(|end| segments[..end].join("/"))
        .collect()
}

/// Flatten a value into `(leaf path, JSON text)` rows.
///
/// Objects recurse, `null` and empty objects produce nothing, and scalars
/// and arrays are stored whole.
fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&child_path(prefix, key), child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.to_string())),
    }
}

/// Segments of `path` below `base`
fn relative_segments<'a>(base: &str, path: &'a str) -> Vec<&'a str> {
    let rest = if base.is_empty() {
        path
    } else if path == base {
        ""
    } else {
        &path[base.len() + 1..]
    };

    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}

/// Rebuild the subtree at `base` from its leaf rows
fn assemble(base: &str, rows: Vec<(String, String)>) -> Result<Option<Value>, AppError> {
    let mut root: Option<Value> = None;

    for (path, raw) in rows {
        let leaf: Value = serde_json::from_str(&raw)?;
        let segments = relative_segments(base, &path);
        let Some((last, parents)) = segments.split_last() else {
            return Ok(Some(leaf));
        };

        let mut node = root.get_or_insert_with(|| Value::Object(Map::new()));
        for segment in parents {
            node = match node {
                Value::Object(map) => map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => {
                    return Err(AppError::Store(format!(
                        "leaf stored above {}",
                        path
                    )));
                }
            };
        }

        match node {
            Value::Object(map) => {
                map.insert(last.to_string(), leaf);
            }
            _ => return Err(AppError::Store(format!("leaf stored above {}", path))),
        }
    }

    Ok(root)
}

/// Reject multi-path writes where one path contains another
fn ensure_disjoint(paths: &[String]) -> Result<(), AppError> {
    for (index, path) in paths.iter().enumerate() {
        for other in &paths[index + 1..] {
            let overlaps = path == other
                || path.is_empty()
                || other.is_empty()
                || other.starts_with(&format!("{}/", path))
                || path.starts_with(&format!("{}/", other));
            if overlaps {
                return Err(AppError::Validation(format!(
                    "overlapping paths in one update: {} and {}",
                    path, other
                )));
            }
        }
    }
    Ok(())
}

impl SqliteStore {
    /// Connect to SQLite store
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Concurrent writers wait on the lock rather than failing with SQLITE_BUSY.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Store connected and migrated successfully");

        Ok(Self { pool })
    }

    async fn read_rows(&self, path: &str) -> Result<Vec<(String, String)>, AppError> {
        let rows = if path.is_empty() {
            sqlx::query_as::<_, (String, String)>("SELECT path, value FROM nodes ORDER BY path")
                .fetch_all(&self.pool)
                .await?
        } else {
            let (lower, upper) = subtree_bounds(path);
            sqlx::query_as::<_, (String, String)>(
                "SELECT path, value FROM nodes WHERE path = ?1 OR (path >= ?2 AND path < ?3) ORDER BY path",
            )
            .bind(path)
            .bind(lower)
            .bind(upper)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    /// Replace (or delete) one path inside an open transaction
    async fn apply_write(
        tx: &mut Transaction<'_, Sqlite>,
        path: &str,
        value: Option<&Value>,
    ) -> Result<(), AppError> {
        let mut leaves = Vec::new();
        if let Some(value) = value {
            flatten(path, value, &mut leaves);
        }
        if path.is_empty() && leaves.iter().any(|(leaf, _)| leaf.is_empty()) {
            return Err(AppError::Validation(
                "the store root can only hold an object".to_string(),
            ));
        }

        if path.is_empty() {
            sqlx::query("DELETE FROM nodes").execute(&mut **tx).await?;
        } else {
            let (lower, upper) = subtree_bounds(path);
            sqlx::query("DELETE FROM nodes WHERE path = ?1 OR (path >= ?2 AND path < ?3)")
                .bind(path)
                .bind(lower)
                .bind(upper)
                .execute(&mut **tx)
                .await?;
        }

        if leaves.is_empty() {
            return Ok(());
        }

        for ancestor in ancestors(path) {
            sqlx::query("DELETE FROM nodes WHERE path = ?1")
                .bind(ancestor)
                .execute(&mut **tx)
                .await?;
        }

        for (leaf_path, raw) in leaves {
            sqlx::query("INSERT OR REPLACE INTO nodes (path, value) VALUES (?1, ?2)")
                .bind(leaf_path)
                .bind(raw)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, AppError> {
        let started = Instant::now();
        let path = normalize_path(path)?;
        let rows = self.read_rows(&path).await?;
        observe_store("get", &path, started.elapsed());
        assemble(&path, rows)
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), AppError> {
        self.write_paths(vec![PathWrite::put(path, value)]).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError> {
        let writes = fields
            .into_iter()
            .map(|(key, value)| {
                let target = child_path(path, &key);
                if value.is_null() {
                    PathWrite::delete(target)
                } else {
                    PathWrite::put(target, value)
                }
            })
            .collect();
        self.write_paths(writes).await
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        self.write_paths(vec![PathWrite::delete(path)]).await
    }

    async fn query_by_child(
        &self,
        path: &str,
        child: &str,
        equals: Value,
    ) -> Result<Vec<(String, Value)>, AppError> {
        let pointer = format!("/{}", normalize_path(child)?);
        let Some(Value::Object(children)) = self.get(path).await? else {
            return Ok(Vec::new());
        };

        Ok(children
            .into_iter()
            .filter(|(_, value)| value.pointer(&pointer) == Some(&equals))
            .collect())
    }

    async fn write_paths(&self, writes: Vec<PathWrite>) -> Result<(), AppError> {
        if writes.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        let mut normalized = Vec::with_capacity(writes.len());
        for write in &writes {
            normalized.push(normalize_path(&write.path)?);
        }
        ensure_disjoint(&normalized)?;

        let mut tx = self.pool.begin().await?;
        for (path, write) in normalized.iter().zip(writes.iter()) {
            Self::apply_write(&mut tx, path, write.value.as_ref()).await?;
        }
        tx.commit().await?;

        observe_store("write", &normalized[0], started.elapsed());
        Ok(())
    }

    async fn increment(&self, path: &str, seed: i64) -> Result<i64, AppError> {
        let started = Instant::now();
        let path = normalize_path(path)?;

        let (value,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO nodes (path, value) VALUES (?1, ?2)
            ON CONFLICT(path) DO UPDATE SET value = CAST(CAST(nodes.value AS INTEGER) + 1 AS TEXT)
            RETURNING value
            "#,
        )
        .bind(&path)
        .bind(seed.to_string())
        .fetch_one(&self.pool)
        .await?;

        observe_store("increment", &path, started.elapsed());
        value
            .parse::<i64>()
            .map_err(|e| AppError::Store(format!("counter at {} is not an integer: {}", path, e)))
    }
}
