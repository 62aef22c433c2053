//! Data layer module
//!
//! Handles all data persistence and caching:
//! - Store port (hierarchical, path-addressed documents)
//! - SQLite-backed store implementation
//! - Settings cache (volatile)

mod cache;
mod models;
mod sqlite;
mod store;

pub use cache::SettingsCache;
pub use models::*;
pub use sqlite::SqliteStore;
pub use store::{
    PathWrite, Store, child_path, count_children, decode, decode_children, decode_rows, encode,
    normalize_path,
};

#[cfg(test)]
mod store_test;
