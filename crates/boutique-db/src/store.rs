//! # Document Store
//!
//! SQLite used as a namespaced key/value document store. Whole collections
//! are persisted as single JSON documents, one row per dataset per user.
//!
//! ## Why Documents, Not Tables?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          app_data                                       │
//! │                                                                         │
//! │  key                        │ value              │ updated_at          │
//! │  ───────────────────────────┼────────────────────┼───────────────      │
//! │  boutique.customers.<user>  │ [ {...}, {...} ]   │ 2025-03-05T...      │
//! │  boutique.sales.<user>      │ [ {...}, ... ]     │ 2025-03-05T...      │
//! │  boutique.products.<user>   │ [ ... ]            │ ...                 │
//! │                                                                         │
//! │  The working set is small and lives in memory; the store only ever     │
//! │  sees full-collection writes. A document row per dataset keeps the     │
//! │  save path one upsert per collection and load a single SELECT.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are bound at runtime: there is no relational schema to verify
//! against, just keys and JSON text.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/boutique.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a local single-user app)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,
}

impl StoreConfig {
    /// Creates a new store configuration with the given path.
    ///
    /// The database file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Creates an in-memory store configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let store = Store::open(StoreConfig::in_memory()).await?;
    /// // Store is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Handle to the document store.
///
/// Cheap to clone: clones share the underlying connection pool, which is
/// how the debounced saver gets its own handle.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens the store: creates the pool, enables WAL mode and ensures the
    /// `app_data` table exists.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening document store"
        );

        // sqlite://path with mode=rwc creates the file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            // WAL mode: readers don't block the saver, the saver doesn't
            // block readers
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: safe from corruption, may lose the very
            // last write on a crash - acceptable for a debounced cache of
            // in-memory state
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS app_data (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        info!(max_connections = config.max_connections, "Document store ready");
        Ok(Store { pool })
    }

    /// Upserts one document under `key`.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO app_data (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(key, "Document saved");
        Ok(())
    }

    /// Loads and parses the document under `key`. Missing key is `None`;
    /// a corrupt document is a `Serialization` error the caller decides
    /// how to survive.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let row: Option<String> = sqlx::query_scalar("SELECT value FROM app_data WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Deletes the document under `key`. Missing key is fine.
    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM app_data WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        debug!(key, "Document removed");
        Ok(())
    }

    /// Wipes every document in the store.
    pub async fn clear(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM app_data").execute(&self.pool).await?;
        info!("Document store cleared");
        Ok(())
    }

    /// Checks if the store is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the connection pool.
    ///
    /// ## When To Call
    /// On application shutdown, after flushing any pending save.
    pub async fn close(&self) {
        info!("Closing document store");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: i64,
    }

    async fn store() -> Store {
        Store::open(StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_in_memory_and_health() {
        let store = store().await;
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = store().await;
        let doc = Doc {
            name: "vestidos".to_string(),
            count: 3,
        };

        store.save("boutique.test.u1", &doc).await.unwrap();
        let loaded: Option<Doc> = store.load("boutique.test.u1").await.unwrap();
        assert_eq!(loaded, Some(doc));
    }

    #[tokio::test]
    async fn test_load_missing_key_is_none() {
        let store = store().await;
        let loaded: Option<Doc> = store.load("nope").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = store().await;
        store.save("k", &Doc { name: "a".into(), count: 1 }).await.unwrap();
        store.save("k", &Doc { name: "b".into(), count: 2 }).await.unwrap();

        let loaded: Option<Doc> = store.load("k").await.unwrap();
        assert_eq!(loaded.unwrap().name, "b");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_serialization_error() {
        let store = store().await;
        store.save("k", &"not a Doc").await.unwrap();

        let loaded: StoreResult<Option<Doc>> = store.load("k").await;
        assert!(matches!(loaded, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = store().await;
        store.save("a", &1i64).await.unwrap();
        store.save("b", &2i64).await.unwrap();

        store.remove("a").await.unwrap();
        assert!(store.load::<i64>("a").await.unwrap().is_none());
        assert!(store.load::<i64>("b").await.unwrap().is_some());

        store.clear().await.unwrap();
        assert!(store.load::<i64>("b").await.unwrap().is_none());
    }
}
