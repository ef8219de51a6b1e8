//! Seen-item store used for deduplication.
//!
//! Callers only see the [`SeenStore`] trait. Three backends exist:
//! - [`LibsqlSeenStore`]: durable libSQL file, survives restarts
//! - [`MemorySeenStore`]: process-local map
//! - [`NoopSeenStore`]: remembers nothing, so every item is new

mod migrations;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use feedrelay_shared::{DedupeBackend, DedupeConfig, FeedRelayError, Result};
use libsql::{Connection, Database, params};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistent set of item ids with last-seen timestamps.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Whether `id` has been marked and not yet swept.
    async fn contains(&self, id: &str) -> Result<bool>;

    /// Insert `id` or refresh its timestamp. Concurrent marks of the same id
    /// leave exactly one record.
    async fn mark_seen(&self, id: &str) -> Result<()>;

    /// Delete records whose last mark is older than `ttl`. Returns how many
    /// were removed.
    async fn sweep_expired(&self, ttl: Duration) -> Result<u64>;
}

/// Open the store selected by `[dedupe]`.
pub async fn open_seen_store(config: &DedupeConfig) -> Result<Arc<dyn SeenStore>> {
    let store: Arc<dyn SeenStore> = match config.backend {
        DedupeBackend::Libsql => Arc::new(LibsqlSeenStore::open(Path::new(&config.path)).await?),
        DedupeBackend::Memory => Arc::new(MemorySeenStore::new()),
        DedupeBackend::None => Arc::new(NoopSeenStore),
    };
    tracing::info!(backend = ?config.backend, "seen store ready");
    Ok(store)
}

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

fn cutoff(ttl: Duration) -> i64 {
    now_unix() - i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// libSQL
// ---------------------------------------------------------------------------

/// Durable store backed by a local libSQL database file.
pub struct LibsqlSeenStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LibsqlSeenStore {
    /// Open or create the database at `path` and apply migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FeedRelayError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    FeedRelayError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Mark `id` as seen at an explicit unix timestamp.
    pub async fn mark_seen_at(&self, id: &str, seen_at: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO seen_items (id, last_seen_at) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET last_seen_at = excluded.last_seen_at",
                params![id, seen_at],
            )
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete records last marked strictly before `cutoff` (unix seconds).
    pub async fn sweep_before(&self, cutoff: i64) -> Result<u64> {
        self.conn
            .execute(
                "DELETE FROM seen_items WHERE last_seen_at < ?1",
                params![cutoff],
            )
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM seen_items", params![])
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;
        match row {
            Some(row) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| FeedRelayError::Storage(e.to_string())),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl SeenStore for LibsqlSeenStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM seen_items WHERE id = ?1", params![id])
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn mark_seen(&self, id: &str) -> Result<()> {
        self.mark_seen_at(id, now_unix()).await
    }

    async fn sweep_expired(&self, ttl: Duration) -> Result<u64> {
        let removed = self.sweep_before(cutoff(ttl)).await?;
        tracing::info!(removed, ttl_secs = ttl.as_secs(), "swept expired seen items");
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    seen: Mutex<HashMap<String, i64>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as seen at an explicit unix timestamp.
    pub async fn mark_seen_at(&self, id: &str, seen_at: i64) {
        self.seen.lock().await.insert(id.to_string(), seen_at);
    }

    pub async fn count(&self) -> usize {
        self.seen.lock().await.len()
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.seen.lock().await.contains_key(id))
    }

    async fn mark_seen(&self, id: &str) -> Result<()> {
        self.mark_seen_at(id, now_unix()).await;
        Ok(())
    }

    async fn sweep_expired(&self, ttl: Duration) -> Result<u64> {
        let cutoff = cutoff(ttl);
        let mut seen = self.seen.lock().await;
        let before = seen.len();
        seen.retain(|_, last_seen| *last_seen >= cutoff);
        Ok((before - seen.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Disabled
// ---------------------------------------------------------------------------

/// Store used when dedupe is disabled: nothing is ever seen.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSeenStore;

#[async_trait]
impl SeenStore for NoopSeenStore {
    async fn contains(&self, _id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn mark_seen(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn sweep_expired(&self, _ttl: Duration) -> Result<u64> {
        Ok(0)
    }
}
