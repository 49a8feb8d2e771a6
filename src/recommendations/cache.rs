use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use tracing::info;

use super::types::RecommendationSet;
use crate::error::SwellMateError;

/// Default age threshold for cached recommendation sets, in hours.
pub const DEFAULT_TTL_HOURS: i64 = 72;

/// A cache entry: the payload plus when it was fetched.
#[derive(Debug, Clone)]
pub struct CachedRecommendations {
    pub data: RecommendationSet,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRecommendations {
    /// Whether this entry is older than the TTL. The check lives on the
    /// entry, not in `get`: reads stay pure and the caller decides what
    /// to do with an expired entry.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_hours: i64) -> bool {
        now - self.fetched_at > Duration::hours(ttl_hours)
    }
}

/// SQLite-backed cache of recommendation sets, keyed by preset id.
/// All operations are synchronous (rusqlite is blocking).
/// Callers in async contexts should use `tokio::task::spawn_blocking`.
/// Concurrent tasks each open their own connection against the same
/// path; SQLite serializes the writes, so the last completed `put` wins.
pub struct RecommendationCache {
    conn: Connection,
    ttl_hours: i64,
}

impl RecommendationCache {
    /// Open or create the cache database at the given path.
    pub fn new(db_path: &Path, ttl_hours: i64) -> Result<Self, SwellMateError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SwellMateError::Storage(format!("Failed to create cache dir: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            SwellMateError::Storage(format!("Failed to open cache database at {:?}: {}", db_path, e))
        })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS recommendation_cache (
                preset_id INTEGER PRIMARY KEY,
                payload_json TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cache_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| SwellMateError::Storage(format!("Failed to create cache tables: {}", e)))?;

        Ok(Self { conn, ttl_hours })
    }

    /// Look up the cached set for a preset. Pure read: returns the entry
    /// even if expired, and never touches the database state.
    pub fn get(&self, preset_id: i64) -> Result<Option<CachedRecommendations>, SwellMateError> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload_json, fetched_at FROM recommendation_cache WHERE preset_id = ?1")
            .map_err(|e| SwellMateError::Storage(format!("Failed to prepare cache query: {}", e)))?;

        let row = stmt.query_row(params![preset_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        });

        match row {
            Ok((json, fetched_at)) => {
                let data: RecommendationSet = serde_json::from_str(&json).map_err(|e| {
                    SwellMateError::Storage(format!("Failed to deserialize cached payload: {}", e))
                })?;
                let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
                    .map_err(|e| {
                        SwellMateError::Storage(format!("Invalid cache timestamp: {}", e))
                    })?
                    .with_timezone(&Utc);
                Ok(Some(CachedRecommendations { data, fetched_at }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SwellMateError::Storage(format!("Cache lookup failed: {}", e))),
        }
    }

    /// Store a recommendation set. Overwrites unconditionally: the last
    /// completed write wins when refetches overlap.
    pub fn put(
        &self,
        preset_id: i64,
        data: &RecommendationSet,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), SwellMateError> {
        let json = serde_json::to_string(data).map_err(|e| {
            SwellMateError::Storage(format!("Failed to serialize payload for cache: {}", e))
        })?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO recommendation_cache (preset_id, payload_json, fetched_at)
                 VALUES (?1, ?2, ?3)",
                params![preset_id, json, fetched_at.to_rfc3339()],
            )
            .map_err(|e| SwellMateError::Storage(format!("Failed to store cache entry: {}", e)))?;

        // First write stamps the whole-cache timestamp used for
        // wholesale expiry on session start.
        self.conn
            .execute(
                "INSERT OR IGNORE INTO cache_meta (key, value) VALUES ('cache_timestamp', ?1)",
                params![fetched_at.to_rfc3339()],
            )
            .map_err(|e| SwellMateError::Storage(format!("Failed to stamp cache: {}", e)))?;

        info!("Cached recommendations for preset {}", preset_id);
        Ok(())
    }

    /// Remove one preset's entry. Does not trigger a refetch; that is
    /// the refresh coordinator's job. Returns whether a row was removed.
    pub fn invalidate(&self, preset_id: i64) -> Result<bool, SwellMateError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM recommendation_cache WHERE preset_id = ?1",
                params![preset_id],
            )
            .map_err(|e| SwellMateError::Storage(format!("Failed to invalidate entry: {}", e)))?;
        Ok(removed > 0)
    }

    /// Drop every entry and the whole-cache timestamp. Used on logout
    /// and on wholesale TTL expiry.
    pub fn invalidate_all(&self) -> Result<usize, SwellMateError> {
        let removed = self
            .conn
            .execute("DELETE FROM recommendation_cache", [])
            .map_err(|e| SwellMateError::Storage(format!("Failed to clear cache: {}", e)))?;
        self.conn
            .execute("DELETE FROM cache_meta WHERE key = 'cache_timestamp'", [])
            .map_err(|e| SwellMateError::Storage(format!("Failed to clear cache stamp: {}", e)))?;

        info!("Cleared {} cached recommendation sets", removed);
        Ok(removed)
    }

    /// Expire the whole cache if its stamp is older than the TTL.
    /// Called once on session start. Returns whether a purge happened.
    pub fn purge_if_stale(&self, now: DateTime<Utc>) -> Result<bool, SwellMateError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM cache_meta WHERE key = 'cache_timestamp'")
            .map_err(|e| SwellMateError::Storage(format!("Failed to read cache stamp: {}", e)))?;

        let stamp: Result<String, _> = stmt.query_row([], |row| row.get(0));
        let stamp = match stamp {
            Ok(value) => value,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
            Err(e) => {
                return Err(SwellMateError::Storage(format!("Cache stamp query failed: {}", e)))
            }
        };

        let stamped_at = DateTime::parse_from_rfc3339(&stamp)
            .map_err(|e| SwellMateError::Storage(format!("Invalid cache stamp: {}", e)))?
            .with_timezone(&Utc);

        if now - stamped_at > Duration::hours(self.ttl_hours) {
            info!("Cache stamp older than {}h, purging wholesale", self.ttl_hours);
            self.invalidate_all()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// The TTL this cache was opened with, in hours.
    pub fn ttl_hours(&self) -> i64 {
        self.ttl_hours
    }
}
