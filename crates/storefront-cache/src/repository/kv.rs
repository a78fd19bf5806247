//! # Key-Value Repository
//!
//! String keys mapped to JSON text, with an `updated_at` stamp per row.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────┬──────────────┐
//! │ key                      │ value                        │ updated_at   │
//! ├──────────────────────────┼──────────────────────────────┼──────────────┤
//! │ cart                     │ {"id":"…","lines":[…]}       │ 2026-…       │
//! │ customer                 │ {"id":"customer_1",…}        │ 2026-…       │
//! │ customer_1_order_notes   │ "ring the bell"              │ 2026-…       │
//! └──────────────────────────┴──────────────────────────────┴──────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::CacheResult;

/// One stored entry.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository for raw key-value operations.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    pub async fn entry(&self, key: &str) -> CacheResult<Option<KvEntry>> {
        let entry = sqlx::query_as::<_, KvEntry>(
            "SELECT key, value, updated_at FROM kv_cache WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entry(key).await?.map(|entry| entry.value))
    }

    /// Inserts or replaces the value stored under `key`.
    pub async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing cache entry");

        sqlx::query(
            r#"
            INSERT INTO kv_cache (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes `key`. Returns whether anything was stored.
    pub async fn remove(&self, key: &str) -> CacheResult<bool> {
        let result = sqlx::query("DELETE FROM kv_cache WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deserializes the JSON stored under `key`.
    ///
    /// ## Errors
    /// `Serialization` when the stored text does not fit `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }

    /// Keys starting with `prefix`, sorted.
    pub async fn keys(&self, prefix: &str) -> CacheResult<Vec<String>> {
        let pattern = format!("{}%", escape_like(prefix));
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM kv_cache WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Removes every entry. Used on sign-out.
    pub async fn clear(&self) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM kv_cache")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
