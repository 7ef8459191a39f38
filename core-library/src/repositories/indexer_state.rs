//! Indexer bookkeeping key/value store

use crate::error::Result;
use crate::models::IndexerStateEntry;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Unix seconds of the last completed scan
pub const LAST_SCAN_AT: &str = "last_scan_at";
/// Unix seconds of the last completed forced scan
pub const LAST_FULL_SCAN_AT: &str = "last_full_scan_at";
/// Assets written by the last completed scan
pub const LAST_SCAN_PROCESSED: &str = "last_scan_processed";
/// Tracks removed by the last completed scan
pub const LAST_SCAN_DELETED: &str = "last_scan_deleted";

#[async_trait]
pub trait IndexerStateRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Value parsed as an integer; `None` when missing or not numeric
    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get(key).await?.and_then(|v| v.parse().ok()))
    }

    async fn set(&self, key: &str, value: &str, now: i64) -> Result<()>;

    /// All entries ordered by key
    async fn all(&self) -> Result<Vec<IndexerStateEntry>>;
}

pub struct SqliteIndexerStateRepository {
    pool: SqlitePool,
}

impl SqliteIndexerStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IndexerStateRepository for SqliteIndexerStateRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = query_as("SELECT value FROM indexer_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str, now: i64) -> Result<()> {
        query(
            r#"
            INSERT INTO indexer_state (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<IndexerStateEntry>> {
        let entries = query_as::<_, IndexerStateEntry>("SELECT * FROM indexer_state ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_set_overwrites() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteIndexerStateRepository::new(pool);

        assert_eq!(repo.get(LAST_SCAN_AT).await.unwrap(), None);

        repo.set(LAST_SCAN_AT, "100", 100).await.unwrap();
        repo.set(LAST_SCAN_AT, "200", 200).await.unwrap();
        repo.set(LAST_SCAN_PROCESSED, "not-a-number", 200)
            .await
            .unwrap();

        assert_eq!(repo.get_i64(LAST_SCAN_AT).await.unwrap(), Some(200));
        assert_eq!(repo.get_i64(LAST_SCAN_PROCESSED).await.unwrap(), None);

        let all = repo.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, LAST_SCAN_AT);
        assert_eq!(all[0].updated_at, 200);
    }
}
