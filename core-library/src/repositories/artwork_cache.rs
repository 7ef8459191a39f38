//! Artwork cache repository
//!
//! Bookkeeping rows for the content-addressed artwork files. The files
//! themselves are managed by the metadata crate's artwork cache.

use crate::error::{LibraryError, Result};
use crate::models::ArtworkCacheEntry;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Artwork cache repository interface
#[async_trait]
pub trait ArtworkCacheRepository: Send + Sync {
    /// Find an entry by content hash
    async fn find_by_hash(&self, hash: &str) -> Result<Option<ArtworkCacheEntry>>;

    /// Insert or replace the row for `entry.hash`
    async fn upsert(&self, entry: &ArtworkCacheEntry) -> Result<()>;

    /// Delete an entry by hash
    ///
    /// # Returns
    /// `Ok(true)` if a row was removed
    async fn delete(&self, hash: &str) -> Result<bool>;

    /// Number of cached images
    async fn count(&self) -> Result<i64>;

    /// Total bytes across cached images
    async fn total_size(&self) -> Result<i64>;
}

/// SQLite implementation of ArtworkCacheRepository
pub struct SqliteArtworkCacheRepository {
    pool: SqlitePool,
}

impl SqliteArtworkCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtworkCacheRepository for SqliteArtworkCacheRepository {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<ArtworkCacheEntry>> {
        let entry = query_as::<_, ArtworkCacheEntry>("SELECT * FROM artwork_cache WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn upsert(&self, entry: &ArtworkCacheEntry) -> Result<()> {
        if entry.hash.is_empty() || entry.path.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "ArtworkCacheEntry".to_string(),
                message: "hash and path are required".to_string(),
            });
        }

        query(
            r#"
            INSERT INTO artwork_cache (
                hash, path, mime_type, width, height, byte_size, source, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(hash) DO UPDATE SET
                path = excluded.path,
                mime_type = excluded.mime_type,
                width = excluded.width,
                height = excluded.height,
                byte_size = excluded.byte_size,
                source = excluded.source
            "#,
        )
        .bind(&entry.hash)
        .bind(&entry.path)
        .bind(&entry.mime_type)
        .bind(entry.width)
        .bind(entry.height)
        .bind(entry.byte_size)
        .bind(&entry.source)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, hash: &str) -> Result<bool> {
        let result = query("DELETE FROM artwork_cache WHERE hash = ?")
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = query_as("SELECT COUNT(*) FROM artwork_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }

    async fn total_size(&self) -> Result<i64> {
        let total: (i64,) = query_as("SELECT COALESCE(SUM(byte_size), 0) FROM artwork_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }
}
