//! Artist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{normalize, Artist};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Artist repository interface for data access operations
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(artist))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>>;

    /// Find artist by name, compared after normalization
    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>>;

    /// Query artists with tracks, ordered by sort name
    async fn query(&self, page_request: PageRequest) -> Result<Page<Artist>>;

    /// Count artists with at least one live track
    async fn count(&self) -> Result<i64>;

    /// Flip the favorite flag
    ///
    /// # Errors
    /// Returns `NotFound` if the artist does not exist
    async fn set_favorite(&self, id: &str, favorite: bool, now: i64) -> Result<()>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SqliteArtistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE normalized_name = ?")
            .bind(normalize(name))
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn query(&self, page_request: PageRequest) -> Result<Page<Artist>> {
        let total = self.count().await?;

        let artists = query_as::<_, Artist>(
            r#"
            SELECT * FROM artists
            WHERE track_count > 0 OR album_count > 0
            ORDER BY sort_name COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(artists, total as u64, page_request))
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) =
            query_as("SELECT COUNT(*) FROM artists WHERE track_count > 0 OR album_count > 0")
                .fetch_one(&self.pool)
                .await?;
        Ok(total.0)
    }

    async fn set_favorite(&self, id: &str, favorite: bool, now: i64) -> Result<()> {
        let result = query("UPDATE artists SET is_favorite = ?, updated_at = ? WHERE id = ?")
            .bind(favorite)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("Artist", id));
        }

        Ok(())
    }
}
