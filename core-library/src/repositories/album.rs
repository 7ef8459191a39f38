//! Album repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{normalize, Album};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Album repository interface for data access operations
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Find an album by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>>;

    /// Find an album by title and album artist
    async fn find_by_title(&self, title: &str, artist_id: &str) -> Result<Option<Album>>;

    /// Query albums that still have tracks, ordered by title
    async fn query(&self, page_request: PageRequest) -> Result<Page<Album>>;

    /// Albums credited to an artist, newest first
    async fn find_by_artist(&self, artist_id: &str) -> Result<Vec<Album>>;

    /// Count albums that still have tracks
    async fn count(&self) -> Result<i64>;

    /// Flip the favorite flag
    async fn set_favorite(&self, id: &str, favorite: bool, now: i64) -> Result<()>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    /// Create a new SqliteAlbumRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>> {
        let album = query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn find_by_title(&self, title: &str, artist_id: &str) -> Result<Option<Album>> {
        let album = query_as::<_, Album>(
            "SELECT * FROM albums WHERE normalized_title = ? AND artist_id = ?",
        )
        .bind(normalize(title))
        .bind(artist_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(album)
    }

    async fn query(&self, page_request: PageRequest) -> Result<Page<Album>> {
        let total = self.count().await?;

        let albums = query_as::<_, Album>(
            r#"
            SELECT * FROM albums
            WHERE track_count > 0
            ORDER BY title COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(albums, total as u64, page_request))
    }

    async fn find_by_artist(&self, artist_id: &str) -> Result<Vec<Album>> {
        let albums = query_as::<_, Album>(
            r#"
            SELECT * FROM albums
            WHERE artist_id = ? AND track_count > 0
            ORDER BY year DESC, title COLLATE NOCASE ASC
            "#,
        )
        .bind(artist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(albums)
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = query_as("SELECT COUNT(*) FROM albums WHERE track_count > 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }

    async fn set_favorite(&self, id: &str, favorite: bool, now: i64) -> Result<()> {
        let result = query("UPDATE albums SET is_favorite = ?, updated_at = ? WHERE id = ?")
            .bind(favorite)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("Album", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::test_support::{seed_album, seed_artist};

    #[tokio::test]
    async fn test_find_by_title_per_artist() {
        let pool = create_test_pool().await.unwrap();
        seed_artist(&pool, "ar-1", "One").await;
        seed_artist(&pool, "ar-2", "Two").await;
        seed_album(&pool, "al-1", "Greatest Hits", "ar-1").await;
        seed_album(&pool, "al-2", "Greatest Hits", "ar-2").await;
        let repo = SqliteAlbumRepository::new(pool);

        let album = repo
            .find_by_title("GREATEST hits", "ar-2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(album.id, "al-2");
    }

    #[tokio::test]
    async fn test_unique_title_per_artist() {
        let pool = create_test_pool().await.unwrap();
        seed_artist(&pool, "ar-1", "One").await;
        seed_album(&pool, "al-1", "Same", "ar-1").await;

        let duplicate = sqlx::query(
            "INSERT INTO albums (id, title, normalized_title, artist_id, created_at, updated_at) \
             VALUES ('al-2', 'SAME', 'same', 'ar-1', 0, 0)",
        )
        .execute(&pool)
        .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_query_hides_empty_albums() {
        let pool = create_test_pool().await.unwrap();
        seed_artist(&pool, "ar-1", "One").await;
        seed_album(&pool, "al-1", "Full", "ar-1").await;
        seed_album(&pool, "al-2", "Empty", "ar-1").await;
        sqlx::query("UPDATE albums SET track_count = 3 WHERE id = 'al-1'")
            .execute(&pool)
            .await
            .unwrap();
        let repo = SqliteAlbumRepository::new(pool);

        let page = repo.query(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Full");
        assert_eq!(repo.find_by_artist("ar-1").await.unwrap().len(), 1);

        repo.set_favorite("al-2", true, 5).await.unwrap();
        assert!(repo.find_by_id("al-2").await.unwrap().unwrap().is_favorite);
    }
}
