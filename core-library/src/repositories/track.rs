//! Track repository trait and implementation
//!
//! Reads never return soft-deleted rows. Writes are limited to the
//! user-owned columns; everything else belongs to the catalog writer.

use crate::error::{LibraryError, Result};
use crate::models::{validate_rating, Track};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Track repository interface for catalog reads and user flags
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a live track by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>>;

    /// Query live tracks ordered by title
    async fn query(&self, page_request: PageRequest) -> Result<Page<Track>>;

    /// Tracks on an album in disc/track order
    async fn query_by_album(&self, album_id: &str, page_request: PageRequest)
        -> Result<Page<Track>>;

    /// Tracks credited to an artist
    async fn query_by_artist(
        &self,
        artist_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>>;

    /// Tracks linked to a genre
    async fn query_by_genre(&self, genre_id: &str, page_request: PageRequest)
        -> Result<Page<Track>>;

    /// Favorite tracks, most recently favorited first
    async fn favorites(&self, page_request: PageRequest) -> Result<Page<Track>>;

    /// Count live tracks
    async fn count(&self) -> Result<i64>;

    /// Flip the favorite flag
    ///
    /// # Errors
    /// Returns `NotFound` if no live track has this ID
    async fn set_favorite(&self, id: &str, favorite: bool, now: i64) -> Result<()>;

    /// Set or clear the 0-5 star rating
    async fn set_rating(&self, id: &str, rating: Option<i64>) -> Result<()>;

    /// Increment the play count and stamp `last_played_at`
    async fn record_play(&self, id: &str, played_at: i64) -> Result<()>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SqliteTrackRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn page_where(
        &self,
        filter: &str,
        order: &str,
        bind: Option<&str>,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        let count_sql = format!("SELECT COUNT(*) FROM tracks t WHERE t.is_deleted = 0 {}", filter);
        let select_sql = format!(
            "SELECT t.* FROM tracks t WHERE t.is_deleted = 0 {} ORDER BY {} LIMIT ? OFFSET ?",
            filter, order
        );

        let mut count_query = query_as::<_, (i64,)>(&count_sql);
        let mut select_query = query_as::<_, Track>(&select_sql);
        if let Some(value) = bind {
            count_query = count_query.bind(value);
            select_query = select_query.bind(value);
        }

        let total = count_query.fetch_one(&self.pool).await?;
        let tracks = select_query
            .bind(page_request.limit())
            .bind(page_request.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(tracks, total.0 as u64, page_request))
    }

    fn not_found(id: &str) -> LibraryError {
        LibraryError::not_found("Track", id)
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn query(&self, page_request: PageRequest) -> Result<Page<Track>> {
        self.page_where("", "t.title COLLATE NOCASE ASC, t.id", None, page_request)
            .await
    }

    async fn query_by_album(
        &self,
        album_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        self.page_where(
            "AND t.album_id = ?",
            "COALESCE(t.disc_number, 1), COALESCE(t.track_number, 0), t.filename",
            Some(album_id),
            page_request,
        )
        .await
    }

    async fn query_by_artist(
        &self,
        artist_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        self.page_where(
            "AND t.artist_id = ?",
            "t.title COLLATE NOCASE ASC, t.id",
            Some(artist_id),
            page_request,
        )
        .await
    }

    async fn query_by_genre(
        &self,
        genre_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        self.page_where(
            "AND t.id IN (SELECT track_id FROM track_genres WHERE genre_id = ?)",
            "t.title COLLATE NOCASE ASC, t.id",
            Some(genre_id),
            page_request,
        )
        .await
    }

    async fn favorites(&self, page_request: PageRequest) -> Result<Page<Track>> {
        self.page_where(
            "AND t.is_favorite = 1",
            "t.favorited_at DESC, t.id",
            None,
            page_request,
        )
        .await
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = query_as("SELECT COUNT(*) FROM tracks WHERE is_deleted = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }

    async fn set_favorite(&self, id: &str, favorite: bool, now: i64) -> Result<()> {
        let result = query(
            r#"
            UPDATE tracks
            SET is_favorite = ?, favorited_at = CASE WHEN ? THEN ? ELSE NULL END
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(favorite)
        .bind(favorite)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn set_rating(&self, id: &str, rating: Option<i64>) -> Result<()> {
        if let Some(rating) = rating {
            validate_rating(rating).map_err(|e| LibraryError::InvalidInput {
                field: "rating".to_string(),
                message: e,
            })?;
        }

        let result = query("UPDATE tracks SET rating = ? WHERE id = ? AND is_deleted = 0")
            .bind(rating)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn record_play(&self, id: &str, played_at: i64) -> Result<()> {
        let result = query(
            r#"
            UPDATE tracks
            SET play_count = play_count + 1, last_played_at = ?
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(played_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::test_support::{seed_album, seed_artist, seed_track};

    #[tokio::test]
    async fn test_find_excludes_deleted() {
        let pool = create_test_pool().await.unwrap();
        seed_track(&pool, "live", "Live Song", None, None, false).await;
        seed_track(&pool, "gone", "Gone Song", None, None, true).await;
        let repo = SqliteTrackRepository::new(pool);

        assert!(repo.find_by_id("live").await.unwrap().is_some());
        assert!(repo.find_by_id("gone").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_with_pagination() {
        let pool = create_test_pool().await.unwrap();
        for (id, title) in [("1", "Charlie"), ("2", "alpha"), ("3", "Bravo")] {
            seed_track(&pool, id, title, None, None, false).await;
        }
        let repo = SqliteTrackRepository::new(pool);

        let page = repo.query(PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        let titles: Vec<&str> = page.items.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "Bravo"]);

        let page = repo.query(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_query_by_album_and_artist() {
        let pool = create_test_pool().await.unwrap();
        seed_artist(&pool, "ar-1", "Artist").await;
        seed_album(&pool, "al-1", "Album", "ar-1").await;
        seed_track(&pool, "t1", "One", Some("ar-1"), Some("al-1"), false).await;
        seed_track(&pool, "t2", "Two", Some("ar-1"), None, false).await;
        seed_track(&pool, "t3", "Three", Some("ar-1"), Some("al-1"), true).await;
        let repo = SqliteTrackRepository::new(pool);

        let album = repo
            .query_by_album("al-1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(album.total, 1);
        assert_eq!(album.items[0].id, "t1");

        let artist = repo
            .query_by_artist("ar-1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(artist.total, 2);
    }

    #[tokio::test]
    async fn test_user_flags() {
        let pool = create_test_pool().await.unwrap();
        seed_track(&pool, "t1", "One", None, None, false).await;
        let repo = SqliteTrackRepository::new(pool);

        repo.set_favorite("t1", true, 500).await.unwrap();
        repo.record_play("t1", 600).await.unwrap();
        repo.record_play("t1", 700).await.unwrap();
        repo.set_rating("t1", Some(4)).await.unwrap();

        let track = repo.find_by_id("t1").await.unwrap().unwrap();
        assert!(track.is_favorite);
        assert_eq!(track.favorited_at, Some(500));
        assert_eq!(track.play_count, 2);
        assert_eq!(track.last_played_at, Some(700));
        assert_eq!(track.rating, Some(4));

        let favorites = repo.favorites(PageRequest::default()).await.unwrap();
        assert_eq!(favorites.total, 1);

        repo.set_favorite("t1", false, 800).await.unwrap();
        let track = repo.find_by_id("t1").await.unwrap().unwrap();
        assert!(!track.is_favorite);
        assert_eq!(track.favorited_at, None);
    }

    #[tokio::test]
    async fn test_flags_on_missing_track() {
        let pool = create_test_pool().await.unwrap();
        seed_track(&pool, "t1", "One", None, None, false).await;
        let repo = SqliteTrackRepository::new(pool);

        assert!(matches!(
            repo.set_favorite("missing", true, 1).await,
            Err(LibraryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.set_rating("t1", Some(9)).await,
            Err(LibraryError::InvalidInput { .. })
        ));
    }
}
