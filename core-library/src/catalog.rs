//! # Catalog Writer
//!
//! The only writer of catalog content. Each batch is one SQLite transaction;
//! each entry inside it runs in its own savepoint so a failing entry rolls
//! back alone. Denormalized counts are recomputed inside the same
//! transaction before commit, so readers never observe stale aggregates.
//!
//! User-owned track columns (`is_favorite`, `favorited_at`, `play_count`,
//! `last_played_at`, `rating`) and `created_at` are never written here.

use crate::error::Result;
use crate::models::{normalize, Artist, LyricLine, UNKNOWN_GENRE};
use crate::repositories::genre::assign_visual;
use bridge_traits::time::Clock;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, Acquire, SqliteConnection, SqlitePool, Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Everything the writer needs to upsert one track and its relations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub uri: String,
    pub filename: String,
    pub fingerprint: String,
    /// Seconds
    pub duration: f64,
    /// Asset creation time (Unix seconds)
    pub date_added: i64,
    pub title: String,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub genres: Vec<String>,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub year: Option<i64>,
    pub composer: Option<String>,
    pub comment: Option<String>,
    pub lyrics: Vec<LyricLine>,
    pub artwork_path: Option<String>,
}

impl CatalogEntry {
    pub fn new(
        id: impl Into<String>,
        uri: impl Into<String>,
        filename: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            filename: filename.into(),
            fingerprint: fingerprint.into(),
            ..Default::default()
        }
    }

    fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            &self.filename
        } else {
            title
        }
    }
}

/// Result of one [`CatalogWriter::write_batch`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Entry ids committed, in input order
    pub written: Vec<String>,
    /// Entry ids whose savepoint was rolled back, with the error message
    pub failed: Vec<(String, String)>,
    /// Cancellation was observed before the batch was exhausted
    pub cancelled: bool,
}

/// Rows physically removed by [`CatalogWriter::cleanup`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    pub tracks_purged: u64,
    pub albums_pruned: u64,
    pub artists_pruned: u64,
    pub genres_pruned: u64,
}

impl CleanupStats {
    pub fn removed_anything(&self) -> bool {
        self.tracks_purged + self.albums_pruned + self.artists_pruned + self.genres_pruned > 0
    }
}

const UPSERT_TRACK: &str = r#"
    INSERT INTO tracks (
        id, title, artist_id, album_id, duration, uri, filename,
        track_number, disc_number, year, composer, comment, artwork_path,
        fingerprint, scanned_at, is_deleted, date_added, created_at, updated_at,
        lyrics
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        artist_id = excluded.artist_id,
        album_id = excluded.album_id,
        duration = excluded.duration,
        uri = excluded.uri,
        filename = excluded.filename,
        track_number = excluded.track_number,
        disc_number = excluded.disc_number,
        year = excluded.year,
        composer = excluded.composer,
        comment = excluded.comment,
        artwork_path = excluded.artwork_path,
        fingerprint = excluded.fingerprint,
        scanned_at = excluded.scanned_at,
        is_deleted = 0,
        date_added = excluded.date_added,
        updated_at = excluded.updated_at,
        lyrics = excluded.lyrics
"#;

// Same statement for schemas without the lyrics column
const UPSERT_TRACK_REDUCED: &str = r#"
    INSERT INTO tracks (
        id, title, artist_id, album_id, duration, uri, filename,
        track_number, disc_number, year, composer, comment, artwork_path,
        fingerprint, scanned_at, is_deleted, date_added, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        artist_id = excluded.artist_id,
        album_id = excluded.album_id,
        duration = excluded.duration,
        uri = excluded.uri,
        filename = excluded.filename,
        track_number = excluded.track_number,
        disc_number = excluded.disc_number,
        year = excluded.year,
        composer = excluded.composer,
        comment = excluded.comment,
        artwork_path = excluded.artwork_path,
        fingerprint = excluded.fingerprint,
        scanned_at = excluded.scanned_at,
        is_deleted = 0,
        date_added = excluded.date_added,
        updated_at = excluded.updated_at
"#;

/// Idempotent writer for tracks, artists, albums, genres and their joins
pub struct CatalogWriter {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    reduced_schema: AtomicBool,
}

impl CatalogWriter {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            reduced_schema: AtomicBool::new(false),
        }
    }

    /// Whether the writer has fallen back to the column set without lyrics
    pub fn is_reduced_schema(&self) -> bool {
        self.reduced_schema.load(Ordering::SeqCst)
    }

    /// Fingerprints of every live track, keyed by track id
    pub async fn fingerprints(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> =
            query_as("SELECT id, fingerprint FROM tracks WHERE is_deleted = 0")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Upsert a batch of entries in one transaction.
    ///
    /// Cancellation is checked before each entry. Entries written before
    /// cancellation are committed together with the aggregate recompute.
    #[instrument(skip(self, entries, cancel), fields(batch = entries.len()))]
    pub async fn write_batch(
        &self,
        entries: &[CatalogEntry],
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        if entries.is_empty() {
            return Ok(outcome);
        }

        let now = self.clock.unix_timestamp();
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            if cancel.is_cancelled() {
                let remaining = entries.len() - outcome.written.len() - outcome.failed.len();
                debug!(remaining, "Batch cancelled");
                outcome.cancelled = true;
                break;
            }

            match self.write_entry(&mut tx, entry, now).await {
                Ok(()) => outcome.written.push(entry.id.clone()),
                Err(e) => {
                    warn!(track_id = %entry.id, uri = %entry.uri, error = %e, "Failed to write track");
                    outcome.failed.push((entry.id.clone(), e.to_string()));
                }
            }
        }

        if !outcome.written.is_empty() {
            recompute_aggregates(&mut tx).await?;
        }
        tx.commit().await?;

        debug!(
            written = outcome.written.len(),
            failed = outcome.failed.len(),
            "Batch committed"
        );
        Ok(outcome)
    }

    async fn write_entry(
        &self,
        tx: &mut Transaction<'static, sqlx::Sqlite>,
        entry: &CatalogEntry,
        now: i64,
    ) -> Result<()> {
        let reduced = self.is_reduced_schema();

        let mut savepoint = Acquire::begin(&mut *tx).await?;
        let result = apply_entry(&mut savepoint, entry, now, reduced).await;
        match result {
            Ok(()) => {
                savepoint.commit().await?;
                Ok(())
            }
            Err(e) if !reduced && e.is_missing_column() => {
                savepoint.rollback().await?;
                warn!(error = %e, "Track table lacks optional columns, using reduced column set");
                self.reduced_schema.store(true, Ordering::SeqCst);

                let mut retry = Acquire::begin(&mut *tx).await?;
                match apply_entry(&mut retry, entry, now, true).await {
                    Ok(()) => {
                        retry.commit().await?;
                        Ok(())
                    }
                    Err(e) => {
                        retry.rollback().await?;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(e)
            }
        }
    }

    /// Mark tracks deleted; they vanish from reads until cleanup removes
    /// them or a rescan revives them.
    ///
    /// # Returns
    /// Number of live tracks that were marked
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn soft_delete(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let now = self.clock.unix_timestamp();
        let mut tx = self.pool.begin().await?;
        let mut marked = 0;

        for id in ids {
            let result =
                query("UPDATE tracks SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0")
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            marked += result.rows_affected();
        }

        if marked > 0 {
            recompute_aggregates(&mut tx).await?;
        }
        tx.commit().await?;

        info!(marked, "Soft-deleted missing tracks");
        Ok(marked)
    }

    /// Purge soft-deleted tracks and prune relations left without tracks.
    ///
    /// Favorite albums and artists are kept even when empty.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<CleanupStats> {
        let mut tx = self.pool.begin().await?;

        let tracks_purged = query("DELETE FROM tracks WHERE is_deleted = 1")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let albums_pruned = query(
            r#"
            DELETE FROM albums
            WHERE is_favorite = 0
              AND NOT EXISTS (SELECT 1 FROM tracks t WHERE t.album_id = albums.id)
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let artists_pruned = query(
            r#"
            DELETE FROM artists
            WHERE is_favorite = 0
              AND NOT EXISTS (SELECT 1 FROM tracks t WHERE t.artist_id = artists.id)
              AND NOT EXISTS (SELECT 1 FROM albums a WHERE a.artist_id = artists.id)
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let genres_pruned = query(
            r#"
            DELETE FROM genres
            WHERE NOT EXISTS (SELECT 1 FROM track_genres tg WHERE tg.genre_id = genres.id)
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let stats = CleanupStats {
            tracks_purged,
            albums_pruned,
            artists_pruned,
            genres_pruned,
        };

        if stats.removed_anything() {
            recompute_aggregates(&mut tx).await?;
        }
        tx.commit().await?;

        info!(
            tracks_purged,
            albums_pruned, artists_pruned, genres_pruned, "Catalog cleanup finished"
        );
        Ok(stats)
    }
}

async fn apply_entry(
    conn: &mut SqliteConnection,
    entry: &CatalogEntry,
    now: i64,
    reduced: bool,
) -> Result<()> {
    let artist_id = match non_empty(entry.artist.as_deref()) {
        Some(name) => Some(resolve_artist(conn, name, now).await?),
        None => None,
    };

    let album_artist =
        non_empty(entry.album_artist.as_deref()).or_else(|| non_empty(entry.artist.as_deref()));
    let album_id = match (non_empty(entry.album.as_deref()), album_artist) {
        (Some(title), Some(album_artist)) => {
            let album_artist_id = resolve_artist(conn, album_artist, now).await?;
            Some(resolve_album(conn, title, &album_artist_id, entry, now).await?)
        }
        _ => None,
    };

    let genre_ids = resolve_genres(conn, &entry.genres, now).await?;

    let upsert = if reduced {
        UPSERT_TRACK_REDUCED
    } else {
        UPSERT_TRACK
    };
    let mut statement = query(upsert)
        .bind(&entry.id)
        .bind(entry.display_title())
        .bind(&artist_id)
        .bind(&album_id)
        .bind(entry.duration.max(0.0))
        .bind(&entry.uri)
        .bind(&entry.filename)
        .bind(entry.track_number)
        .bind(entry.disc_number)
        .bind(entry.year)
        .bind(&entry.composer)
        .bind(&entry.comment)
        .bind(&entry.artwork_path)
        .bind(&entry.fingerprint)
        .bind(now)
        .bind(entry.date_added)
        .bind(now)
        .bind(now);
    if !reduced {
        let lyrics = if entry.lyrics.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&entry.lyrics)?)
        };
        statement = statement.bind(lyrics);
    }
    statement.execute(&mut *conn).await?;

    query("DELETE FROM track_genres WHERE track_id = ?")
        .bind(&entry.id)
        .execute(&mut *conn)
        .await?;
    for genre_id in &genre_ids {
        query("INSERT OR IGNORE INTO track_genres (track_id, genre_id) VALUES (?, ?)")
            .bind(&entry.id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

async fn resolve_artist(conn: &mut SqliteConnection, name: &str, now: i64) -> Result<String> {
    let existing: Option<(String,)> = query_as("SELECT id FROM artists WHERE normalized_name = ?")
        .bind(normalize(name))
        .fetch_optional(&mut *conn)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let artist = Artist::new(name.to_string(), now);
    query(
        r#"
        INSERT INTO artists (
            id, name, normalized_name, sort_name, track_count, album_count,
            is_favorite, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, 0, 0, 0, ?, ?)
        "#,
    )
    .bind(&artist.id)
    .bind(&artist.name)
    .bind(&artist.normalized_name)
    .bind(&artist.sort_name)
    .bind(artist.created_at)
    .bind(artist.updated_at)
    .execute(&mut *conn)
    .await?;

    debug!(artist = %artist.name, "Created artist");
    Ok(artist.id)
}

async fn resolve_album(
    conn: &mut SqliteConnection,
    title: &str,
    artist_id: &str,
    entry: &CatalogEntry,
    now: i64,
) -> Result<String> {
    let existing: Option<(String,)> =
        query_as("SELECT id FROM albums WHERE normalized_title = ? AND artist_id = ?")
            .bind(normalize(title))
            .bind(artist_id)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some((id,)) = existing {
        if entry.artwork_path.is_some() || entry.year.is_some() {
            query(
                r#"
                UPDATE albums
                SET artwork_path = COALESCE(artwork_path, ?),
                    year = COALESCE(year, ?)
                WHERE id = ?
                "#,
            )
            .bind(&entry.artwork_path)
            .bind(entry.year)
            .bind(&id)
            .execute(&mut *conn)
            .await?;
        }
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    query(
        r#"
        INSERT INTO albums (
            id, title, normalized_title, artist_id, year, artwork_path,
            track_count, duration, is_favorite, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(title.trim())
    .bind(normalize(title))
    .bind(artist_id)
    .bind(entry.year)
    .bind(&entry.artwork_path)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(album = %title, "Created album");
    Ok(id)
}

async fn resolve_genres(
    conn: &mut SqliteConnection,
    names: &[String],
    now: i64,
) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut wanted: Vec<&str> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(normalize(name)))
        .collect();
    if wanted.is_empty() {
        wanted.push(UNKNOWN_GENRE);
    }

    let mut ids = Vec::with_capacity(wanted.len());
    for name in wanted {
        let existing: Option<(String,)> =
            query_as("SELECT id FROM genres WHERE normalized_name = ?")
                .bind(normalize(name))
                .fetch_optional(&mut *conn)
                .await?;
        if let Some((id,)) = existing {
            ids.push(id);
            continue;
        }

        let used: HashSet<(String, String)> =
            query_as::<_, (String, String)>("SELECT color, shape FROM genres")
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();
        let (color, shape) = assign_visual(name, &used);
        let id = Uuid::new_v4().to_string();

        query(
            r#"
            INSERT INTO genres (id, name, normalized_name, track_count, color, shape, created_at)
            VALUES (?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(normalize(name))
        .bind(&color)
        .bind(&shape)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        debug!(genre = %name, %color, %shape, "Created genre");
        ids.push(id);
    }

    Ok(ids)
}

/// Recompute every denormalized count from live tracks.
///
/// Album counts go first; artist `album_count` reads them.
async fn recompute_aggregates(conn: &mut SqliteConnection) -> Result<()> {
    query(
        r#"
        UPDATE albums SET
            track_count = (
                SELECT COUNT(*) FROM tracks t
                WHERE t.album_id = albums.id AND t.is_deleted = 0
            ),
            duration = (
                SELECT COALESCE(SUM(t.duration), 0) FROM tracks t
                WHERE t.album_id = albums.id AND t.is_deleted = 0
            )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    query(
        r#"
        UPDATE artists SET
            track_count = (
                SELECT COUNT(*) FROM tracks t
                WHERE t.artist_id = artists.id AND t.is_deleted = 0
            ),
            album_count = (
                SELECT COUNT(*) FROM albums a
                WHERE a.artist_id = artists.id AND a.track_count > 0
            )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    query(
        r#"
        UPDATE genres SET
            track_count = (
                SELECT COUNT(*) FROM track_genres tg
                INNER JOIN tracks t ON t.id = tg.track_id
                WHERE tg.genre_id = genres.id AND t.is_deleted = 0
            )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_falls_back_to_filename() {
        let mut entry = CatalogEntry::new("1", "/m/a.mp3", "a.mp3", "f");
        assert_eq!(entry.display_title(), "a.mp3");

        entry.title = "  Song ".to_string();
        assert_eq!(entry.display_title(), "Song");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  x ")), Some("x"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_cleanup_stats_removed_anything() {
        assert!(!CleanupStats::default().removed_anything());
        assert!(CleanupStats {
            genres_pruned: 1,
            ..Default::default()
        }
        .removed_anything());
    }
}
