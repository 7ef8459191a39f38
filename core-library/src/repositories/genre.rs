//! Genre repository and visual assignment
//!
//! Every genre gets a (color, shape) pair from a fixed grid. The starting
//! slot comes from a hash of the normalized name so the same genre lands on
//! the same visual across libraries; collisions probe forward to the next
//! free slot.

use crate::error::Result;
use crate::hashing::fnv1a_64;
use crate::models::{normalize, Genre};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use std::collections::HashSet;

/// Genre colors
pub const GENRE_PALETTE: &[&str] = &[
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#9a6324",
];

/// Genre shapes
pub const GENRE_SHAPES: &[&str] = &["circle", "square", "triangle", "diamond", "hexagon", "star"];

fn slot_visual(slot: usize) -> (&'static str, &'static str) {
    let color = GENRE_PALETTE[slot % GENRE_PALETTE.len()];
    let shape = GENRE_SHAPES[(slot / GENRE_PALETTE.len()) % GENRE_SHAPES.len()];
    (color, shape)
}

/// Pick the visual for a new genre given the pairs already in use.
///
/// Falls back to the hashed starting slot when every pair is taken.
pub fn assign_visual(name: &str, used: &HashSet<(String, String)>) -> (String, String) {
    let slots = GENRE_PALETTE.len() * GENRE_SHAPES.len();
    let start = (fnv1a_64(normalize(name).as_bytes()) % slots as u64) as usize;

    for offset in 0..slots {
        let (color, shape) = slot_visual((start + offset) % slots);
        if !used.contains(&(color.to_string(), shape.to_string())) {
            return (color.to_string(), shape.to_string());
        }
    }

    let (color, shape) = slot_visual(start);
    (color.to_string(), shape.to_string())
}

/// Genre repository interface
#[async_trait]
pub trait GenreRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Genre>>;

    /// Find by name, compared after normalization
    async fn find_by_name(&self, name: &str) -> Result<Option<Genre>>;

    /// Genres with live tracks, ordered by name
    async fn list(&self) -> Result<Vec<Genre>>;

    /// Genres linked to a track
    async fn find_by_track(&self, track_id: &str) -> Result<Vec<Genre>>;
}

/// SQLite implementation of GenreRepository
pub struct SqliteGenreRepository {
    pool: SqlitePool,
}

impl SqliteGenreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenreRepository for SqliteGenreRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Genre>> {
        let genre = query_as::<_, Genre>("SELECT * FROM genres WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(genre)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let genre = query_as::<_, Genre>("SELECT * FROM genres WHERE normalized_name = ?")
            .bind(normalize(name))
            .fetch_optional(&self.pool)
            .await?;
        Ok(genre)
    }

    async fn list(&self) -> Result<Vec<Genre>> {
        let genres = query_as::<_, Genre>(
            "SELECT * FROM genres WHERE track_count > 0 ORDER BY name COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn find_by_track(&self, track_id: &str) -> Result<Vec<Genre>> {
        let genres = query_as::<_, Genre>(
            r#"
            SELECT g.* FROM genres g
            INNER JOIN track_genres tg ON tg.genre_id = g.id
            WHERE tg.track_id = ?
            ORDER BY g.name COLLATE NOCASE ASC
            "#,
        )
        .bind(track_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }
}
