//! Domain models for the media catalog
//!
//! Rows map one-to-one onto the tables created by the migrations. Names are
//! normalized (trimmed, lowercased) for identity; the display name keeps the
//! first spelling seen.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Name of the genre linked to tracks without a genre tag
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Leading articles moved to the end of sort names
const SORT_ARTICLES: &[&str] = &[
    "the", "a", "an", "le", "la", "les", "el", "los", "las", "die", "der", "das",
];

/// Normalize a name for identity lookups (trimmed, lowercase)
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Sort name with a leading article moved to the end.
///
/// `"The Beatles"` sorts as `"Beatles, The"`. Names that consist of only
/// the article are returned unchanged.
pub fn sort_name(name: &str) -> String {
    let trimmed = name.trim();
    if let Some((first, rest)) = trimmed.split_once(char::is_whitespace) {
        let rest = rest.trim_start();
        if !rest.is_empty() && SORT_ARTICLES.contains(&first.to_lowercase().as_str()) {
            return format!("{}, {}", rest, first);
        }
    }
    trimmed.to_string()
}

// =============================================================================
// Domain Models
// =============================================================================

/// Catalogued audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Track {
    /// Stable identifier derived from the media store asset id
    pub id: String,
    pub title: String,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    /// Duration in seconds
    pub duration: f64,
    /// Source locator
    pub uri: String,
    pub filename: String,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub year: Option<i64>,
    pub composer: Option<String>,
    pub comment: Option<String>,
    /// JSON array of [`LyricLine`]; absent on schemas predating the column
    #[sqlx(default)]
    pub lyrics: Option<String>,
    pub artwork_path: Option<String>,
    /// Change-detection fingerprint of the asset at last scan
    pub fingerprint: String,
    pub scanned_at: i64,
    pub is_deleted: bool,

    // User-owned state, never touched by the indexer
    pub is_favorite: bool,
    pub favorited_at: Option<i64>,
    pub play_count: i64,
    pub last_played_at: Option<i64>,
    pub rating: Option<i64>,

    /// Asset creation time
    pub date_added: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Track {
    /// Decoded lyric lines, empty when none are stored
    pub fn lyric_lines(&self) -> Vec<LyricLine> {
        self.lyrics
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }

    /// Validate user-editable fields
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }

        if self.duration < 0.0 {
            return Err("Track duration cannot be negative".to_string());
        }

        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }

        Ok(())
    }
}

/// Ratings are whole stars from 0 to 5
pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(0..=5).contains(&rating) {
        return Err(format!("Rating {} is out of range 0-5", rating));
    }
    Ok(())
}

/// One line of lyrics, optionally time-synchronised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Offset from track start in milliseconds
    pub time_ms: Option<u64>,
    pub text: String,
}

impl LyricLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            time_ms: None,
            text: text.into(),
        }
    }
}

/// Artist with denormalized counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: String,
    pub name: String,
    /// Unique identity key
    pub normalized_name: String,
    pub sort_name: String,
    /// Non-deleted tracks credited to this artist
    pub track_count: i64,
    /// Albums credited to this artist that still have tracks
    pub album_count: i64,
    pub is_favorite: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Artist {
    /// Create a new artist with normalized and sort names derived from `name`
    pub fn new(name: String, now: i64) -> Self {
        let name = name.trim().to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            normalized_name: normalize(&name),
            sort_name: sort_name(&name),
            name,
            track_count: 0,
            album_count: 0,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.normalized_name.is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Album, unique per (normalized title, album artist)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub normalized_title: String,
    pub artist_id: String,
    pub year: Option<i64>,
    pub artwork_path: Option<String>,
    pub track_count: i64,
    /// Sum of track durations in seconds
    pub duration: f64,
    pub is_favorite: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Album {
    pub fn new(title: String, artist_id: String, now: i64) -> Self {
        let title = title.trim().to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            normalized_title: normalize(&title),
            title,
            artist_id,
            year: None,
            artwork_path: None,
            track_count: 0,
            duration: 0.0,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.normalized_title.is_empty() {
            return Err("Album title cannot be empty".to_string());
        }
        if self.track_count < 0 {
            return Err("Track count cannot be negative".to_string());
        }
        Ok(())
    }
}

/// Genre with its assigned visual identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    pub track_count: i64,
    /// Hex color from the genre palette
    pub color: String,
    /// Shape keyword from the genre shape set
    pub shape: String,
    pub created_at: i64,
}

/// Content-addressed artwork file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ArtworkCacheEntry {
    /// `<16 hex>-<len hex>` content address
    pub hash: String,
    /// Absolute path of the cached file
    pub path: String,
    pub mime_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub byte_size: i64,
    /// Where the image came from (`embedded`)
    pub source: String,
    pub created_at: i64,
}

/// Key/value bookkeeping written by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IndexerStateEntry {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Daft Punk "), "daft punk");
        assert_eq!(normalize("ÉLAN"), "élan");
    }

    #[test]
    fn test_sort_name_moves_articles() {
        assert_eq!(sort_name("The Beatles"), "Beatles, The");
        assert_eq!(sort_name("a tribe called quest"), "tribe called quest, a");
        assert_eq!(sort_name("Los Lobos"), "Lobos, Los");
        assert_eq!(sort_name("Die Ärzte"), "Ärzte, Die");
    }

    #[test]
    fn test_sort_name_leaves_other_names() {
        assert_eq!(sort_name("Theory of a Deadman"), "Theory of a Deadman");
        assert_eq!(sort_name("Radiohead"), "Radiohead");
        assert_eq!(sort_name("The"), "The");
        assert_eq!(sort_name("  Aphex Twin "), "Aphex Twin");
    }

    #[test]
    fn test_artist_new_derives_names() {
        let artist = Artist::new(" The Cure ".to_string(), 10);
        assert_eq!(artist.name, "The Cure");
        assert_eq!(artist.normalized_name, "the cure");
        assert_eq!(artist.sort_name, "Cure, The");
        assert_eq!(artist.created_at, 10);
        assert!(artist.validate().is_ok());
        assert!(Artist::new("   ".to_string(), 0).validate().is_err());
    }

    #[test]
    fn test_album_validation() {
        let album = Album::new("Disintegration".to_string(), "artist-1".to_string(), 0);
        assert_eq!(album.normalized_title, "disintegration");
        assert!(album.validate().is_ok());

        let mut broken = album.clone();
        broken.track_count = -1;
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_rating_range() {
        assert!(validate_rating(0).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-1).is_err());
    }

    #[test]
    fn test_lyric_lines_decode() {
        let lines = vec![
            LyricLine {
                time_ms: Some(1200),
                text: "First".to_string(),
            },
            LyricLine::plain("Second"),
        ];
        let track = Track {
            id: "1".to_string(),
            title: "Song".to_string(),
            artist_id: None,
            album_id: None,
            duration: 1.0,
            uri: "/a.mp3".to_string(),
            filename: "a.mp3".to_string(),
            track_number: None,
            disc_number: None,
            year: None,
            composer: None,
            comment: None,
            lyrics: Some(serde_json::to_string(&lines).unwrap()),
            artwork_path: None,
            fingerprint: "f".to_string(),
            scanned_at: 0,
            is_deleted: false,
            is_favorite: false,
            favorited_at: None,
            play_count: 0,
            last_played_at: None,
            rating: None,
            date_added: 0,
            created_at: 0,
            updated_at: 0,
        };

        assert_eq!(track.lyric_lines(), lines);

        let mut garbled = track.clone();
        garbled.lyrics = Some("not json".to_string());
        assert!(garbled.lyric_lines().is_empty());
    }
}
