//! Tag reading seam
//!
//! A [`TagReader`] turns one asset locator into a loose key/value map of
//! text tags plus optional embedded artwork. Readers do no interpretation;
//! [`crate::extractor::MetadataExtractor`] maps the loose tags into the
//! closed [`crate::extractor::TrackMetadata`] once.
//!
//! [`LoftyTagReader`] is the default implementation for local files.

use async_trait::async_trait;
use bytes::Bytes;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{MetadataError, Result};

/// Well-known keys in [`RawTags`]
pub mod keys {
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const ALBUM_ARTIST: &str = "album_artist";
    pub const ALBUM: &str = "album";
    pub const GENRE: &str = "genre";
    pub const TRACK_NUMBER: &str = "track_number";
    pub const DISC_NUMBER: &str = "disc_number";
    /// Free-form date such as `1999` or `1999-05-01`
    pub const DATE: &str = "date";
    pub const COMPOSER: &str = "composer";
    pub const COMMENT: &str = "comment";
    pub const LYRICS: &str = "lyrics";
}

/// Loose text tags as reported by a reader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    fields: HashMap<String, String>,
    /// Duration reported by the container, in seconds
    pub duration: Option<f64>,
}

impl RawTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Trimmed value, `None` when absent or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Embedded or referenced cover art
#[derive(Debug, Clone, PartialEq)]
pub enum ArtworkData {
    /// Raw image bytes to be stored in the artwork cache
    Bytes { data: Bytes, mime_type: String },
    /// A locator the platform already serves; used as-is
    Reference(String),
}

/// Reads tags and artwork for one asset
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read_tags(&self, uri: &str) -> Result<RawTags>;

    /// First front cover, or the first picture when no cover is tagged
    async fn read_artwork(&self, uri: &str) -> Result<Option<ArtworkData>>;
}

/// [`TagReader`] backed by `lofty`, for plain paths and `file://` URIs
#[derive(Debug, Clone, Default)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }

    fn resolve_path(uri: &str) -> Result<PathBuf> {
        let path = match uri.strip_prefix("file://") {
            Some(rest) => rest,
            None if uri.contains("://") => {
                return Err(MetadataError::UnsupportedFormat(format!(
                    "Cannot read tags from {}",
                    uri
                )))
            }
            None => uri,
        };

        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.display().to_string()));
        }
        Ok(path)
    }

    fn probe(path: PathBuf) -> Result<lofty::file::TaggedFile> {
        Probe::open(&path)
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to open file: {}", e)))?
            .guess_file_type()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to probe file: {}", e)))?
            .read()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to parse file: {}", e)))
    }

    fn collect_tags(tag: &Tag, tags: &mut RawTags) {
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                tags.insert(key, value);
            }
        };

        put(keys::TITLE, tag.title().map(|s| s.into_owned()));
        put(keys::ARTIST, joined(tag, &ItemKey::TrackArtist));
        put(keys::ALBUM_ARTIST, joined(tag, &ItemKey::AlbumArtist));
        put(keys::ALBUM, tag.album().map(|s| s.into_owned()));
        put(keys::GENRE, joined(tag, &ItemKey::Genre));
        put(
            keys::TRACK_NUMBER,
            tag.get_string(&ItemKey::TrackNumber)
                .map(str::to_string)
                .or_else(|| tag.track().map(|n| n.to_string())),
        );
        put(
            keys::DISC_NUMBER,
            tag.get_string(&ItemKey::DiscNumber)
                .map(str::to_string)
                .or_else(|| tag.disk().map(|n| n.to_string())),
        );
        put(
            keys::DATE,
            tag.get_string(&ItemKey::RecordingDate)
                .or_else(|| tag.get_string(&ItemKey::Year))
                .map(str::to_string),
        );
        put(keys::COMPOSER, tag.get_string(&ItemKey::Composer).map(str::to_string));
        put(keys::COMMENT, tag.comment().map(|s| s.into_owned()));
        put(keys::LYRICS, tag.get_string(&ItemKey::Lyrics).map(str::to_string));
    }

    fn pick_artwork(tag: &Tag) -> Option<ArtworkData> {
        let picture = tag
            .get_picture_type(PictureType::CoverFront)
            .or_else(|| tag.pictures().first())?;
        if picture.data().is_empty() {
            return None;
        }

        let mime_type = match picture.mime_type() {
            Some(MimeType::Png) => "image/png",
            Some(MimeType::Gif) => "image/gif",
            Some(MimeType::Bmp) => "image/bmp",
            Some(MimeType::Tiff) => "image/tiff",
            _ => "image/jpeg",
        };

        Some(ArtworkData::Bytes {
            data: Bytes::copy_from_slice(picture.data()),
            mime_type: mime_type.to_string(),
        })
    }
}

/// All values for a key joined with `;` so multi-valued frames survive
fn joined(tag: &Tag, key: &ItemKey) -> Option<String> {
    let values: Vec<&str> = tag.get_strings(key).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(";"))
    }
}

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, uri: &str) -> Result<RawTags> {
        let path = Self::resolve_path(uri)?;
        let uri = uri.to_string();

        tokio::task::spawn_blocking(move || {
            let tagged_file = Self::probe(path)?;
            let mut tags = RawTags::new();
            tags.duration = Some(tagged_file.properties().duration().as_secs_f64());

            match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
                Some(tag) => Self::collect_tags(tag, &mut tags),
                None => debug!(%uri, "No tags found"),
            }
            Ok(tags)
        })
        .await
        .map_err(|e| MetadataError::ExtractionFailed(format!("Tag reader task failed: {}", e)))?
    }

    async fn read_artwork(&self, uri: &str) -> Result<Option<ArtworkData>> {
        let path = Self::resolve_path(uri)?;

        tokio::task::spawn_blocking(move || {
            let tagged_file = Self::probe(path)?;
            Ok(tagged_file
                .primary_tag()
                .and_then(Self::pick_artwork)
                .or_else(|| tagged_file.tags().iter().find_map(Self::pick_artwork)))
        })
        .await
        .map_err(|e| MetadataError::ExtractionFailed(format!("Artwork reader task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_tags_get_trims_and_drops_blank() {
        let tags = RawTags::new()
            .with(keys::TITLE, "  Song  ")
            .with(keys::ALBUM, "   ")
            .with_duration(12.5);

        assert_eq!(tags.get(keys::TITLE), Some("Song"));
        assert_eq!(tags.get(keys::ALBUM), None);
        assert_eq!(tags.get(keys::ARTIST), None);
        assert_eq!(tags.duration, Some(12.5));
    }

    #[test]
    fn test_resolve_path_rejects_remote_schemes() {
        assert!(matches!(
            LoftyTagReader::resolve_path("content://media/external/audio/1"),
            Err(MetadataError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            LoftyTagReader::resolve_path("/definitely/not/here.mp3"),
            Err(MetadataError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lofty_reader_fails_on_non_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"this is not audio").unwrap();
        let uri = format!("file://{}", path.display());

        let reader = LoftyTagReader::new();
        assert!(reader.read_tags(&uri).await.is_err());
        assert!(reader.read_artwork(&uri).await.is_err());
    }
}
