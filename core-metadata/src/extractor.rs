//! Metadata Extraction
//!
//! Maps the loose [`RawTags`] from a [`TagReader`] into the closed
//! [`TrackMetadata`] the indexer writes to the catalog.
//!
//! ## Overview
//!
//! - Extraction never fails: reader errors degrade to metadata built from
//!   the cleaned filename
//! - Multi-valued artist and genre tags are split on `;` and `/`
//! - Years come from the first four digits of a date tag
//! - Track and disc numbers accept `"3/12"` forms
//! - Lyrics become a line list; LRC `[mm:ss.xx]` stamps are kept as offsets
//! - Artwork is read independently of text tags
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::MetadataExtractor;
//! use core_metadata::reader::LoftyTagReader;
//! use std::sync::Arc;
//!
//! let extractor = MetadataExtractor::new(Arc::new(LoftyTagReader::new()));
//! let metadata = extractor.extract("/music/01_intro.mp3", "01_intro.mp3", 0.0).await;
//! println!("{} ({:.1}s)", metadata.title, metadata.duration);
//! ```

use core_library::models::LyricLine;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::reader::{keys, ArtworkData, RawTags, TagReader};

/// Closed, interpreted metadata for one asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    /// Credited artists in tag order; the first is the primary artist
    pub artists: Vec<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub genres: Vec<String>,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub year: Option<i64>,
    pub composer: Option<String>,
    pub comment: Option<String>,
    pub lyrics: Vec<LyricLine>,
    /// Seconds
    pub duration: f64,
    pub artwork: Option<ArtworkData>,
    /// False when the reader failed and only the filename was used
    pub from_tags: bool,
}

impl TrackMetadata {
    /// Metadata derived from the filename alone
    pub fn from_filename(filename: &str, duration: f64) -> Self {
        Self {
            title: clean_filename(filename),
            duration,
            ..Default::default()
        }
    }

    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }
}

/// Best-effort metadata extractor over an injected [`TagReader`]
#[derive(Clone)]
pub struct MetadataExtractor {
    reader: Arc<dyn TagReader>,
}

impl MetadataExtractor {
    pub fn new(reader: Arc<dyn TagReader>) -> Self {
        Self { reader }
    }

    /// Extract metadata for one asset. Never fails.
    ///
    /// # Arguments
    ///
    /// * `uri` - Locator handed to the reader
    /// * `filename` - Display name used for the fallback title
    /// * `duration` - Duration reported by the media store; `0.0` defers to
    ///   the duration found by the reader
    pub async fn extract(&self, uri: &str, filename: &str, duration: f64) -> TrackMetadata {
        let mut metadata = match self.reader.read_tags(uri).await {
            Ok(tags) => Self::interpret(&tags, filename, duration),
            Err(e) => {
                if e.is_unreadable_source() {
                    debug!(%uri, error = %e, "Tags unreadable, using filename");
                } else {
                    warn!(%uri, error = %e, "Tag read failed, using filename");
                }
                TrackMetadata::from_filename(filename, duration)
            }
        };

        metadata.artwork = match self.reader.read_artwork(uri).await {
            Ok(artwork) => artwork,
            Err(e) => {
                debug!(%uri, error = %e, "Artwork read failed");
                None
            }
        };

        metadata
    }

    /// Map loose tags into [`TrackMetadata`]
    pub fn interpret(tags: &RawTags, filename: &str, duration: f64) -> TrackMetadata {
        let duration = if duration > 0.0 {
            duration
        } else {
            tags.duration.filter(|d| *d > 0.0).unwrap_or(0.0)
        };

        TrackMetadata {
            title: tags
                .get(keys::TITLE)
                .map(normalize_text)
                .unwrap_or_else(|| clean_filename(filename)),
            artists: tags.get(keys::ARTIST).map(split_multi).unwrap_or_default(),
            album_artist: tags.get(keys::ALBUM_ARTIST).map(normalize_text),
            album: tags.get(keys::ALBUM).map(normalize_text),
            genres: tags.get(keys::GENRE).map(split_multi).unwrap_or_default(),
            track_number: tags.get(keys::TRACK_NUMBER).and_then(parse_position),
            disc_number: tags.get(keys::DISC_NUMBER).and_then(parse_position),
            year: tags.get(keys::DATE).and_then(parse_year),
            composer: tags.get(keys::COMPOSER).map(normalize_text),
            comment: tags.get(keys::COMMENT).map(str::to_string),
            lyrics: tags.get(keys::LYRICS).map(parse_lyrics).unwrap_or_default(),
            duration,
            artwork: None,
            from_tags: true,
        }
    }
}

/// Collapse whitespace runs and drop control characters
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Title from a filename: extension stripped, `_` read as a space,
/// whitespace collapsed.
pub fn clean_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let cleaned = normalize_text(&stem.replace('_', " "));
    if cleaned.is_empty() {
        filename.trim().to_string()
    } else {
        cleaned
    }
}

/// Split a multi-valued tag on `;` and `/`.
///
/// Names containing a slash (`AC/DC`) are split too; tags that need the
/// slash should use `;`-only readers.
pub fn split_multi(value: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for part in value.split([';', '/']) {
        let part = normalize_text(part);
        if !part.is_empty() && !seen.contains(&part) {
            seen.push(part);
        }
    }
    seen
}

/// `"3"` or `"3/12"` to `3`; zero and garbage are `None`
fn parse_position(value: &str) -> Option<i64> {
    value
        .split('/')
        .next()
        .and_then(|n| n.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
}

/// First four digits of a date tag
fn parse_year(value: &str) -> Option<i64> {
    let digits = value.trim().get(..4)?;
    if digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok().filter(|y| *y > 0)
    } else {
        None
    }
}

/// Lines of a lyrics tag. A leading `[mm:ss.xx]` stamp becomes the offset.
fn parse_lyrics(text: &str) -> Vec<LyricLine> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match parse_lrc_stamp(line) {
                Some((time_ms, rest)) => Some(LyricLine {
                    time_ms: Some(time_ms),
                    text: rest.trim().to_string(),
                }),
                None => Some(LyricLine::plain(line)),
            }
        })
        .collect()
}

fn parse_lrc_stamp(line: &str) -> Option<(u64, &str)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, text) = rest.split_once(']')?;
    let (minutes, seconds) = stamp.split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let time_ms = minutes
        .checked_mul(60_000)?
        .checked_add((seconds * 1000.0).round() as u64)?;
    Some((time_ms, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MetadataError, Result};
    use async_trait::async_trait;
    use bytes::Bytes;

    struct StubReader {
        tags: Option<RawTags>,
        artwork: Option<ArtworkData>,
    }

    #[async_trait]
    impl TagReader for StubReader {
        async fn read_tags(&self, uri: &str) -> Result<RawTags> {
            self.tags
                .clone()
                .ok_or_else(|| MetadataError::ExtractionFailed(uri.to_string()))
        }

        async fn read_artwork(&self, _uri: &str) -> Result<Option<ArtworkData>> {
            Ok(self.artwork.clone())
        }
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("01_My__Song.mp3"), "01 My Song");
        assert_eq!(clean_filename("  spaced   out .flac"), "spaced out");
        assert_eq!(clean_filename("no_extension"), "no extension");
        assert_eq!(clean_filename("dotted.name.ogg"), "dotted.name");
    }

    #[test]
    fn test_split_multi() {
        assert_eq!(split_multi("A; B /C;;"), vec!["A", "B", "C"]);
        assert_eq!(split_multi("Rock;Rock"), vec!["Rock"]);
        assert!(split_multi(" ; / ").is_empty());
    }

    #[test]
    fn test_parse_position_and_year() {
        assert_eq!(parse_position("3/12"), Some(3));
        assert_eq!(parse_position(" 7 "), Some(7));
        assert_eq!(parse_position("0"), None);
        assert_eq!(parse_position("A"), None);

        assert_eq!(parse_year("1999-05-01"), Some(1999));
        assert_eq!(parse_year("2004"), Some(2004));
        assert_eq!(parse_year("'99"), None);
        assert_eq!(parse_year("19"), None);
    }

    #[test]
    fn test_parse_lyrics() {
        let lines = parse_lyrics("[00:01.50] Hello\n\nplain line\n[01:02.00]World");
        assert_eq!(
            lines,
            vec![
                LyricLine {
                    time_ms: Some(1500),
                    text: "Hello".to_string()
                },
                LyricLine::plain("plain line"),
                LyricLine {
                    time_ms: Some(62_000),
                    text: "World".to_string()
                },
            ]
        );
        assert_eq!(parse_lyrics("[ar:Someone]")[0].time_ms, None);
    }

    #[test]
    fn test_oversized_lyric_stamp_stays_plain_text() {
        let tags = RawTags::new().with(keys::LYRICS, "[999999999999999:00.00] boom");
        let metadata = MetadataExtractor::interpret(&tags, "x.mp3", 1.0);
        assert_eq!(
            metadata.lyrics,
            vec![LyricLine::plain("[999999999999999:00.00] boom")]
        );
    }

    #[test]
    fn test_interpret_full_tags() {
        let tags = RawTags::new()
            .with(keys::TITLE, "  Song   Title ")
            .with(keys::ARTIST, "Main; Guest")
            .with(keys::ALBUM_ARTIST, "Main")
            .with(keys::ALBUM, "Record")
            .with(keys::GENRE, "Rock/Pop")
            .with(keys::TRACK_NUMBER, "4/10")
            .with(keys::DISC_NUMBER, "2")
            .with(keys::DATE, "2001-09-11")
            .with_duration(200.0);

        let metadata = MetadataExtractor::interpret(&tags, "file.mp3", 0.0);

        assert_eq!(metadata.title, "Song Title");
        assert_eq!(metadata.primary_artist(), Some("Main"));
        assert_eq!(metadata.artists, vec!["Main", "Guest"]);
        assert_eq!(metadata.genres, vec!["Rock", "Pop"]);
        assert_eq!(metadata.track_number, Some(4));
        assert_eq!(metadata.disc_number, Some(2));
        assert_eq!(metadata.year, Some(2001));
        assert_eq!(metadata.duration, 200.0);
        assert!(metadata.from_tags);
    }

    #[test]
    fn test_interpret_prefers_store_duration_and_filename_title() {
        let tags = RawTags::new().with_duration(99.0);
        let metadata = MetadataExtractor::interpret(&tags, "Some_Track.m4a", 120.0);

        assert_eq!(metadata.title, "Some Track");
        assert_eq!(metadata.duration, 120.0);
        assert!(metadata.artists.is_empty());
        assert!(metadata.genres.is_empty());
    }

    #[tokio::test]
    async fn test_extract_never_fails() {
        let extractor = MetadataExtractor::new(Arc::new(StubReader {
            tags: None,
            artwork: None,
        }));

        let metadata = extractor.extract("/x/broken_file.mp3", "broken_file.mp3", 33.0).await;

        assert_eq!(metadata.title, "broken file");
        assert_eq!(metadata.duration, 33.0);
        assert!(metadata.artists.is_empty());
        assert!(metadata.album.is_none());
        assert!(!metadata.from_tags);
    }

    #[tokio::test]
    async fn test_artwork_read_independently_of_tags() {
        let art = ArtworkData::Bytes {
            data: Bytes::from_static(b"\xff\xd8\xff"),
            mime_type: "image/jpeg".to_string(),
        };
        let extractor = MetadataExtractor::new(Arc::new(StubReader {
            tags: None,
            artwork: Some(art.clone()),
        }));

        let metadata = extractor.extract("/x/a.mp3", "a.mp3", 1.0).await;
        assert!(!metadata.from_tags);
        assert_eq!(metadata.artwork, Some(art));
    }
}
