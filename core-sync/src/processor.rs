//! Asset processing
//!
//! Turns pending assets into [`CatalogEntry`] values ready for the catalog
//! writer: metadata extraction, artwork storage, and the mapping between the
//! two models.
//!
//! Extraction within a batch runs with bounded concurrency, but results are
//! returned in input order so catalog writes stay in asset order.

use core_library::CatalogEntry;
use core_metadata::artwork::ArtworkCache;
use core_metadata::extractor::{MetadataExtractor, TrackMetadata};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fingerprint::PendingAsset;

pub struct AssetProcessor {
    extractor: MetadataExtractor,
    artwork: Arc<ArtworkCache>,
    concurrency: usize,
}

impl AssetProcessor {
    pub fn new(extractor: MetadataExtractor, artwork: Arc<ArtworkCache>, concurrency: usize) -> Self {
        Self {
            extractor,
            artwork,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Prepare one asset. Never fails: extraction falls back to the filename
    /// and artwork errors leave the entry without artwork.
    pub async fn prepare(&self, pending: &PendingAsset) -> CatalogEntry {
        let asset = &pending.asset;
        let metadata = self
            .extractor
            .extract(&asset.uri, &asset.filename, asset.duration)
            .await;

        let artwork_path = match &metadata.artwork {
            Some(artwork) => match self.artwork.store(artwork).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(asset_id = %asset.id, error = %e, "Failed to store artwork");
                    None
                }
            },
            None => None,
        };

        debug!(
            asset_id = %asset.id,
            from_tags = metadata.from_tags,
            has_artwork = artwork_path.is_some(),
            "Prepared asset"
        );

        to_entry(pending, metadata, artwork_path)
    }

    /// Prepare a batch, keeping input order.
    pub async fn prepare_batch(&self, batch: &[PendingAsset]) -> Vec<CatalogEntry> {
        let futures: Vec<_> = batch.iter().map(|pending| self.prepare(pending)).collect();
        stream::iter(futures)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Map extracted metadata onto the writer's input model
pub fn to_entry(
    pending: &PendingAsset,
    metadata: TrackMetadata,
    artwork_path: Option<String>,
) -> CatalogEntry {
    let asset = &pending.asset;
    let date_added = if asset.creation_time > 0 {
        asset.creation_time
    } else {
        asset.modification_time
    };
    let artist = metadata.primary_artist().map(str::to_string);

    CatalogEntry {
        date_added,
        duration: metadata.duration,
        title: metadata.title,
        artist,
        album_artist: metadata.album_artist,
        album: metadata.album,
        genres: metadata.genres,
        track_number: metadata.track_number,
        disc_number: metadata.disc_number,
        year: metadata.year,
        composer: metadata.composer,
        comment: metadata.comment,
        lyrics: metadata.lyrics,
        artwork_path,
        ..CatalogEntry::new(
            asset.id.clone(),
            asset.uri.clone(),
            asset.filename.clone(),
            pending.fingerprint.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::media::AssetDescriptor;
    use bridge_traits::time::FixedClock;
    use bytes::Bytes;
    use core_library::db::create_test_pool;
    use core_library::repositories::SqliteArtworkCacheRepository;
    use core_metadata::reader::{keys, ArtworkData, RawTags, TagReader};
    use core_metadata::{MetadataError, Result as MetadataResult};
    use tempfile::TempDir;

    struct StubReader;

    #[async_trait]
    impl TagReader for StubReader {
        async fn read_tags(&self, uri: &str) -> MetadataResult<RawTags> {
            if uri.contains("broken") {
                return Err(MetadataError::ExtractionFailed("corrupt header".into()));
            }
            Ok(RawTags::new()
                .with(keys::TITLE, format!("Title of {uri}"))
                .with(keys::ARTIST, "Main; Guest")
                .with(keys::ALBUM, "Record")
                .with(keys::GENRE, "Rock/Pop")
                .with_duration(200.0))
        }

        async fn read_artwork(&self, uri: &str) -> MetadataResult<Option<ArtworkData>> {
            if uri.contains("cover") {
                Ok(Some(ArtworkData::Bytes {
                    data: Bytes::from_static(b"shared cover bytes"),
                    mime_type: "image/jpeg".into(),
                }))
            } else {
                Ok(None)
            }
        }
    }

    async fn processor(dir: &TempDir) -> AssetProcessor {
        let pool = create_test_pool().await.unwrap();
        let artwork = ArtworkCache::new(
            Arc::new(SqliteArtworkCacheRepository::new(pool)),
            Arc::new(TokioFileSystem::new()),
            Arc::new(FixedClock::new(1)),
            dir.path().join("artwork"),
        );
        AssetProcessor::new(
            MetadataExtractor::new(Arc::new(StubReader)),
            Arc::new(artwork),
            3,
        )
    }

    fn pending(id: &str) -> PendingAsset {
        let asset = AssetDescriptor::new(id, format!("/music/{id}.mp3"), format!("{id}.mp3"))
            .with_modification_time(50);
        PendingAsset {
            fingerprint: fingerprint(&asset),
            asset,
        }
    }

    #[tokio::test]
    async fn test_prepare_maps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(&dir).await;
        let input = pending("song");

        let entry = processor.prepare(&input).await;

        assert_eq!(entry.id, "song");
        assert_eq!(entry.fingerprint, input.fingerprint);
        assert_eq!(entry.title, "Title of /music/song.mp3");
        assert_eq!(entry.artist.as_deref(), Some("Main"));
        assert_eq!(entry.genres, vec!["Rock".to_string(), "Pop".to_string()]);
        assert_eq!(entry.duration, 200.0);
        assert_eq!(entry.date_added, 50);
        assert!(entry.artwork_path.is_none());
    }

    #[tokio::test]
    async fn test_prepare_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(&dir).await;

        let entry = processor.prepare(&pending("broken_file_name")).await;

        assert_eq!(entry.title, "broken file name");
        assert!(entry.artist.is_none());
        assert!(entry.genres.is_empty());
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_shares_artwork() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(&dir).await;
        let batch: Vec<_> = ["cover-a", "plain", "cover-b", "broken", "cover-c"]
            .into_iter()
            .map(pending)
            .collect();

        let entries = processor.prepare_batch(&batch).await;

        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["cover-a", "plain", "cover-b", "broken", "cover-c"]);

        let covers: Vec<_> = entries
            .iter()
            .filter_map(|e| e.artwork_path.as_deref())
            .collect();
        assert_eq!(covers.len(), 3);
        assert!(covers.iter().all(|path| *path == covers[0]));
    }

    #[test]
    fn test_date_added_prefers_creation_time() {
        let mut input = pending("a");
        input.asset.creation_time = 10;
        let entry = to_entry(&input, TrackMetadata::from_filename("a.mp3", 1.0), None);
        assert_eq!(entry.date_added, 10);
        assert_eq!(entry.title, "a");
    }
}
