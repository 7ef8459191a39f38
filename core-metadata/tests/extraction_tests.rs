//! Extraction against real files through the lofty reader

use core_metadata::extractor::MetadataExtractor;
use core_metadata::reader::LoftyTagReader;
use std::sync::Arc;

fn extractor() -> MetadataExtractor {
    MetadataExtractor::new(Arc::new(LoftyTagReader::new()))
}

#[tokio::test]
async fn test_missing_file_falls_back_to_filename() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Artist_-_Missing_Song.mp3");

    let metadata = extractor()
        .extract(
            &missing.to_string_lossy(),
            "Artist_-_Missing_Song.mp3",
            42.0,
        )
        .await;

    assert_eq!(metadata.title, "Artist - Missing Song");
    assert_eq!(metadata.duration, 42.0);
    assert!(!metadata.from_tags);
    assert!(metadata.artwork.is_none());
}

#[tokio::test]
async fn test_corrupted_file_falls_back_to_filename() {
    let dir = tempfile::tempdir().unwrap();
    let corrupt = dir.path().join("corrupt_track.dat");
    std::fs::write(&corrupt, b"This is not a valid audio file").unwrap();
    let uri = format!("file://{}", corrupt.display());

    let metadata = extractor().extract(&uri, "corrupt_track.dat", 0.0).await;

    assert_eq!(metadata.title, "corrupt track");
    assert_eq!(metadata.duration, 0.0);
    assert!(metadata.genres.is_empty());
    assert!(!metadata.from_tags);
}

#[tokio::test]
async fn test_unsupported_scheme_falls_back_to_filename() {
    let metadata = extractor()
        .extract("content://media/external/audio/media/7", "Voice_Memo.m4a", 5.0)
        .await;

    assert_eq!(metadata.title, "Voice Memo");
    assert!(!metadata.from_tags);
}
