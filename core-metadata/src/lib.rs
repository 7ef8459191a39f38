//! # Metadata & Artwork Module
//!
//! Reads tags and embedded artwork from audio assets and stores artwork in a
//! content-addressed cache.
//!
//! ## Overview
//!
//! This module handles:
//! - The [`reader::TagReader`] seam and its `lofty` implementation
//! - Best-effort interpretation of loose tags ([`extractor`])
//! - Artwork deduplication by content hash ([`artwork`])

pub mod artwork;
pub mod error;
pub mod extractor;
pub mod reader;

pub use artwork::ArtworkCache;
pub use error::{MetadataError, Result};
pub use extractor::{MetadataExtractor, TrackMetadata};
pub use reader::{ArtworkData, LoftyTagReader, RawTags, TagReader};
