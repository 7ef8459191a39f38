//! # Repository Pattern Implementation
//!
//! Read access to the catalog plus the few user-owned flag flips. Catalog
//! content itself is written only by [`crate::catalog::CatalogWriter`].
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - Listings are paginated via the `Page<T>` wrapper
//!
//! ## Available Repositories
//!
//! - `TrackRepository` - Live tracks, favorites, ratings and play counts
//! - `ArtistRepository` - Artists with denormalized counts
//! - `AlbumRepository` - Albums keyed by normalized title and artist
//! - `GenreRepository` - Genres with their palette color and shape
//! - `ArtworkCacheRepository` - Content-addressed artwork bookkeeping
//! - `IndexerStateRepository` - Scan bookkeeping key/value pairs

pub mod album;
pub mod artist;
pub mod artwork_cache;
pub mod genre;
pub mod indexer_state;
pub mod pagination;
pub mod track;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use artwork_cache::{ArtworkCacheRepository, SqliteArtworkCacheRepository};
pub use genre::{assign_visual, GenreRepository, SqliteGenreRepository, GENRE_PALETTE, GENRE_SHAPES};
pub use indexer_state::{IndexerStateRepository, SqliteIndexerStateRepository};
pub use pagination::{Page, PageRequest, MAX_PAGE_SIZE};
pub use track::{SqliteTrackRepository, TrackRepository};
