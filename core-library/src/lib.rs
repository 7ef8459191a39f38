//! # Media Catalog
//!
//! Owns the normalized catalog database: schema and migrations, the domain
//! models, read repositories and the [`catalog::CatalogWriter`] that the
//! indexer uses for every content write.
//!
//! ## Overview
//!
//! - SQLite connection pool with embedded migrations ([`db`])
//! - Tracks, artists, albums, genres and their joins ([`models`])
//! - Paginated read access and user flag flips ([`repositories`])
//! - Idempotent batch upsert, soft delete and cleanup ([`catalog`])
//! - FNV-1a hashing shared by fingerprints and artwork addresses ([`hashing`])

pub mod catalog;
pub mod db;
pub mod error;
pub mod hashing;
pub mod models;
pub mod repositories;

pub use catalog::{BatchOutcome, CatalogEntry, CatalogWriter, CleanupStats};
pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
