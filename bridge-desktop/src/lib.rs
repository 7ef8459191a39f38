//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`
//! - `MediaAssetProvider` as a recursive walk of configured library folders
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryMediaProvider, TokioFileSystem};
//!
//! let fs = TokioFileSystem::new();
//! let provider = DirectoryMediaProvider::new(vec!["/home/me/Music".into()]);
//! ```

mod filesystem;
mod media;

pub use filesystem::TokioFileSystem;
pub use media::DirectoryMediaProvider;
