//! Media Asset Store Abstractions
//!
//! The host platform owns the catalog of audio files on the device (the
//! system media store on mobile, a set of library folders on desktop). The
//! core only ever sees it through [`MediaAssetProvider`], a cursor-paginated
//! listing of [`AssetDescriptor`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One audio asset as reported by the host media store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Stable identifier assigned by the media store
    pub id: String,
    /// Content locator (file path, `file://` or platform content URI)
    pub uri: String,
    /// Display file name including extension
    pub filename: String,
    /// Last modification time (Unix seconds)
    pub modification_time: i64,
    /// Creation time (Unix seconds)
    pub creation_time: i64,
    /// Duration in seconds, `0.0` when the store does not know it
    pub duration: f64,
}

impl AssetDescriptor {
    pub fn new(
        id: impl Into<String>,
        uri: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            filename: filename.into(),
            modification_time: 0,
            creation_time: 0,
            duration: 0.0,
        }
    }

    pub fn with_modification_time(mut self, modification_time: i64) -> Self {
        self.modification_time = modification_time;
        self
    }

    pub fn with_creation_time(mut self, creation_time: i64) -> Self {
        self.creation_time = creation_time;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }
}

/// A single page of assets plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPage {
    pub assets: Vec<AssetDescriptor>,
    /// `None` when this was the last page
    pub next_cursor: Option<String>,
}

impl AssetPage {
    pub fn new(assets: Vec<AssetDescriptor>, next_cursor: Option<String>) -> Self {
        Self {
            assets,
            next_cursor,
        }
    }

    /// A terminal page
    pub fn last(assets: Vec<AssetDescriptor>) -> Self {
        Self::new(assets, None)
    }
}

/// Result of a media library permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Host media store access
///
/// Implementations:
/// - Android/iOS: MediaStore / MPMediaLibrary queries restricted to audio
/// - Desktop: a recursive walk of the configured library folders
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::MediaAssetProvider;
///
/// async fn count_assets(provider: &dyn MediaAssetProvider) -> Result<usize> {
///     let mut cursor = None;
///     let mut total = 0;
///     loop {
///         let page = provider.list_assets(cursor, 500).await?;
///         total += page.assets.len();
///         match page.next_cursor {
///             Some(next) => cursor = Some(next),
///             None => return Ok(total),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait MediaAssetProvider: Send + Sync {
    /// Ensure the app may read the media store.
    ///
    /// Platforms without a permission model keep the default.
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    /// List one page of audio assets.
    ///
    /// # Arguments
    ///
    /// * `cursor` - `None` for the first page, otherwise the `next_cursor` of
    ///   the previous page
    /// * `page_size` - Maximum number of assets to return
    async fn list_assets(&self, cursor: Option<String>, page_size: usize) -> Result<AssetPage>;
}
