//! Asset Enumerator
//!
//! Drains the host media store page by page into a single listing. The
//! listing is all-or-nothing: a provider error discards any pages already
//! received.

use bridge_traits::media::{AssetDescriptor, MediaAssetProvider, PermissionStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};

pub struct AssetEnumerator {
    provider: Arc<dyn MediaAssetProvider>,
    page_size: usize,
}

impl AssetEnumerator {
    pub fn new(provider: Arc<dyn MediaAssetProvider>, page_size: usize) -> Self {
        Self {
            provider,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// List every audio asset the provider reports.
    ///
    /// Cancellation is checked before each page. Assets repeated across pages
    /// are collapsed by id, keeping the last occurrence at the position of the
    /// first.
    #[instrument(skip(self, cancel), fields(page_size = self.page_size))]
    pub async fn list_audio_assets(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<AssetDescriptor>> {
        match self.provider.request_permission().await {
            Ok(PermissionStatus::Granted) => {}
            Ok(PermissionStatus::Denied) => {
                return Err(SyncError::Provider(
                    "Media library permission denied".to_string(),
                ))
            }
            Err(e) => return Err(SyncError::Provider(e.to_string())),
        }

        let mut assets: Vec<AssetDescriptor> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let page = self
                .provider
                .list_assets(cursor.clone(), self.page_size)
                .await
                .map_err(|e| SyncError::Provider(e.to_string()))?;
            pages += 1;

            debug!(page = pages, assets = page.assets.len(), "Received asset page");

            for asset in page.assets {
                match positions.get(&asset.id) {
                    Some(&index) => assets[index] = asset,
                    None => {
                        positions.insert(asset.id.clone(), assets.len());
                        assets.push(asset);
                    }
                }
            }

            match page.next_cursor {
                None => break,
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(SyncError::Provider(format!(
                        "Provider returned the same cursor twice: {}",
                        next
                    )));
                }
                Some(next) => cursor = Some(next),
            }
        }

        info!(pages, assets = assets.len(), "Enumerated media assets");
        Ok(assets)
    }
}
