//! Change Detection
//!
//! Every asset is reduced to a fingerprint over the fields the media store
//! updates when a file changes. A scan compares the fingerprints of the
//! current asset listing with those stored on the catalog's live tracks.

use bridge_traits::media::AssetDescriptor;
use core_library::hashing::{to_hex, Fnv1a64};
use std::collections::{HashMap, HashSet};

/// Fingerprint of an asset: FNV-1a 64 over `uri|modification_time|duration`
/// with the duration at millisecond precision.
pub fn fingerprint(asset: &AssetDescriptor) -> String {
    let mut hasher = Fnv1a64::new();
    hasher.write(asset.uri.as_bytes());
    hasher.write(b"|");
    hasher.write(asset.modification_time.to_string().as_bytes());
    hasher.write(b"|");
    hasher.write(format!("{:.3}", asset.duration).as_bytes());
    to_hex(hasher.finish())
}

/// An asset selected for processing, with the fingerprint to store once it
/// is written.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAsset {
    pub asset: AssetDescriptor,
    pub fingerprint: String,
}

/// Result of comparing the current listing with the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanDiff {
    /// Assets to extract and write, in listing order
    pub to_process: Vec<PendingAsset>,
    /// Catalog track ids with no current asset, sorted
    pub to_delete: Vec<String>,
    /// Assets whose fingerprint matched and were skipped
    pub unchanged: usize,
}

impl ScanDiff {
    pub fn is_empty(&self) -> bool {
        self.to_process.is_empty() && self.to_delete.is_empty()
    }
}

/// Compare `assets` against the catalog's `id -> fingerprint` map.
///
/// With `force_full_scan` every asset is processed; deletions are computed
/// the same way in both modes.
pub fn diff(
    assets: Vec<AssetDescriptor>,
    catalog: &HashMap<String, String>,
    force_full_scan: bool,
) -> ScanDiff {
    let present: HashSet<&str> = assets.iter().map(|a| a.id.as_str()).collect();

    let mut to_delete: Vec<String> = catalog
        .keys()
        .filter(|id| !present.contains(id.as_str()))
        .cloned()
        .collect();
    to_delete.sort();

    let mut to_process = Vec::new();
    let mut unchanged = 0;
    for asset in assets {
        let fingerprint = fingerprint(&asset);
        let matches = catalog.get(&asset.id) == Some(&fingerprint);
        if matches && !force_full_scan {
            unchanged += 1;
        } else {
            to_process.push(PendingAsset { asset, fingerprint });
        }
    }

    ScanDiff {
        to_process,
        to_delete,
        unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, modified: i64) -> AssetDescriptor {
        AssetDescriptor::new(id, format!("file:///music/{id}.mp3"), format!("{id}.mp3"))
            .with_modification_time(modified)
            .with_duration(180.0)
    }

    fn catalog_of(assets: &[AssetDescriptor]) -> HashMap<String, String> {
        assets
            .iter()
            .map(|a| (a.id.clone(), fingerprint(a)))
            .collect()
    }

    fn ids(pending: &[PendingAsset]) -> Vec<&str> {
        pending.iter().map(|p| p.asset.id.as_str()).collect()
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = asset("a", 100);
        let first = fingerprint(&a);
        assert_eq!(first, fingerprint(&a.clone()));
        assert_eq!(first.len(), 16);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_tracks_modification_and_duration() {
        let a = asset("a", 100);
        assert_ne!(fingerprint(&a), fingerprint(&asset("a", 101)));
        assert_ne!(fingerprint(&a), fingerprint(&a.clone().with_duration(180.5)));
        // Sub-millisecond jitter is not a change
        assert_eq!(
            fingerprint(&a),
            fingerprint(&a.clone().with_duration(180.0001))
        );
    }

    #[test]
    fn test_fingerprint_ignores_id_and_filename() {
        let a = asset("a", 100);
        let mut renamed = a.clone();
        renamed.id = "other".to_string();
        renamed.filename = "other.mp3".to_string();
        assert_eq!(fingerprint(&a), fingerprint(&renamed));
    }

    #[test]
    fn test_diff_detects_modified_added_and_removed() {
        let before = vec![asset("a", 1), asset("b", 1), asset("c", 1)];
        let catalog = catalog_of(&before);

        let after = vec![asset("a", 1), asset("b", 2), asset("d", 1)];
        let diff = diff(after, &catalog, false);

        assert_eq!(ids(&diff.to_process), vec!["b", "d"]);
        assert_eq!(diff.to_delete, vec!["c".to_string()]);
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn test_diff_without_changes_is_empty() {
        let assets = vec![asset("a", 1), asset("b", 1)];
        let catalog = catalog_of(&assets);

        let diff = diff(assets, &catalog, false);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, 2);
    }

    #[test]
    fn test_forced_diff_processes_everything() {
        let assets = vec![asset("a", 1), asset("b", 1)];
        let mut catalog = catalog_of(&assets);
        catalog.insert("gone".to_string(), "0000000000000000".to_string());

        let diff = diff(assets, &catalog, true);
        assert_eq!(ids(&diff.to_process), vec!["a", "b"]);
        assert_eq!(diff.to_delete, vec!["gone".to_string()]);
        assert_eq!(diff.unchanged, 0);
    }

    #[test]
    fn test_pending_carries_new_fingerprint() {
        let diff = diff(vec![asset("a", 7)], &HashMap::new(), false);
        assert_eq!(diff.to_process[0].fingerprint, fingerprint(&asset("a", 7)));
    }
}
