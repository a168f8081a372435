//! Disk cache for downloaded artwork.
//!
//! Images are stored under `<root>/<category>/<url basename>`, e.g.
//! `~/.config/gridcache/cache/grids/hero/abc123.png`. A file's existence is
//! the cache-hit signal; there is no separate index.

use std::path::{Path, PathBuf};

use gridcache_steamgriddb::ArtCategory;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::download::DownloadTracker;
use crate::error::ArtError;
use crate::gateway::ArtGateway;
use crate::types::NativeAppId;

/// Category-partitioned image store.
pub struct BlobStore {
    root: PathBuf,
    downloads: DownloadTracker,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            downloads: DownloadTracker::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// In-flight download registry.
    pub fn downloads(&self) -> &DownloadTracker {
        &self.downloads
    }

    /// Creates the root and one directory per category. Idempotent.
    pub async fn ensure_layout(&self) -> Result<(), ArtError> {
        for category in ArtCategory::ALL {
            tokio::fs::create_dir_all(self.category_dir(category)).await?;
        }
        Ok(())
    }

    pub fn category_dir(&self, category: ArtCategory) -> PathBuf {
        self.root.join(category.as_str())
    }

    /// Maps an image URL to its local path.
    ///
    /// Two URLs sharing a basename in the same category map to the same
    /// file. URLs without a usable basename fall back to [`hash_url`].
    pub fn resolve_local_path(&self, category: ArtCategory, url: &str) -> PathBuf {
        let name = match url_basename(url) {
            Some(name) => name.to_string(),
            None => hash_url(url),
        };
        self.category_dir(category).join(name)
    }

    /// Returns the local path of an image if it is already cached.
    pub async fn lookup(&self, category: ArtCategory, url: &str) -> Option<PathBuf> {
        let path = self.resolve_local_path(category, url);
        is_file(&path).await.then_some(path)
    }

    /// Returns the local path of an image, downloading it first if needed.
    ///
    /// While the download runs, `app_id` is reported as downloading. A
    /// failed download or write returns the error; a path is only returned
    /// once the file is present.
    pub async fn get_or_fetch(
        &self,
        gateway: &dyn ArtGateway,
        app_id: NativeAppId,
        category: ArtCategory,
        url: &str,
    ) -> Result<PathBuf, ArtError> {
        let path = self.resolve_local_path(category, url);
        if is_file(&path).await {
            debug!(path = %path.display(), "image cache hit");
            return Ok(path);
        }

        let lock = self.downloads.path_lock(&path);
        let _held = lock.acquire().await;
        if is_file(&path).await {
            debug!(path = %path.display(), "image fetched by concurrent request");
        } else {
            self.download_into(gateway, app_id, url, &path).await?;
        }
        Ok(path)
    }

    async fn download_into(
        &self,
        gateway: &dyn ArtGateway,
        app_id: NativeAppId,
        url: &str,
        path: &Path,
    ) -> Result<(), ArtError> {
        let _mark = self.downloads.begin(app_id);
        info!(%app_id, url, "downloading image");

        let data = gateway.download_bytes(url).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part = part_path(path);
        tokio::fs::write(&part, &data).await?;
        tokio::fs::rename(&part, path).await?;

        if !is_file(path).await {
            return Err(ArtError::MissingAfterDownload(path.to_path_buf()));
        }
        debug!(path = %path.display(), bytes = data.len(), "image cached");
        Ok(())
    }

    /// Deletes the whole cache tree. A missing root is not an error.
    pub async fn invalidate(&self) -> Result<(), ArtError> {
        self.downloads.clear_path_locks();
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!(root = %self.root.display(), "image cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Total size of cached files in bytes.
    pub fn size(&self) -> u64 {
        let mut size = 0u64;
        walk_dir(&self.root, &mut size);
        size
    }
}

/// Returns the default cache root, `<config dir>/gridcache/cache/grids`.
pub fn default_cache_root() -> Result<PathBuf, ArtError> {
    let base = config_dir().ok_or(ArtError::NoCacheDir)?;
    Ok(base.join("gridcache").join("cache").join("grids"))
}

/// Creates a deterministic filename hash from a URL.
///
/// Uses first 16 bytes of SHA-256 (32 hex characters).
pub fn hash_url(url: &str) -> String {
    let hash = Sha256::digest(url.as_bytes());
    hex::encode(&hash[..16])
}

/// Final path segment of a URL, without query or fragment.
fn url_basename(url: &str) -> Option<&str> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let url = &url[..end];
    let path = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    let (_, name) = path.rsplit_once('/')?;
    (!name.is_empty() && name != "." && name != "..").then_some(name)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Recursively sums file sizes.
fn walk_dir(dir: &Path, size: &mut u64) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, size);
        } else if let Ok(meta) = entry.metadata() {
            *size += meta.len();
        }
    }
}

/// Returns the platform-specific config directory.
fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
