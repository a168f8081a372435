//! Download-in-progress registry.
//!
//! Tracks in-flight downloads per app (several may overlap) and publishes
//! the busy set on a `watch` channel for the UI. Downloads targeting the
//! same local path are serialized through a per-path async lock.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::types::NativeAppId;

/// Number of in-flight downloads per app.
pub type DownloadCounts = BTreeMap<NativeAppId, usize>;

/// Per-app download registry.
pub struct DownloadTracker {
    counts: watch::Sender<DownloadCounts>,
    path_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        let (counts, _) = watch::channel(DownloadCounts::new());
        Self {
            counts,
            path_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Marks a download for `app_id` as started.
    ///
    /// The mark is cleared when the guard drops, whether the download
    /// succeeded, failed, or was cancelled.
    pub fn begin(&self, app_id: NativeAppId) -> DownloadGuard<'_> {
        self.counts.send_modify(|counts| {
            *counts.entry(app_id).or_insert(0) += 1;
        });
        DownloadGuard {
            tracker: self,
            app_id,
        }
    }

    /// Whether any download for `app_id` is in flight.
    pub fn is_downloading(&self, app_id: NativeAppId) -> bool {
        self.counts.borrow().contains_key(&app_id)
    }

    /// Whether any download at all is in flight.
    pub fn is_idle(&self) -> bool {
        self.counts.borrow().is_empty()
    }

    /// Subscribes to changes of the in-flight counts.
    pub fn subscribe(&self) -> watch::Receiver<DownloadCounts> {
        self.counts.subscribe()
    }

    fn finish(&self, app_id: NativeAppId) {
        self.counts.send_modify(|counts| {
            if let Some(n) = counts.get_mut(&app_id) {
                *n -= 1;
                if *n == 0 {
                    counts.remove(&app_id);
                }
            }
        });
    }

    /// Returns the lock serializing downloads into `path`.
    ///
    /// The table entry is dropped together with the last [`PathLock`] for
    /// the path, including when the owning future is cancelled.
    pub(crate) fn path_lock(&self, path: &Path) -> PathLock<'_> {
        let mut locks = self.path_locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = Arc::clone(locks.entry(path.to_path_buf()).or_default());
        PathLock {
            tracker: self,
            path: path.to_path_buf(),
            lock,
        }
    }

    pub(crate) fn clear_path_locks(&self) {
        self.path_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    #[cfg(test)]
    pub(crate) fn tracked_paths(&self) -> usize {
        self.path_locks.lock().unwrap().len()
    }
}

impl Default for DownloadTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears a download mark on drop.
pub struct DownloadGuard<'a> {
    tracker: &'a DownloadTracker,
    app_id: NativeAppId,
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(self.app_id);
    }
}

/// Handle on the per-path download lock.
pub(crate) struct PathLock<'a> {
    tracker: &'a DownloadTracker,
    path: PathBuf,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl PathLock<'_> {
    /// Waits until no other download into the same path is running.
    pub(crate) async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for PathLock<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .tracker
            .path_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // One reference in the table, one here. A table cleared by
        // `clear_path_locks` may already hold a newer lock for the path.
        let last = Arc::strong_count(&self.lock) <= 2;
        if last && locks.get(&self.path).is_some_and(|l| Arc::ptr_eq(l, &self.lock)) {
            locks.remove(&self.path);
        }
    }
}
