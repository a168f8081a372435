//! Name-search results and resolved identities, per library entry.
//!
//! Neither cache talks to the network: callers pass the remote call as a
//! closure that only runs on a miss. Failed calls are never cached.
//! Page counts written back after [`SearchResultCache::clear_page_counts`]
//! ran are dropped; see [`SearchResultCache::page_count_generation`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use gridcache_steamgriddb::ArtCategory;

use crate::error::ArtError;
use crate::types::{GameCandidate, NativeAppId, ProviderGameId};

/// Candidates found by name search, keyed by app id.
#[derive(Default)]
pub struct SearchResultCache {
    entries: Mutex<HashMap<NativeAppId, Vec<GameCandidate>>>,
    /// Bumped by `clear_page_counts`, under the `entries` lock.
    page_counts: AtomicU64,
}

impl SearchResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, app_id: NativeAppId) -> Option<Vec<GameCandidate>> {
        self.lock().get(&app_id).cloned()
    }

    /// Returns the cached candidates, running `search` only on a miss.
    pub async fn get_or_search<F, Fut>(
        &self,
        app_id: NativeAppId,
        search: F,
    ) -> Result<Vec<GameCandidate>, ArtError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<GameCandidate>, ArtError>>,
    {
        if let Some(hit) = self.get(app_id) {
            return Ok(hit);
        }
        let candidates = search().await?;
        tracing::debug!(%app_id, count = candidates.len(), "caching search results");
        self.lock().insert(app_id, candidates.clone());
        Ok(candidates)
    }

    /// Token to pass to [`SearchResultCache::set_page_counts`], taken
    /// before the page counts are computed.
    pub fn page_count_generation(&self) -> u64 {
        self.page_counts.load(Ordering::SeqCst)
    }

    /// Copies page counts for `category` from `annotated` onto the cached
    /// candidates with the same ids. Nothing else about the entry changes.
    ///
    /// Ignored if the page counts were cleared after `generation` was taken.
    pub fn set_page_counts(
        &self,
        app_id: NativeAppId,
        category: ArtCategory,
        annotated: &[GameCandidate],
        generation: u64,
    ) {
        let mut entries = self.lock();
        if self.page_count_generation() != generation {
            tracing::debug!(%app_id, %category, "page counts cleared meanwhile, not caching");
            return;
        }
        let Some(cached) = entries.get_mut(&app_id) else {
            return;
        };
        for candidate in cached.iter_mut() {
            let count = annotated
                .iter()
                .find(|a| a.id == candidate.id)
                .and_then(|a| a.page_count(category));
            if let Some(count) = count {
                candidate.page_counts.insert(category, count);
            }
        }
    }

    /// Forgets every page count while keeping the candidates.
    pub fn clear_page_counts(&self) {
        let mut entries = self.lock();
        for candidates in entries.values_mut() {
            for candidate in candidates.iter_mut() {
                candidate.page_counts.clear();
            }
        }
        self.page_counts.fetch_add(1, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<NativeAppId, Vec<GameCandidate>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resolved provider identity per app id.
///
/// `None` records that the provider has no game for the app, so the lookup
/// is not repeated this session.
#[derive(Default)]
pub struct IdentityMap {
    entries: Mutex<HashMap<NativeAppId, Option<ProviderGameId>>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached resolution, if one was made.
    pub fn get(&self, app_id: NativeAppId) -> Option<Option<ProviderGameId>> {
        self.lock().get(&app_id).copied()
    }

    /// Returns the cached identity, running `resolve` only on a miss.
    pub async fn get_or_resolve<F, Fut>(
        &self,
        app_id: NativeAppId,
        resolve: F,
    ) -> Result<Option<ProviderGameId>, ArtError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ProviderGameId>, ArtError>>,
    {
        if let Some(hit) = self.get(app_id) {
            return Ok(hit);
        }
        let resolved = resolve().await?;
        tracing::debug!(%app_id, game_id = ?resolved, "caching resolved identity");
        self.lock().insert(app_id, resolved);
        Ok(resolved)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<NativeAppId, Option<ProviderGameId>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
