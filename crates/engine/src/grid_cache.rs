//! Fetched image pages, keyed by provider game, category and page.
//!
//! A page entry exists only once its fetch succeeded. Concurrent misses on
//! the same key each run their fetch; the last write wins with identical
//! data. A fetch that overlaps a [`GridResultCache::clear`] is handed to its
//! caller but not stored.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use gridcache_steamgriddb::ArtCategory;

use crate::error::ArtError;
use crate::types::{ImageRecord, ProviderGameId};

type Pages = BTreeMap<u32, Vec<ImageRecord>>;
type Games = HashMap<ProviderGameId, HashMap<ArtCategory, Pages>>;

/// Three-level result cache.
#[derive(Default)]
pub struct GridResultCache {
    games: Mutex<Games>,
    /// Bumped by `clear`, under the `games` lock.
    generation: AtomicU64,
}

impl GridResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
    ) -> Option<Vec<ImageRecord>> {
        self.lock()
            .get(&game)
            .and_then(|categories| categories.get(&category))
            .and_then(|pages| pages.get(&page))
            .cloned()
    }

    /// Returns the cached page, running `fetch` only on a miss.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
        fetch: F,
    ) -> Result<Vec<ImageRecord>, ArtError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ImageRecord>, ArtError>>,
    {
        if let Some(hit) = self.get(game, category, page) {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let images = fetch().await?;

        let mut games = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(%game, %category, page, "cache cleared during fetch, not caching");
            return Ok(images);
        }
        tracing::debug!(%game, %category, page, count = images.len(), "caching page");
        store(&mut games, game, category, page, images.clone());
        Ok(images)
    }

    /// Stores a page, creating the game and category levels as needed.
    pub fn insert(
        &self,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
        images: Vec<ImageRecord>,
    ) {
        store(&mut self.lock(), game, category, page, images);
    }

    #[cfg(test)]
    fn cached_pages(&self, game: ProviderGameId, category: ArtCategory) -> usize {
        self.lock()
            .get(&game)
            .and_then(|categories| categories.get(&category))
            .map_or(0, BTreeMap::len)
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every page, including pages of fetches still in flight.
    pub fn clear(&self) {
        let mut games = self.lock();
        games.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Games> {
        self.games.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn store(
    games: &mut Games,
    game: ProviderGameId,
    category: ArtCategory,
    page: u32,
    images: Vec<ImageRecord>,
) {
    games
        .entry(game)
        .or_default()
        .entry(category)
        .or_default()
        .insert(page, images);
}
