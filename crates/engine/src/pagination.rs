//! Page-count discovery for search candidates.
//!
//! SteamGridDB does not report how many result pages a game has, so the
//! count is found by walking pages until one comes back empty. Pages are
//! fetched through the caller's page source (normally the grid cache), so a
//! repeated walk costs no remote calls.

use std::future::Future;

use gridcache_steamgriddb::ArtCategory;
use tracing::{debug, warn};

use crate::error::ArtError;
use crate::types::{GameCandidate, ImageRecord, ProviderGameId};

/// Page count assumed when discovery is disabled.
pub const DEFAULT_PAGE_COUNT: u32 = 3;

/// How candidates get their page counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCountPolicy {
    /// Walk pages until an empty one.
    Discover,
    /// Assume a fixed count without any request.
    Fixed(u32),
}

impl Default for PageCountPolicy {
    fn default() -> Self {
        PageCountPolicy::Fixed(DEFAULT_PAGE_COUNT)
    }
}

impl PageCountPolicy {
    /// Fills in `category` page counts for candidates that lack one.
    pub async fn annotate<F, Fut>(
        self,
        mut candidates: Vec<GameCandidate>,
        category: ArtCategory,
        fetch_page: F,
    ) -> Vec<GameCandidate>
    where
        F: Fn(ProviderGameId, u32) -> Fut,
        Fut: Future<Output = Result<Vec<ImageRecord>, ArtError>>,
    {
        match self {
            PageCountPolicy::Fixed(n) => {
                for candidate in candidates.iter_mut() {
                    candidate.page_counts.entry(category).or_insert(n);
                }
                candidates
            }
            PageCountPolicy::Discover => {
                discover_page_counts(candidates, category, fetch_page).await
            }
        }
    }
}

/// Annotates each candidate lacking a `category` count with its number of
/// non-empty pages.
pub async fn discover_page_counts<F, Fut>(
    mut candidates: Vec<GameCandidate>,
    category: ArtCategory,
    fetch_page: F,
) -> Vec<GameCandidate>
where
    F: Fn(ProviderGameId, u32) -> Fut,
    Fut: Future<Output = Result<Vec<ImageRecord>, ArtError>>,
{
    for candidate in candidates.iter_mut() {
        if candidate.page_count(category).is_some() {
            continue;
        }
        let count = discover_page_count(candidate.id, &fetch_page).await;
        candidate.page_counts.insert(category, count);
    }
    candidates
}

/// Counts consecutive non-empty pages starting at page 0.
///
/// A failed fetch ends the walk like an empty page.
pub async fn discover_page_count<F, Fut>(game: ProviderGameId, fetch_page: &F) -> u32
where
    F: Fn(ProviderGameId, u32) -> Fut,
    Fut: Future<Output = Result<Vec<ImageRecord>, ArtError>>,
{
    let mut page = 0;
    loop {
        match fetch_page(game, page).await {
            Ok(images) if !images.is_empty() => page += 1,
            Ok(_) => break,
            Err(e) => {
                warn!(%game, page, error = %e, "page walk stopped on error");
                break;
            }
        }
    }
    debug!(%game, pages = page, "discovered page count");
    page
}
