//! Cache orchestrator.
//!
//! [`ArtEngine`] answers "which images does this library entry have for
//! this category and page", consulting the identity map, the search cache
//! and the grid caches before falling through to the gateway. It also owns
//! the image blob store and its teardown.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gridcache_steamgriddb::{ArtCategory, ImageFilters};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::blob_store::BlobStore;
use crate::download::DownloadCounts;
use crate::error::ArtError;
use crate::gateway::ArtGateway;
use crate::grid_cache::GridResultCache;
use crate::pagination::PageCountPolicy;
use crate::search_cache::{IdentityMap, SearchResultCache};
use crate::types::{
    ArtRequest, ArtResponse, EntryKind, GameCandidate, ImageRecord, LibraryEntry, NativeAppId,
    ProviderGameId,
};

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Root directory of the image blob cache.
    pub cache_root: PathBuf,
    pub page_counts: PageCountPolicy,
    /// Initial image filters.
    pub filters: ImageFilters,
    /// Initial online state.
    pub online: bool,
}

impl EngineOptions {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            page_counts: PageCountPolicy::default(),
            filters: ImageFilters::default(),
            online: true,
        }
    }
}

/// Session-scoped artwork cache.
///
/// Use through `&self` (usually behind an `Arc`). In-memory caches live for
/// the engine's lifetime; [`ArtEngine::teardown`] also wipes the disk cache.
pub struct ArtEngine {
    gateway: Arc<dyn ArtGateway>,
    blobs: BlobStore,
    search: SearchResultCache,
    identities: IdentityMap,
    steam_grids: GridResultCache,
    shortcut_grids: GridResultCache,
    page_counts: PageCountPolicy,
    filters: Mutex<ImageFilters>,
    online: AtomicBool,
    generation: AtomicU64,
    active_game: watch::Sender<Option<ProviderGameId>>,
}

impl ArtEngine {
    /// Creates an engine without touching the disk.
    pub fn new(gateway: Arc<dyn ArtGateway>, options: EngineOptions) -> Self {
        let (active_game, _) = watch::channel(None);
        Self {
            gateway,
            blobs: BlobStore::new(options.cache_root),
            search: SearchResultCache::new(),
            identities: IdentityMap::new(),
            steam_grids: GridResultCache::new(),
            shortcut_grids: GridResultCache::new(),
            page_counts: options.page_counts,
            filters: Mutex::new(options.filters),
            online: AtomicBool::new(options.online),
            generation: AtomicU64::new(0),
            active_game,
        }
    }

    /// Creates an engine and prepares the blob cache layout.
    pub async fn start(
        gateway: Arc<dyn ArtGateway>,
        options: EngineOptions,
    ) -> Result<Self, ArtError> {
        let engine = Self::new(gateway, options);
        engine.blobs.ensure_layout().await?;
        info!(root = %engine.blobs.root().display(), "artwork cache ready");
        Ok(engine)
    }

    pub fn blob_store(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// While offline, cache hits are served and misses fail with
    /// [`ArtError::Offline`].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn filters(&self) -> ImageFilters {
        self.filters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replaces the image filters.
    ///
    /// Cached pages and page counts depend on the filters, so a change drops
    /// both, and fetches still running under the old filters do not refill
    /// them. Search results and identities are kept.
    pub fn set_filters(&self, filters: ImageFilters) {
        {
            let mut current = self.filters.lock().unwrap_or_else(|e| e.into_inner());
            if *current == filters {
                return;
            }
            *current = filters;
        }
        self.steam_grids.clear();
        self.shortcut_grids.clear();
        self.search.clear_page_counts();
        debug!("filters changed, grid caches cleared");
    }

    /// Cached search candidates for an app, for candidate pickers.
    pub fn candidates(&self, app_id: NativeAppId) -> Option<Vec<GameCandidate>> {
        self.search.get(app_id)
    }

    /// Provider game of the most recent current request.
    pub fn active_game(&self) -> Option<ProviderGameId> {
        *self.active_game.borrow()
    }

    pub fn subscribe_active_game(&self) -> watch::Receiver<Option<ProviderGameId>> {
        self.active_game.subscribe()
    }

    pub fn is_downloading(&self, app_id: NativeAppId) -> bool {
        self.blobs.downloads().is_downloading(app_id)
    }

    pub fn subscribe_downloads(&self) -> watch::Receiver<DownloadCounts> {
        self.blobs.downloads().subscribe()
    }

    /// Search candidates for an entry, with page counts for `category`.
    ///
    /// Searches by name at most once per app per session.
    pub async fn get_candidates(
        &self,
        entry: &LibraryEntry,
        category: ArtCategory,
    ) -> Result<Vec<GameCandidate>, ArtError> {
        let app_id = entry.app_id;
        let candidates = self
            .search
            .get_or_search(app_id, || async move {
                self.ensure_online()?;
                info!(%app_id, name = %entry.name, "searching provider");
                self.gateway.search_by_name(&entry.name).await
            })
            .await?;

        if candidates.iter().all(|c| c.page_count(category).is_some()) {
            return Ok(candidates);
        }
        if self.page_counts == PageCountPolicy::Discover && !self.is_online() {
            // A walk now would record zero pages for every candidate.
            return Ok(candidates);
        }

        let generation = self.search.page_count_generation();
        let grids = self.grids(entry.kind);
        let annotated = self
            .page_counts
            .annotate(candidates, category, move |game, page| {
                self.fetch_page(grids, game, category, page)
            })
            .await;
        self.search
            .set_page_counts(app_id, category, &annotated, generation);
        Ok(annotated)
    }

    /// Provider game for a Steam entry by direct lookup.
    ///
    /// Non-Steam entries have no direct lookup and always yield `None`.
    pub async fn resolve_provider_id(
        &self,
        entry: &LibraryEntry,
    ) -> Result<Option<ProviderGameId>, ArtError> {
        if entry.kind == EntryKind::NonSteam {
            return Ok(None);
        }
        let app_id = entry.app_id;
        self.identities
            .get_or_resolve(app_id, || async move {
                self.ensure_online()?;
                debug!(%app_id, "resolving provider game by app id");
                let game = self.gateway.get_by_native_id(app_id).await?;
                Ok(game.map(|g| g.id))
            })
            .await
    }

    /// One page of images for a provider game.
    pub async fn get_page(
        &self,
        kind: EntryKind,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
    ) -> Result<Vec<ImageRecord>, ArtError> {
        self.fetch_page(self.grids(kind), game, category, page)
            .await
    }

    /// Resolves an entry to its provider game and returns the requested page.
    ///
    /// No candidates is an empty result, not an error. If a newer request
    /// started before this one finished, the caches are still filled but
    /// the result comes back as [`ArtResponse::Stale`] and the active game
    /// is left alone.
    pub async fn fetch_art_for_app(&self, request: &ArtRequest) -> Result<ArtResponse, ArtError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = &request.entry;

        let candidates = self.get_candidates(entry, request.category).await?;
        let Some(game) = self.pick_game(request, &candidates).await? else {
            info!(app_id = %entry.app_id, name = %entry.name, "no artwork candidates");
            if !self.is_current(generation) {
                return Ok(ArtResponse::Stale);
            }
            self.active_game.send_replace(None);
            return Ok(ArtResponse::Fresh(Vec::new()));
        };

        if self.is_current(generation) {
            self.active_game.send_replace(Some(game));
        }

        let images = self
            .get_page(entry.kind, game, request.category, request.page)
            .await?;

        if self.is_current(generation) {
            Ok(ArtResponse::Fresh(images))
        } else {
            debug!(app_id = %entry.app_id, generation, "discarding stale result");
            Ok(ArtResponse::Stale)
        }
    }

    /// Local path of an image, downloading it on first use.
    pub async fn get_image(
        &self,
        app_id: NativeAppId,
        category: ArtCategory,
        url: &str,
    ) -> Result<PathBuf, ArtError> {
        if !self.is_online() {
            return self
                .blobs
                .lookup(category, url)
                .await
                .ok_or(ArtError::Offline);
        }
        self.blobs
            .get_or_fetch(self.gateway.as_ref(), app_id, category, url)
            .await
    }

    /// Shuts the engine down.
    ///
    /// Closes the observable channels, then deletes the blob cache so the
    /// next run starts cold.
    pub async fn teardown(self) -> Result<(), ArtError> {
        let ArtEngine {
            blobs, active_game, ..
        } = self;
        drop(active_game);
        blobs.invalidate().await?;
        info!("artwork cache torn down");
        Ok(())
    }

    async fn pick_game(
        &self,
        request: &ArtRequest,
        candidates: &[GameCandidate],
    ) -> Result<Option<ProviderGameId>, ArtError> {
        let Some(first) = candidates.first() else {
            return Ok(None);
        };
        let listed = |id: ProviderGameId| candidates.iter().any(|c| c.id == id);
        let entry = &request.entry;

        if let Some(selected) = request.selected_game {
            if listed(selected) {
                return Ok(Some(selected));
            }
            warn!(
                app_id = %entry.app_id,
                game_id = %selected,
                "selected game not among candidates"
            );
        }

        let game = match entry.kind {
            EntryKind::Steam => match self.resolve_provider_id(entry).await? {
                Some(id) if listed(id) => id,
                _ => first.id,
            },
            EntryKind::NonSteam => candidates
                .iter()
                .find(|c| c.name == entry.name)
                .unwrap_or(first)
                .id,
        };
        Ok(Some(game))
    }

    async fn fetch_page(
        &self,
        grids: &GridResultCache,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
    ) -> Result<Vec<ImageRecord>, ArtError> {
        grids
            .get_or_fetch(game, category, page, || async move {
                self.ensure_online()?;
                let filters = self.filters();
                debug!(%game, %category, page, "fetching image page");
                self.gateway
                    .get_images(game, category, page, &filters)
                    .await
            })
            .await
    }

    fn grids(&self, kind: EntryKind) -> &GridResultCache {
        match kind {
            EntryKind::Steam => &self.steam_grids,
            EntryKind::NonSteam => &self.shortcut_grids,
        }
    }

    fn ensure_online(&self) -> Result<(), ArtError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(ArtError::Offline)
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::gateway::mock::{Call, MockGateway};

    const A_PNG: &str = "https://cdn2.steamgriddb.com/grid/a.png";

    fn engine_with(
        gateway: &Arc<MockGateway>,
        configure: impl FnOnce(&mut EngineOptions),
    ) -> (tempfile::TempDir, ArtEngine) {
        let tmp = tempfile::tempdir().unwrap();
        let mut options = EngineOptions::new(tmp.path().join("grids"));
        configure(&mut options);
        let engine = ArtEngine::new(gateway.clone(), options);
        (tmp, engine)
    }

    fn engine(gateway: &Arc<MockGateway>) -> (tempfile::TempDir, ArtEngine) {
        engine_with(gateway, |_| {})
    }

    fn img(id: i32, url: &str) -> ImageRecord {
        ImageRecord::new(id, url, ArtCategory::Capsule)
    }

    fn foo_gateway() -> MockGateway {
        MockGateway::new()
            .with_search("Foo", vec![GameCandidate::new(5, "Foo")])
            .with_lookup(100, GameCandidate::new(5, "Foo"))
            .with_page(5, ArtCategory::Capsule, 0, vec![img(1, A_PNG)])
    }

    fn foo_request() -> ArtRequest {
        ArtRequest::new(
            LibraryEntry::with_kind(100, "Foo", EntryKind::Steam),
            ArtCategory::Capsule,
            0,
        )
    }

    #[tokio::test]
    async fn steam_entry_end_to_end_then_fully_cached() {
        let gateway = Arc::new(foo_gateway());
        let (_tmp, engine) = engine(&gateway);

        let first = engine.fetch_art_for_app(&foo_request()).await.unwrap();

        assert_eq!(first, ArtResponse::Fresh(vec![img(1, A_PNG)]));
        assert_eq!(engine.active_game(), Some(ProviderGameId(5)));
        assert_eq!(
            gateway.calls(),
            vec![
                Call::Search("Foo".into()),
                Call::Lookup(NativeAppId(100)),
                Call::Images(ProviderGameId(5), ArtCategory::Capsule, 0),
            ]
        );

        let second = engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn non_steam_entry_prefers_exact_name() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_search(
                    "Bar",
                    vec![GameCandidate::new(1, "Baz"), GameCandidate::new(2, "Bar")],
                )
                .with_page(2, ArtCategory::Hero, 0, vec![img(20, "https://e.com/h.png")]),
        );
        let (_tmp, engine) = engine(&gateway);
        let request = ArtRequest::new(
            LibraryEntry::with_kind(0x8000_0042, "Bar", EntryKind::NonSteam),
            ArtCategory::Hero,
            0,
        );

        let images = engine
            .fetch_art_for_app(&request)
            .await
            .unwrap()
            .into_fresh()
            .unwrap();

        assert_eq!(engine.active_game(), Some(ProviderGameId(2)));
        assert_eq!(images.len(), 1);
        assert_eq!(gateway.lookup_count(), 0, "shortcuts have no direct lookup");
    }

    #[tokio::test]
    async fn non_steam_entry_without_exact_match_takes_first() {
        let gateway = Arc::new(MockGateway::new().with_search(
            "Qux",
            vec![GameCandidate::new(1, "Qux Deluxe"), GameCandidate::new(2, "qux")],
        ));
        let (_tmp, engine) = engine(&gateway);
        let request = ArtRequest::new(
            LibraryEntry::with_kind(0x8000_0001, "Qux", EntryKind::NonSteam),
            ArtCategory::Logo,
            0,
        );

        engine.fetch_art_for_app(&request).await.unwrap();
        assert_eq!(engine.active_game(), Some(ProviderGameId(1)));
    }

    #[tokio::test]
    async fn steam_lookup_outside_candidates_falls_back_to_first() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_search(
                    "Foo",
                    vec![GameCandidate::new(7, "Foo"), GameCandidate::new(8, "Foo II")],
                )
                .with_lookup(100, GameCandidate::new(99, "Foo")),
        );
        let (_tmp, engine) = engine(&gateway);

        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(engine.active_game(), Some(ProviderGameId(7)));
    }

    #[tokio::test]
    async fn steam_lookup_prefers_resolved_candidate() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_search(
                    "Foo",
                    vec![GameCandidate::new(7, "Foo"), GameCandidate::new(8, "Foo")],
                )
                .with_lookup(100, GameCandidate::new(8, "Foo")),
        );
        let (_tmp, engine) = engine(&gateway);

        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(engine.active_game(), Some(ProviderGameId(8)));

        // A second app id resolution for the same app is served from the map.
        engine
            .fetch_art_for_app(&ArtRequest::new(
                foo_request().entry,
                ArtCategory::Icon,
                0,
            ))
            .await
            .unwrap();
        assert_eq!(gateway.lookup_count(), 1);
    }

    #[tokio::test]
    async fn explicit_selection_overrides_resolution() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_search(
                    "Foo",
                    vec![GameCandidate::new(5, "Foo"), GameCandidate::new(6, "Foo 2")],
                )
                .with_lookup(100, GameCandidate::new(5, "Foo")),
        );
        let (_tmp, engine) = engine(&gateway);
        let request = foo_request().with_selected_game(ProviderGameId(6));

        engine.fetch_art_for_app(&request).await.unwrap();

        assert_eq!(engine.active_game(), Some(ProviderGameId(6)));
        assert_eq!(gateway.lookup_count(), 0);
        assert!(
            gateway
                .calls()
                .contains(&Call::Images(ProviderGameId(6), ArtCategory::Capsule, 0))
        );
    }

    #[tokio::test]
    async fn unknown_selection_is_ignored() {
        let gateway = Arc::new(foo_gateway());
        let (_tmp, engine) = engine(&gateway);
        let request = foo_request().with_selected_game(ProviderGameId(404));

        engine.fetch_art_for_app(&request).await.unwrap();
        assert_eq!(engine.active_game(), Some(ProviderGameId(5)));
    }

    #[tokio::test]
    async fn no_candidates_is_empty_result() {
        let gateway = Arc::new(MockGateway::new());
        let (_tmp, engine) = engine(&gateway);

        let response = engine.fetch_art_for_app(&foo_request()).await.unwrap();

        assert_eq!(response, ArtResponse::Fresh(Vec::new()));
        assert_eq!(engine.active_game(), None);
        assert_eq!(gateway.image_count(), 0);
        assert_eq!(gateway.lookup_count(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_propagates_and_is_not_cached() {
        let gateway = Arc::new(
            foo_gateway().with_failing_page(5, ArtCategory::Capsule, 1),
        );
        let (_tmp, engine) = engine(&gateway);
        let request = ArtRequest::new(foo_request().entry, ArtCategory::Capsule, 1);

        assert!(engine.fetch_art_for_app(&request).await.is_err());
        assert!(engine.fetch_art_for_app(&request).await.is_err());
        assert_eq!(gateway.image_count(), 2, "failures are retried, never cached");
        assert_eq!(gateway.search_count(), 1);
    }

    #[tokio::test]
    async fn overlapping_requests_mark_older_one_stale() {
        let gateway = Arc::new(
            foo_gateway()
                .with_search("Other", vec![GameCandidate::new(9, "Other")])
                .with_delay(Duration::from_millis(20)),
        );
        let (_tmp, engine) = engine(&gateway);
        let older = foo_request();
        let newer = ArtRequest::new(
            LibraryEntry::with_kind(0x8000_0009, "Other", EntryKind::NonSteam),
            ArtCategory::Capsule,
            0,
        );

        let (old_resp, new_resp) = tokio::join!(
            engine.fetch_art_for_app(&older),
            engine.fetch_art_for_app(&newer),
        );

        assert_eq!(old_resp.unwrap(), ArtResponse::Stale);
        assert!(matches!(new_resp.unwrap(), ArtResponse::Fresh(_)));
        assert_eq!(engine.active_game(), Some(ProviderGameId(9)));

        // The stale request still filled the caches.
        let again = engine.fetch_art_for_app(&older).await.unwrap();
        assert_eq!(again, ArtResponse::Fresh(vec![img(1, A_PNG)]));
    }

    #[tokio::test]
    async fn offline_serves_hits_and_rejects_misses() {
        let gateway = Arc::new(foo_gateway());
        let (_tmp, engine) = engine(&gateway);
        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        let calls_before = gateway.call_count();

        engine.set_online(false);
        let cached = engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(cached, ArtResponse::Fresh(vec![img(1, A_PNG)]));

        let next_page = ArtRequest::new(foo_request().entry, ArtCategory::Capsule, 1);
        let err = engine.fetch_art_for_app(&next_page).await.unwrap_err();
        assert!(matches!(err, ArtError::Offline));
        assert_eq!(gateway.call_count(), calls_before);
    }

    #[tokio::test]
    async fn filter_change_clears_grid_cache() {
        let gateway = Arc::new(foo_gateway());
        let (_tmp, engine) = engine(&gateway);
        engine.fetch_art_for_app(&foo_request()).await.unwrap();

        engine.set_filters(engine.filters());
        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(gateway.image_count(), 1, "unchanged filters keep the cache");

        engine.set_filters(alternate_style());
        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(gateway.image_count(), 2);
        assert_eq!(gateway.search_count(), 1);
    }

    fn alternate_style() -> ImageFilters {
        ImageFilters {
            style: "alternate".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn filter_change_during_page_fetch_discards_old_page() {
        // Search, lookup and the page fetch take 100 ms each.
        let gateway = Arc::new(foo_gateway().with_delay(Duration::from_millis(100)));
        let (_tmp, engine) = engine(&gateway);

        let request = foo_request();
        let (first, ()) = tokio::join!(engine.fetch_art_for_app(&request), async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            engine.set_filters(alternate_style());
        });
        assert_eq!(first.unwrap(), ArtResponse::Fresh(vec![img(1, A_PNG)]));
        assert_eq!(gateway.image_count(), 1);

        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(gateway.image_count(), 2, "page fetched under old filters was cached");
        assert_eq!(gateway.search_count(), 1);
    }

    #[tokio::test]
    async fn filter_change_during_page_walk_discards_counts() {
        let gateway = Arc::new(foo_gateway().with_delay(Duration::from_millis(100)));
        let (_tmp, engine) = engine_with(&gateway, |o| o.page_counts = PageCountPolicy::Discover);

        // The walk fetches page 0 between 100 and 200 ms.
        let request = foo_request();
        let (result, ()) = tokio::join!(engine.fetch_art_for_app(&request), async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            engine.set_filters(alternate_style());
        });
        result.unwrap();

        let candidates = engine.candidates(NativeAppId(100)).unwrap();
        assert_eq!(candidates[0].page_count(ArtCategory::Capsule), None);
        // Walk pages 0 and 1, then page 0 again since the walk's copy was dropped.
        assert_eq!(gateway.image_count(), 3);
    }

    #[tokio::test]
    async fn steam_and_shortcut_grids_are_separate() {
        let gateway = Arc::new(MockGateway::new());
        let (_tmp, engine) = engine(&gateway);
        let game = ProviderGameId(5);

        engine
            .get_page(EntryKind::Steam, game, ArtCategory::Icon, 0)
            .await
            .unwrap();
        engine
            .get_page(EntryKind::NonSteam, game, ArtCategory::Icon, 0)
            .await
            .unwrap();
        engine
            .get_page(EntryKind::Steam, game, ArtCategory::Icon, 0)
            .await
            .unwrap();

        assert_eq!(gateway.image_count(), 2);
    }

    #[tokio::test]
    async fn fixed_page_counts_are_attached_to_candidates() {
        let gateway = Arc::new(foo_gateway());
        let (_tmp, engine) = engine(&gateway);
        engine.fetch_art_for_app(&foo_request()).await.unwrap();

        let candidates = engine.candidates(NativeAppId(100)).unwrap();
        assert_eq!(candidates[0].page_count(ArtCategory::Capsule), Some(3));
    }

    #[tokio::test]
    async fn discovered_pages_are_reused_by_fetch() {
        let gateway = Arc::new(foo_gateway().with_page(
            5,
            ArtCategory::Capsule,
            1,
            vec![img(2, "https://e.com/b.png")],
        ));
        let (_tmp, engine) = engine_with(&gateway, |o| o.page_counts = PageCountPolicy::Discover);

        engine.fetch_art_for_app(&foo_request()).await.unwrap();

        let candidates = engine.candidates(NativeAppId(100)).unwrap();
        assert_eq!(candidates[0].page_count(ArtCategory::Capsule), Some(2));
        // Pages 0, 1 and the empty page 2; the page-0 fetch hit the cache.
        assert_eq!(gateway.image_count(), 3);

        engine.fetch_art_for_app(&foo_request()).await.unwrap();
        assert_eq!(gateway.image_count(), 3);
    }

    #[tokio::test]
    async fn discovery_is_skipped_while_offline() {
        let gateway = Arc::new(foo_gateway());
        let (_tmp, engine) = engine_with(&gateway, |o| o.page_counts = PageCountPolicy::Discover);
        engine.fetch_art_for_app(&foo_request()).await.unwrap();

        engine.set_online(false);
        let hero = LibraryEntry::with_kind(100, "Foo", EntryKind::Steam);
        let candidates = engine.get_candidates(&hero, ArtCategory::Hero).await.unwrap();
        assert_eq!(candidates[0].page_count(ArtCategory::Hero), None);
    }

    #[tokio::test]
    async fn get_image_downloads_once() {
        let gateway = Arc::new(MockGateway::new().with_blob(A_PNG, b"PNG"));
        let (_tmp, engine) = engine(&gateway);

        let first = engine
            .get_image(NativeAppId(100), ArtCategory::Capsule, A_PNG)
            .await
            .unwrap();
        let second = engine
            .get_image(NativeAppId(100), ArtCategory::Capsule, A_PNG)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"PNG");
        assert_eq!(gateway.download_count(), 1);
    }

    #[tokio::test]
    async fn get_image_failure_surfaces_and_clears_progress() {
        let gateway = Arc::new(MockGateway::new());
        let (_tmp, engine) = engine(&gateway);
        let downloads = engine.subscribe_downloads();

        let result = engine
            .get_image(NativeAppId(100), ArtCategory::Capsule, A_PNG)
            .await;

        assert!(result.is_err());
        assert!(!engine.is_downloading(NativeAppId(100)));
        assert!(downloads.borrow().is_empty());
    }

    #[tokio::test]
    async fn get_image_offline_only_serves_cached_files() {
        let gateway = Arc::new(MockGateway::new().with_blob(A_PNG, b"PNG"));
        let (_tmp, engine) = engine(&gateway);
        engine.set_online(false);

        let err = engine
            .get_image(NativeAppId(1), ArtCategory::Hero, A_PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtError::Offline));

        engine.set_online(true);
        let path = engine
            .get_image(NativeAppId(1), ArtCategory::Hero, A_PNG)
            .await
            .unwrap();
        engine.set_online(false);
        let cached = engine
            .get_image(NativeAppId(1), ArtCategory::Hero, A_PNG)
            .await
            .unwrap();
        assert_eq!(path, cached);
        assert_eq!(gateway.download_count(), 1);
    }

    #[tokio::test]
    async fn start_creates_layout_and_teardown_wipes_it() {
        let gateway = Arc::new(MockGateway::new().with_blob(A_PNG, b"PNG"));
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("grids");
        let engine = ArtEngine::start(gateway.clone(), EngineOptions::new(&root))
            .await
            .unwrap();
        for category in ArtCategory::ALL {
            assert!(root.join(category.as_str()).is_dir());
        }
        engine
            .get_image(NativeAppId(1), ArtCategory::Logo, A_PNG)
            .await
            .unwrap();
        let mut active = engine.subscribe_active_game();

        engine.teardown().await.unwrap();

        assert!(!root.exists());
        assert!(active.changed().await.is_err(), "channel closed on teardown");
    }
}
