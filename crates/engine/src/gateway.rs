//! Remote art provider seam.
//!
//! The engine talks to the provider only through [`ArtGateway`]. The
//! production implementation wraps the SteamGridDB [`Client`]; tests plug in
//! a recording mock.

use std::future::Future;
use std::pin::Pin;

use gridcache_steamgriddb::{ArtCategory, Client, ImageFilters};

use crate::error::ArtError;
use crate::types::{GameCandidate, ImageRecord, NativeAppId, ProviderGameId};

/// Boxed future returned by gateway calls.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ArtError>> + Send + 'a>>;

/// Abstract connection to the remote art provider.
///
/// Every call may fail; the engine decides whether a failure propagates.
pub trait ArtGateway: Send + Sync {
    /// Searches provider games by display name.
    fn search_by_name(&self, name: &str) -> GatewayFuture<'_, Vec<GameCandidate>>;

    /// Resolves a Steam app id to a provider game, `None` if unknown.
    fn get_by_native_id(&self, app_id: NativeAppId) -> GatewayFuture<'_, Option<GameCandidate>>;

    /// Fetches one page of images for a provider game.
    fn get_images(
        &self,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
        filters: &ImageFilters,
    ) -> GatewayFuture<'_, Vec<ImageRecord>>;

    /// Downloads raw image bytes.
    fn download_bytes(&self, url: &str) -> GatewayFuture<'_, Vec<u8>>;
}

impl ArtGateway for Client {
    fn search_by_name(&self, name: &str) -> GatewayFuture<'_, Vec<GameCandidate>> {
        let name = name.to_string();
        Box::pin(async move {
            let results = self.search(&name).await?;
            Ok(results.into_iter().map(GameCandidate::from).collect())
        })
    }

    fn get_by_native_id(&self, app_id: NativeAppId) -> GatewayFuture<'_, Option<GameCandidate>> {
        Box::pin(async move {
            let game = self.get_game_by_steam_app_id(app_id.0).await?;
            Ok(game.map(GameCandidate::from))
        })
    }

    fn get_images(
        &self,
        game: ProviderGameId,
        category: ArtCategory,
        page: u32,
        filters: &ImageFilters,
    ) -> GatewayFuture<'_, Vec<ImageRecord>> {
        let filters = filters.clone();
        Box::pin(async move {
            let images = Client::get_images(self, category, game.0, Some(&filters), page).await?;
            Ok(images
                .into_iter()
                .map(|img| ImageRecord::from_api(img, category))
                .collect())
        })
    }

    fn download_bytes(&self, url: &str) -> GatewayFuture<'_, Vec<u8>> {
        let url = url.to_string();
        Box::pin(async move { Ok(self.download_image(&url).await?) })
    }
}
