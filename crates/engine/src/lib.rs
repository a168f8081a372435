//! Session-scoped artwork cache for a game library.
//!
//! Resolves library entries to SteamGridDB games, caches search results,
//! identities and image pages in memory, and keeps downloaded images in a
//! category-partitioned directory tree that is wiped on teardown.
//!
//! # Tiers
//!
//! - **Identity map**: app id to provider game, by direct lookup
//! - **Search cache**: app id to name-search candidates with page counts
//! - **Grid cache**: provider game, category and page to image records
//! - **Blob store**: image URL to a local file
//!
//! [`ArtEngine`] ties them together; [`ArtGateway`] is the only way out to
//! the network.

pub mod blob_store;
pub mod download;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod grid_cache;
pub mod pagination;
pub mod search_cache;
pub mod types;

pub use blob_store::{BlobStore, default_cache_root};
pub use download::{DownloadCounts, DownloadTracker};
pub use engine::{ArtEngine, EngineOptions};
pub use error::ArtError;
pub use gateway::{ArtGateway, GatewayFuture};
pub use pagination::{DEFAULT_PAGE_COUNT, PageCountPolicy};
pub use types::{
    ArtRequest, ArtResponse, EntryKind, GameCandidate, ImageRecord, LibraryEntry, NativeAppId,
    ProviderGameId,
};

pub use gridcache_steamgriddb::{ArtCategory, ImageFilters};
