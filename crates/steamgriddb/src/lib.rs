//! SteamGridDB API client for artwork search and download.
//!
//! Provides an async client for the [SteamGridDB](https://www.steamgriddb.com)
//! API v2. Category-to-endpoint dispatch goes through [`ArtCategory`].

pub mod client;
pub mod types;

pub use client::{Client, Error};
pub use types::{ArtCategory, ImageData, ImageFilters, SearchResult, UnknownCategory};
