//! SteamGridDB API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::types::{ApiResponse, ArtCategory, ImageData, ImageFilters, SearchResult};

const DEFAULT_BASE_URL: &str = "https://www.steamgriddb.com/api/v2";

/// Errors from the SteamGridDB client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,
}

impl Error {
    /// Whether the API answered 404 (unknown game or platform id).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }
}

/// SteamGridDB API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client with the given API key.
    pub fn new(api_key: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| Error::InvalidKey)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Performs an authenticated GET request.
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<Vec<u8>, Error> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "steamgriddb request");
        let resp = self.http.get(&url).query(params).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// GET + unwrap the `data` field of the API envelope.
    async fn get_data<T: DeserializeOwned + Default>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, Error> {
        let body = self.get(endpoint, params).await?;
        let resp: ApiResponse<T> = serde_json::from_slice(&body)?;
        Ok(resp.data)
    }

    /// Searches for games by name.
    pub async fn search(&self, term: &str) -> Result<Vec<SearchResult>, Error> {
        let encoded = utf8_percent_encode(term, NON_ALPHANUMERIC).to_string();
        self.get_data(&format!("/search/autocomplete/{encoded}"), &[])
            .await
    }

    /// Looks up the SteamGridDB game for a Steam app id.
    ///
    /// Returns `None` when SteamGridDB does not know the app.
    pub async fn get_game_by_steam_app_id(
        &self,
        app_id: u32,
    ) -> Result<Option<SearchResult>, Error> {
        match self
            .get_data::<Option<SearchResult>>(&format!("/games/steam/{app_id}"), &[])
            .await
        {
            Ok(game) => Ok(game),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns one page of images of the given category for a game.
    pub async fn get_images(
        &self,
        category: ArtCategory,
        game_id: i32,
        filters: Option<&ImageFilters>,
        page: u32,
    ) -> Result<Vec<ImageData>, Error> {
        let params = build_params(category, filters, page);
        self.get_data(&format!("/{}/game/{game_id}", category.endpoint()), &params)
            .await
    }

    /// Returns one page of images addressed by a platform id instead of a
    /// SteamGridDB game id (e.g. `platform = "steam"` with a Steam app id).
    pub async fn get_images_by_platform_id(
        &self,
        category: ArtCategory,
        platform: &str,
        platform_id: u32,
        filters: Option<&ImageFilters>,
        page: u32,
    ) -> Result<Vec<ImageData>, Error> {
        let params = build_params(category, filters, page);
        self.get_data(
            &format!("/{}/{platform}/{platform_id}", category.endpoint()),
            &params,
        )
        .await
    }

    /// Downloads image data from a URL.
    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>, Error> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: "download failed".into(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Builds query parameters from category, filters and page.
fn build_params(
    category: ArtCategory,
    filters: Option<&ImageFilters>,
    page: u32,
) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut dimension_pinned = false;

    if let Some(f) = filters {
        if !f.style.is_empty() && f.style != "All Styles" {
            params.push(("styles".into(), f.style.clone()));
        }
        if !f.mime_type.is_empty() && f.mime_type != "All Formats" {
            params.push(("mimes".into(), f.mime_type.clone()));
        }
        match f.image_type.as_str() {
            "static" | "Static Only" => params.push(("types".into(), "static".into())),
            "animated" | "Animated Only" => params.push(("types".into(), "animated".into())),
            _ => {}
        }
        if !f.dimension.is_empty() && f.dimension != "All Sizes" {
            params.push(("dimensions".into(), f.dimension.clone()));
            dimension_pinned = true;
        }
        params.push((
            "nsfw".into(),
            if f.show_nsfw { "any" } else { "false" }.into(),
        ));
        params.push((
            "humor".into(),
            if f.show_humor { "any" } else { "false" }.into(),
        ));
    }

    if !dimension_pinned {
        if let Some(dims) = category.default_dimensions() {
            params.push(("dimensions".into(), dims.into()));
        }
    }

    if page > 0 {
        params.push(("page".into(), page.to_string()));
    }

    params
}
