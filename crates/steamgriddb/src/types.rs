//! API response types for SteamGridDB.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Artwork category.
///
/// Selects both the API endpoint family and the local cache sub-directory.
/// `Capsule` and `WideCapsule` share the grids endpoint and differ only in
/// their default dimension filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtCategory {
    Capsule,
    WideCapsule,
    Hero,
    Logo,
    Icon,
}

impl ArtCategory {
    /// Every category, in display order.
    pub const ALL: [ArtCategory; 5] = [
        ArtCategory::Capsule,
        ArtCategory::WideCapsule,
        ArtCategory::Hero,
        ArtCategory::Logo,
        ArtCategory::Icon,
    ];

    /// API path segment for this category (`/grids/...`, `/heroes/...`).
    pub fn endpoint(self) -> &'static str {
        match self {
            ArtCategory::Capsule | ArtCategory::WideCapsule => "grids",
            ArtCategory::Hero => "heroes",
            ArtCategory::Logo => "logos",
            ArtCategory::Icon => "icons",
        }
    }

    /// Stable snake_case name, also used as the cache directory name.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtCategory::Capsule => "capsule",
            ArtCategory::WideCapsule => "wide_capsule",
            ArtCategory::Hero => "hero",
            ArtCategory::Logo => "logo",
            ArtCategory::Icon => "icon",
        }
    }

    /// Dimension filter applied when the caller does not pin one.
    pub fn default_dimensions(self) -> Option<&'static str> {
        match self {
            ArtCategory::Capsule => Some("600x900,342x482,660x930"),
            ArtCategory::WideCapsule => Some("460x215,920x430"),
            _ => None,
        }
    }
}

impl fmt::Display for ArtCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown art category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ArtCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "capsule" | "grid" => Ok(ArtCategory::Capsule),
            "wide_capsule" | "wide-capsule" | "widecapsule" | "banner" => {
                Ok(ArtCategory::WideCapsule)
            }
            "hero" => Ok(ArtCategory::Hero),
            "logo" => Ok(ArtCategory::Logo),
            "icon" => Ok(ArtCategory::Icon),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A game record from the SteamGridDB API.
///
/// Returned by both the autocomplete search and the by-platform-id lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub release_date: Option<i64>,
}

/// Image metadata from the SteamGridDB API.
///
/// Used for grids, heroes, logos, and icons (they share the same API schema).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub id: i32,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub humor: bool,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub epilepsy: bool,
    #[serde(default)]
    pub upvotes: i32,
    #[serde(default)]
    pub downvotes: i32,
}

/// Filters for image queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFilters {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub mime_type: String,
    /// `"static"`, `"animated"`, `"Static Only"`, `"Animated Only"`, or empty for all.
    #[serde(default)]
    pub image_type: String,
    #[serde(default)]
    pub dimension: String,
    #[serde(default)]
    pub show_nsfw: bool,
    #[serde(default)]
    pub show_humor: bool,
}

/// API response wrapper (internal).
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[allow(dead_code)]
    pub success: bool,
    #[serde(default)]
    #[allow(dead_code)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub data: T,
}
