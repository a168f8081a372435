//! Identity and record types shared by the cache tiers.

use std::collections::BTreeMap;
use std::fmt;

use gridcache_steamgriddb::{ArtCategory, ImageData, SearchResult};
use serde::{Deserialize, Serialize};

/// Steam shortcut ids always carry this bit (see Steam's
/// `CRC32(exe + name) | 0x80000000` shortcut id scheme).
const SHORTCUT_ID_BIT: u32 = 0x8000_0000;

/// Identity assigned by the host library (Steam app id or shortcut id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeAppId(pub u32);

impl fmt::Display for NativeAppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity assigned by SteamGridDB to a game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderGameId(pub i32);

impl fmt::Display for ProviderGameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a library entry is a Steam app or a non-Steam shortcut.
///
/// Only Steam apps can be resolved to a provider game by id; shortcuts
/// always go through name search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Steam,
    NonSteam,
}

impl EntryKind {
    /// Classifies an app id by the shortcut bit.
    pub fn infer(app_id: NativeAppId) -> Self {
        if app_id.0 & SHORTCUT_ID_BIT != 0 {
            EntryKind::NonSteam
        } else {
            EntryKind::Steam
        }
    }
}

/// A library entry as selected in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub app_id: NativeAppId,
    pub name: String,
    pub kind: EntryKind,
}

impl LibraryEntry {
    /// Creates an entry, inferring its kind from the app id.
    pub fn new(app_id: u32, name: impl Into<String>) -> Self {
        let app_id = NativeAppId(app_id);
        Self {
            app_id,
            name: name.into(),
            kind: EntryKind::infer(app_id),
        }
    }

    /// Creates an entry with an explicit kind.
    pub fn with_kind(app_id: u32, name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            app_id: NativeAppId(app_id),
            name: name.into(),
            kind,
        }
    }
}

/// A provider game returned by name search, not yet confirmed as the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCandidate {
    pub id: ProviderGameId,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
    /// Known number of result pages, per category.
    #[serde(default)]
    pub page_counts: BTreeMap<ArtCategory, u32>,
}

impl GameCandidate {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id: ProviderGameId(id),
            name: name.into(),
            verified: false,
            page_counts: BTreeMap::new(),
        }
    }

    pub fn page_count(&self, category: ArtCategory) -> Option<u32> {
        self.page_counts.get(&category).copied()
    }
}

impl From<SearchResult> for GameCandidate {
    fn from(r: SearchResult) -> Self {
        Self {
            id: ProviderGameId(r.id),
            name: r.name,
            verified: r.verified,
            page_counts: BTreeMap::new(),
        }
    }
}

/// One artwork image as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i32,
    pub url: String,
    #[serde(default)]
    pub thumb: String,
    pub category: ArtCategory,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub style: String,
}

impl ImageRecord {
    pub fn new(id: i32, url: impl Into<String>, category: ArtCategory) -> Self {
        Self {
            id,
            url: url.into(),
            thumb: String::new(),
            category,
            width: 0,
            height: 0,
            mime: String::new(),
            style: String::new(),
        }
    }

    /// Converts an API image into a record tagged with its category.
    pub fn from_api(img: ImageData, category: ArtCategory) -> Self {
        Self {
            id: img.id,
            url: img.url,
            thumb: img.thumb,
            category,
            width: img.width,
            height: img.height,
            mime: img.mime,
            style: img.style,
        }
    }
}

/// Input to [`ArtEngine::fetch_art_for_app`](crate::ArtEngine::fetch_art_for_app).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtRequest {
    pub entry: LibraryEntry,
    pub category: ArtCategory,
    pub page: u32,
    /// Explicit provider game chosen by the user; overrides automatic resolution.
    pub selected_game: Option<ProviderGameId>,
}

impl ArtRequest {
    pub fn new(entry: LibraryEntry, category: ArtCategory, page: u32) -> Self {
        Self {
            entry,
            category,
            page,
            selected_game: None,
        }
    }

    pub fn with_selected_game(mut self, game: ProviderGameId) -> Self {
        self.selected_game = Some(game);
        self
    }
}

/// Result of a fetch, tagged with whether it is still the latest request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtResponse {
    /// The request was the most recent one when it completed.
    Fresh(Vec<ImageRecord>),
    /// A newer request started meanwhile; the caller should drop this result.
    Stale,
}

impl ArtResponse {
    /// Returns the images if the response is fresh.
    pub fn into_fresh(self) -> Option<Vec<ImageRecord>> {
        match self {
            ArtResponse::Fresh(images) => Some(images),
            ArtResponse::Stale => None,
        }
    }
}
