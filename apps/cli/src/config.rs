//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `$XDG_CONFIG_HOME/gridcache/config.toml` (or `~/.config/...`)
//! - Windows: `%APPDATA%/gridcache/config.toml`

use std::path::{Path, PathBuf};

use gridcache_engine::{
    DEFAULT_PAGE_COUNT, EngineOptions, ImageFilters, PageCountPolicy, default_cache_root,
};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configured API key.
pub const API_KEY_ENV: &str = "STEAMGRIDDB_API_KEY";

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SteamGridDB API key.
    #[serde(default)]
    pub steamgriddb_api_key: String,

    /// Image cache root (empty = platform default).
    #[serde(default)]
    pub cache_dir: String,

    /// Start online. When off, only cached data is served.
    #[serde(default = "default_true")]
    pub online: bool,

    /// Walk result pages to count them instead of assuming `page_count`.
    #[serde(default)]
    pub discover_page_counts: bool,

    /// Page count assumed per candidate when discovery is off.
    #[serde(default = "default_page_count")]
    pub page_count: u32,

    /// Keep downloaded images when the CLI exits.
    #[serde(default)]
    pub keep_cache_on_exit: bool,

    #[serde(default)]
    pub filters: ImageFilters,
}

fn default_true() -> bool {
    true
}

fn default_page_count() -> u32 {
    DEFAULT_PAGE_COUNT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steamgriddb_api_key: String::new(),
            cache_dir: String::new(),
            online: default_true(),
            discover_page_counts: false,
            page_count: default_page_count(),
            keep_cache_on_exit: false,
            filters: ImageFilters::default(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    ///
    /// `STEAMGRIDDB_API_KEY` takes precedence over the file's key.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()) {
            config.steamgriddb_api_key = key;
        }
        Ok(config)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // The file holds the API key.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Cache root, falling back to the platform default.
    pub fn cache_root(&self) -> anyhow::Result<PathBuf> {
        if self.cache_dir.is_empty() {
            Ok(default_cache_root()?)
        } else {
            Ok(PathBuf::from(&self.cache_dir))
        }
    }

    pub fn page_count_policy(&self) -> PageCountPolicy {
        if self.discover_page_counts {
            PageCountPolicy::Discover
        } else {
            PageCountPolicy::Fixed(self.page_count)
        }
    }

    pub fn engine_options(&self) -> anyhow::Result<EngineOptions> {
        Ok(EngineOptions {
            cache_root: self.cache_root()?,
            page_counts: self.page_count_policy(),
            filters: self.filters.clone(),
            online: self.online,
        })
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let base = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
                PathBuf::from(home).join(".config")
            });
        Ok(base.join("gridcache").join("config.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("gridcache").join("config.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/gridcache/config.toml"))
    }
}
