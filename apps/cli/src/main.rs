//! gridcache command-line entry point.

mod app;
mod config;

use clap::{Parser, Subcommand};
use gridcache_engine::ArtCategory;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridcache", version, about = "SteamGridDB artwork cache")]
struct Cli {
    /// Serve cached data only, whatever the config says.
    #[arg(long, global = true)]
    offline: bool,

    /// Keep downloaded images on exit, whatever the config says.
    #[arg(long, global = true)]
    keep_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List artwork for a library entry.
    Fetch {
        /// Steam app id, or shortcut id for non-Steam entries.
        app_id: u32,
        /// Display name used for the provider search.
        name: String,
        /// Treat the entry as a non-Steam shortcut.
        #[arg(long)]
        non_steam: bool,
        #[arg(short, long, default_value = "capsule")]
        category: ArtCategory,
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        /// Use this SteamGridDB game id if it is among the candidates.
        #[arg(short, long)]
        game: Option<i32>,
        /// Also download every listed image.
        #[arg(short, long)]
        download: bool,
    },
    /// Download one image into the cache and print its path.
    Download {
        app_id: u32,
        category: ArtCategory,
        url: String,
    },
    /// Print the cache size in bytes.
    Size,
    /// Delete the image cache.
    Clear,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::load()?;
    if cli.offline {
        config.online = false;
    }
    if cli.keep_cache {
        config.keep_cache_on_exit = true;
    }
    tracing::debug!(online = config.online, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, cli.command))
}
