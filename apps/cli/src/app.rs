//! Command execution against one engine session.

use std::sync::Arc;

use gridcache_engine::{
    ArtCategory, ArtEngine, ArtGateway, ArtRequest, ArtResponse, EntryKind, GameCandidate,
    LibraryEntry, NativeAppId, ProviderGameId,
};
use gridcache_steamgriddb::Client;

use crate::Command;
use crate::config::{API_KEY_ENV, Config};

/// Runs one command, then tears the session down.
pub async fn run(config: Config, command: Command) -> anyhow::Result<()> {
    let client = Client::new(&config.steamgriddb_api_key)?;
    run_with(Arc::new(client), config, command).await
}

async fn run_with(
    gateway: Arc<dyn ArtGateway>,
    config: Config,
    command: Command,
) -> anyhow::Result<()> {
    let engine = ArtEngine::start(gateway, config.engine_options()?).await?;

    let result = execute(&engine, &config, command).await;

    if config.keep_cache_on_exit {
        tracing::info!(root = %engine.blob_store().root().display(), "keeping image cache");
        return result;
    }
    match (result, engine.teardown().await) {
        (Err(e), Err(teardown)) => {
            tracing::warn!(error = %teardown, "cache teardown failed");
            Err(e)
        }
        (result, Ok(())) => result,
        (Ok(()), Err(teardown)) => Err(teardown.into()),
    }
}

async fn execute(engine: &ArtEngine, config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Fetch {
            app_id,
            name,
            non_steam,
            category,
            page,
            game,
            download,
        } => {
            require_api_key(config)?;
            let kind = if non_steam {
                EntryKind::NonSteam
            } else {
                EntryKind::infer(NativeAppId(app_id))
            };
            let entry = LibraryEntry::with_kind(app_id, name, kind);
            let mut request = ArtRequest::new(entry, category, page);
            if let Some(game) = game {
                request = request.with_selected_game(ProviderGameId(game));
            }
            fetch(engine, &request, download).await
        }
        Command::Download {
            app_id,
            category,
            url,
        } => {
            require_api_key(config)?;
            let path = engine.get_image(NativeAppId(app_id), category, &url).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Size => {
            println!("{}", engine.blob_store().size());
            Ok(())
        }
        Command::Clear => {
            engine.blob_store().invalidate().await?;
            Ok(())
        }
    }
}

async fn fetch(engine: &ArtEngine, request: &ArtRequest, download: bool) -> anyhow::Result<()> {
    let ArtResponse::Fresh(images) = engine.fetch_art_for_app(request).await? else {
        anyhow::bail!("request superseded by a newer one");
    };

    let app_id = request.entry.app_id;
    let active = engine.active_game();
    for candidate in engine.candidates(app_id).unwrap_or_default() {
        println!(
            "{}",
            describe_candidate(&candidate, request.category, active == Some(candidate.id))
        );
    }
    if active.is_none() {
        println!("no matching game for \"{}\"", request.entry.name);
        return Ok(());
    }

    for image in &images {
        println!("{}\t{}x{}\t{}", image.id, image.width, image.height, image.url);
        if download {
            let path = engine.get_image(app_id, request.category, &image.url).await?;
            println!("\t-> {}", path.display());
        }
    }
    Ok(())
}

fn describe_candidate(candidate: &GameCandidate, category: ArtCategory, active: bool) -> String {
    let marker = if active { '*' } else { ' ' };
    let pages = candidate
        .page_count(category)
        .map_or_else(|| "?".to_string(), |n| n.to_string());
    format!(
        "{marker} {}\t{}\t{pages} page(s){}",
        candidate.id,
        candidate.name,
        if candidate.verified { "\tverified" } else { "" }
    )
}

fn require_api_key(config: &Config) -> anyhow::Result<()> {
    if config.online && config.steamgriddb_api_key.is_empty() {
        anyhow::bail!(
            "no SteamGridDB API key: set steamgriddb_api_key in the config or {API_KEY_ENV}"
        );
    }
    Ok(())
}
