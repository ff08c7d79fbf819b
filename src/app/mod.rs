mod tui;


use anyhow::Result;
use tracing::warn;

use crate::api::{ApiError, ContentApi};
use crate::cache::ResponseCache;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::paths::cache_file_path;
use crate::player::Episode;
use crate::player::episode::{strip_html, truncate};

pub fn run(cli: Cli, config: Config) -> Result<()> {
    let api = open_api(&config);

    match cli.command {
        Some(Command::List { limit }) => run_list(&api, limit.unwrap_or(config.list_limit))?,
        Some(Command::Show { id }) => run_show(&api, &id)?,
        Some(Command::Tui) | None => tui::run_tui(api, &config)?,
    }

    Ok(())
}

fn run_list(api: &ContentApi, limit: usize) -> Result<()> {
    let episodes = api.fetch_latest(limit, false)?;
    if episodes.is_empty() {
        println!("No episodes published yet.");
        return Ok(());
    }
    print!("{}", format_episode_table(&episodes));
    Ok(())
}

fn run_show(api: &ContentApi, id: &str) -> Result<()> {
    match api.fetch_episode(id) {
        Ok(episode) => print!("{}", format_episode_detail(&episode)),
        Err(ApiError::NotFound(slug)) => println!("Episode not found: {slug}"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

pub(crate) fn format_episode_table(episodes: &[Episode]) -> String {
    let mut out = format!(
        "{:<40} {:<28} {:<10} {:<9}\n",
        "TITLE", "MEMBERS", "DATE", "DURATION"
    );
    for episode in episodes {
        out.push_str(&format!(
            "{:<40} {:<28} {:<10} {:<9}\n",
            truncate(&episode.title, 40),
            truncate(&episode.members, 28),
            episode.published_at,
            episode.duration_display
        ));
    }
    out
}

pub(crate) fn format_episode_detail(episode: &Episode) -> String {
    let mut out = format!(
        "{}\n{} | {} | {}\nid: {}\nstream: {}\nartwork: {}\n",
        episode.title,
        episode.members,
        episode.published_at,
        episode.duration_display,
        episode.id,
        episode.url,
        episode.thumbnail
    );
    let description = strip_html(&episode.description);
    if !description.is_empty() {
        out.push('\n');
        out.push_str(&description);
        out.push('\n');
    }
    out
}

fn open_api(config: &Config) -> ContentApi {
    let cache = match cache_file_path().and_then(|path| ResponseCache::open(&path)) {
        Ok(cache) => Some(cache),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "response cache unavailable");
            None
        }
    };
    ContentApi::new(config.api_url.clone(), cache, config.refresh)
}
