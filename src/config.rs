use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:3333/episodes";
pub(crate) const DEFAULT_LIST_LIMIT: usize = 12;
pub(crate) const DEFAULT_STALL_SECS: u64 = 8;
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub mpv_bin: PathBuf,
    pub list_limit: usize,
    pub stall_timeout: Duration,
    pub log_filter: String,
    pub refresh: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_url: api_url_from_env(env::var_os("PODCASTR_API_URL")),
            mpv_bin: mpv_bin_from_env(env::var_os("PODCASTR_MPV_BIN")),
            list_limit: list_limit_from_env(env::var_os("PODCASTR_LIMIT")),
            stall_timeout: stall_timeout_from_env(env::var_os("PODCASTR_STALL_SECS")),
            log_filter: log_filter_from_env(env::var_os("PODCASTR_LOG")),
            refresh: false,
        }
    }

    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(url) = cli.api_url.as_deref().map(str::trim)
            && !url.is_empty()
        {
            self.api_url = url.to_string();
        }
        self.refresh = cli.refresh;
        self
    }
}

fn non_empty(value: Option<OsString>) -> Option<String> {
    let value = value?.into_string().ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn api_url_from_env(value: Option<OsString>) -> String {
    non_empty(value).unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

pub(crate) fn mpv_bin_from_env(value: Option<OsString>) -> PathBuf {
    match value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from("mpv"),
    }
}

pub(crate) fn list_limit_from_env(value: Option<OsString>) -> usize {
    non_empty(value)
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT)
}

pub(crate) fn stall_timeout_from_env(value: Option<OsString>) -> Duration {
    let secs = non_empty(value)
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(DEFAULT_STALL_SECS);
    Duration::from_secs(secs)
}

pub(crate) fn log_filter_from_env(value: Option<OsString>) -> String {
    non_empty(value).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}
