use std::path::PathBuf;

use anyhow::{Context, Result};

fn data_root() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("podcastr"))
}

pub fn cache_file_path() -> Result<PathBuf> {
    Ok(data_root()?.join("cache.db"))
}

pub fn log_file_path() -> Result<PathBuf> {
    Ok(data_root()?.join("podcastr.log"))
}

pub fn mpv_socket_path() -> PathBuf {
    let name = format!("podcastr-mpv-{}.sock", std::process::id());
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(name)
}
