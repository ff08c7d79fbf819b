use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "podcastr",
    version,
    about = "Browse and stream podcast episodes from the terminal"
)]
pub struct Cli {
    /// Content API endpoint (overrides PODCASTR_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Ignore cached listings and fetch again
    #[arg(long, global = true)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the latest episodes
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a single episode by id
    Show { id: String },
    Tui,
}
