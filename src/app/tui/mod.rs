mod actions;
mod render;
mod screen;
mod worker;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;
use tracing::{info, warn};

use crate::api::ContentApi;
use crate::config::Config;
use crate::player::{AudioBridge, AudioResource, Episode, PlaybackSession, UnavailableResource};

use self::actions::{status_error, status_info};
use self::render::draw_tui;
use self::screen::ScreenGuard;
use self::worker::{ListingRequest, ListingWorker};

pub(crate) use self::actions::{
    PlayerCommand, apply_listing_result, apply_player_command, player_command_for_key,
};
pub(crate) use self::worker::ListingResult;

/// How many of the newest episodes are highlighted as "latest".
pub(crate) const LATEST_COUNT: usize = 2;
const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub(crate) enum DetailView {
    Loading { id: String },
    Ready { episode: Box<Episode> },
    NotFound { id: String },
    Failed { id: String, message: String },
}

pub(crate) struct LibraryView {
    pub(crate) episodes: Vec<Episode>,
    pub(crate) table_state: TableState,
    pub(crate) loading: bool,
}

impl LibraryView {
    pub(crate) fn new() -> Self {
        Self {
            episodes: Vec::new(),
            table_state: TableState::default(),
            loading: true,
        }
    }

    pub(crate) fn selected(&self) -> Option<usize> {
        self.table_state
            .selected()
            .filter(|idx| *idx < self.episodes.len())
    }
}

pub(crate) fn run_tui(api: ContentApi, config: &Config) -> Result<()> {
    let mut session = PlaybackSession::new();
    let (resource, startup_status) = open_resource(config);
    let mut bridge = AudioBridge::new(resource, &mut session, config.stall_timeout);

    let worker = ListingWorker::spawn(api);
    worker.request(ListingRequest::Latest {
        limit: config.list_limit,
        refresh: config.refresh,
    });

    let mut screen = ScreenGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut library = LibraryView::new();
    let mut detail = None::<DetailView>;
    let mut status = startup_status.unwrap_or_else(|| status_info("Loading episodes..."));

    loop {
        while let Some(result) = worker.try_recv() {
            if let Some(message) = apply_listing_result(result, &mut library, &mut detail) {
                status = message;
            }
        }
        bridge.pump(&mut session);

        terminal.draw(|frame| {
            draw_tui(frame, &mut library, &session, &bridge, &status, detail.as_ref())
        })?;

        if !event::poll(TICK)? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if detail.is_some() {
            match key.code {
                KeyCode::Char('p') | KeyCode::Enter => {
                    if let Some(DetailView::Ready { episode }) = detail.take() {
                        status = status_info(&format!("Playing: {}", episode.title));
                        session.play(*episode);
                        bridge.sync(&session);
                    }
                }
                KeyCode::Char('q') => break,
                _ => detail = None,
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Up => {
                if let Some(selected) = library.table_state.selected() {
                    library.table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = library.table_state.selected()
                    && !library.episodes.is_empty()
                {
                    let next = (selected + 1).min(library.episodes.len() - 1);
                    library.table_state.select(Some(next));
                }
            }
            KeyCode::Char('r') => {
                library.loading = true;
                status = status_info("Refreshing episodes...");
                worker.request(ListingRequest::Latest {
                    limit: config.list_limit,
                    refresh: true,
                });
            }
            KeyCode::Char('i') => {
                let Some(selected) = library.selected() else {
                    status = status_error("No episode selected.");
                    continue;
                };
                let id = library.episodes[selected].id.clone();
                detail = Some(DetailView::Loading { id: id.clone() });
                worker.request(ListingRequest::Detail { id });
            }
            code => {
                let Some(command) = player_command_for_key(code) else {
                    continue;
                };
                if let Some(message) = apply_player_command(
                    command,
                    &mut session,
                    &mut bridge,
                    &library.episodes,
                    library.selected(),
                ) {
                    status = message;
                }
            }
        }
    }

    info!("leaving tui");
    terminal.show_cursor()?;
    screen.leave()?;
    Ok(())
}

fn open_resource(config: &Config) -> (Box<dyn AudioResource>, Option<String>) {
    #[cfg(unix)]
    {
        match crate::player::MpvResource::spawn(&config.mpv_bin, crate::paths::mpv_socket_path()) {
            Ok(resource) => (Box::new(resource), None),
            Err(err) => {
                warn!(error = %err, "audio playback unavailable");
                (
                    Box::new(UnavailableResource::new(err.to_string())),
                    Some(status_error(&format!("Playback unavailable: {err}"))),
                )
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = config;
        let reason = "mpv playback requires a unix platform";
        warn!(reason, "audio playback unavailable");
        (
            Box::new(UnavailableResource::new(reason)),
            Some(status_error(&format!("Playback unavailable: {reason}"))),
        )
    }
}
