use crossterm::event::KeyCode;
use tracing::warn;

use crate::api::ApiError;
use crate::player::{AudioBridge, AudioResource, Episode, PlaybackSession};

use super::worker::ListingResult;
use super::{DetailView, LibraryView};

const SEEK_STEP_SECS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerCommand {
    /// Queue the whole listing, starting at the selected row.
    PlayListFromSelected,
    /// Queue only the selected episode.
    PlaySelected,
    TogglePlay,
    Next,
    Previous,
    ToggleLoop,
    ToggleShuffle,
    SeekBy(i64),
}

pub(crate) fn player_command_for_key(code: KeyCode) -> Option<PlayerCommand> {
    let command = match code {
        KeyCode::Enter => PlayerCommand::PlayListFromSelected,
        KeyCode::Char('p') => PlayerCommand::PlaySelected,
        KeyCode::Char(' ') => PlayerCommand::TogglePlay,
        KeyCode::Char('n') => PlayerCommand::Next,
        KeyCode::Char('b') => PlayerCommand::Previous,
        KeyCode::Char('l') => PlayerCommand::ToggleLoop,
        KeyCode::Char('s') => PlayerCommand::ToggleShuffle,
        KeyCode::Left => PlayerCommand::SeekBy(-SEEK_STEP_SECS),
        KeyCode::Right => PlayerCommand::SeekBy(SEEK_STEP_SECS),
        _ => return None,
    };
    Some(command)
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// Runs one player control against the session, mirroring which controls
/// are enabled in the player panel. Returns a status line when something
/// happened.
pub(crate) fn apply_player_command<R: AudioResource>(
    command: PlayerCommand,
    session: &mut PlaybackSession,
    bridge: &mut AudioBridge<R>,
    episodes: &[Episode],
    selected: Option<usize>,
) -> Option<String> {
    let message = match command {
        PlayerCommand::PlayListFromSelected | PlayerCommand::PlaySelected => {
            let index = selected.filter(|idx| *idx < episodes.len())?;
            let title = episodes[index].title.clone();
            if command == PlayerCommand::PlaySelected {
                session.play(episodes[index].clone());
            } else {
                session.play_list(episodes.to_vec(), index);
            }
            status_info(&format!("Playing: {title}"))
        }
        _ if !session.is_active() => return None,
        PlayerCommand::TogglePlay => {
            session.toggle_play();
            status_info(if session.is_playing() {
                "Resumed."
            } else {
                "Paused."
            })
        }
        PlayerCommand::Next => {
            if !session.has_next() {
                return None;
            }
            session.play_next();
            now_playing(session)
        }
        PlayerCommand::Previous => {
            if !session.has_previous() {
                return None;
            }
            session.play_previous();
            now_playing(session)
        }
        PlayerCommand::ToggleLoop => {
            session.toggle_loop();
            status_info(&format!("Loop {}.", on_off(session.is_looping())))
        }
        PlayerCommand::ToggleShuffle => {
            session.toggle_shuffle();
            status_info(&format!("Shuffle {}.", on_off(session.is_shuffling())))
        }
        PlayerCommand::SeekBy(delta) => {
            let duration = session.current_episode().map_or(0, |episode| episode.duration);
            let mut target = (bridge.progress() as i64 + delta).max(0) as u64;
            if duration > 0 {
                target = target.min(duration);
            }
            bridge.seek(target);
            return None;
        }
    };
    bridge.sync(session);
    Some(message)
}

fn now_playing(session: &PlaybackSession) -> String {
    match session.current_episode() {
        Some(episode) => status_info(&format!("Playing: {}", episode.title)),
        None => status_info("Nothing playing."),
    }
}

pub(crate) fn apply_listing_result(
    result: ListingResult,
    library: &mut LibraryView,
    detail: &mut Option<DetailView>,
) -> Option<String> {
    match result {
        ListingResult::Latest(Ok(episodes)) => {
            library.loading = false;
            let previous_id = library
                .selected()
                .map(|idx| library.episodes[idx].id.clone());
            library.episodes = episodes;
            let reselect = previous_id
                .and_then(|id| library.episodes.iter().position(|episode| episode.id == id))
                .or_else(|| (!library.episodes.is_empty()).then_some(0));
            library.table_state.select(reselect);
            Some(if library.episodes.is_empty() {
                status_info("No episodes published yet.")
            } else {
                status_info(&format!("Loaded {} episodes.", library.episodes.len()))
            })
        }
        ListingResult::Latest(Err(message)) => {
            library.loading = false;
            warn!(%message, "listing fetch failed");
            Some(status_error(&format!("Could not load episodes: {message}")))
        }
        ListingResult::Detail { id, outcome } => {
            let waiting = matches!(
                detail,
                Some(DetailView::Loading { id: pending }) if *pending == id
            );
            if !waiting {
                return None;
            }
            *detail = Some(match outcome {
                Ok(episode) => DetailView::Ready {
                    episode: Box::new(episode),
                },
                Err(ApiError::NotFound(id)) => DetailView::NotFound { id },
                Err(err) => DetailView::Failed {
                    id,
                    message: err.to_string(),
                },
            });
            None
        }
    }
}
