use std::sync::mpsc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::episode::Episode;

/// Notifications published to session subscribers after each command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Queue and/or index were assigned; the active episode must (re)load.
    ActiveEpisode,
    Cleared,
    Playing(bool),
    Looping(bool),
    Shuffling(bool),
}

/// Shared playback intent: what should play, and how.
///
/// Commands are plain state transitions. They never touch the audio
/// resource; subscribers (the bridge) react to the published changes.
pub struct PlaybackSession {
    queue: Vec<Episode>,
    current_index: usize,
    is_playing: bool,
    is_looping: bool,
    is_shuffling: bool,
    rng: StdRng,
    subscribers: Vec<mpsc::Sender<SessionChange>>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            queue: Vec::new(),
            current_index: 0,
            is_playing: false,
            is_looping: false,
            is_shuffling: false,
            rng,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<SessionChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn queue(&self) -> &[Episode] {
        &self.queue
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.queue.get(self.current_index)
    }

    pub fn is_active(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.is_shuffling
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.is_shuffling || self.current_index + 1 < self.queue.len()
    }

    pub fn play(&mut self, episode: Episode) {
        debug!(id = %episode.id, "play single episode");
        self.queue = vec![episode];
        self.current_index = 0;
        self.publish(SessionChange::ActiveEpisode);
        self.set_playing_state(true);
    }

    pub fn play_list(&mut self, list: Vec<Episode>, index: usize) {
        if index >= list.len() {
            warn!(index, len = list.len(), "ignoring play_list with out-of-range index");
            return;
        }
        debug!(index, len = list.len(), "play list");
        self.queue = list;
        self.current_index = index;
        self.publish(SessionChange::ActiveEpisode);
        self.set_playing_state(true);
    }

    pub fn toggle_play(&mut self) {
        self.set_playing_state(!self.is_playing);
    }

    pub fn toggle_loop(&mut self) {
        self.is_looping = !self.is_looping;
        self.publish(SessionChange::Looping(self.is_looping));
    }

    pub fn toggle_shuffle(&mut self) {
        self.is_shuffling = !self.is_shuffling;
        self.publish(SessionChange::Shuffling(self.is_shuffling));
    }

    /// Authoritative set, used to reconcile with what the resource reports.
    pub fn set_playing_state(&mut self, state: bool) {
        if self.is_playing == state {
            return;
        }
        self.is_playing = state;
        self.publish(SessionChange::Playing(state));
    }

    /// Shuffle may land on the current index again; no history is kept.
    pub fn play_next(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.is_shuffling {
            self.current_index = self.rng.random_range(0..self.queue.len());
        } else if self.has_next() {
            self.current_index += 1;
        } else {
            return;
        }
        debug!(index = self.current_index, "play next");
        self.publish(SessionChange::ActiveEpisode);
    }

    pub fn play_previous(&mut self) {
        if !self.has_previous() || self.queue.is_empty() {
            return;
        }
        self.current_index -= 1;
        debug!(index = self.current_index, "play previous");
        self.publish(SessionChange::ActiveEpisode);
    }

    pub fn clear_player_state(&mut self) {
        self.queue.clear();
        self.current_index = 0;
        debug!("player state cleared");
        self.publish(SessionChange::Cleared);
    }

    fn publish(&mut self, change: SessionChange) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::episode::format_duration;

    fn episode(id: &str, duration: u64) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {id}"),
            members: "Host".to_string(),
            published_at: "1 Jan 21".to_string(),
            thumbnail: format!("https://cdn.test/{id}.jpg"),
            description: String::new(),
            duration,
            duration_display: format_duration(duration),
            url: format!("https://cdn.test/{id}.mp3"),
        }
    }

    fn abc() -> Vec<Episode> {
        vec![episode("a", 60), episode("b", 60), episode("c", 60)]
    }

    fn seeded() -> PlaybackSession {
        PlaybackSession::with_rng(StdRng::seed_from_u64(42))
    }

    fn drain(rx: &mpsc::Receiver<SessionChange>) -> Vec<SessionChange> {
        rx.try_iter().collect()
    }

    #[test]
    fn starts_inactive_with_all_flags_off() {
        let session = seeded();
        assert!(!session.is_active());
        assert!(session.current_episode().is_none());
        assert_eq!(session.current_index(), 0);
        assert!(!session.is_playing());
        assert!(!session.is_looping());
        assert!(!session.is_shuffling());
        assert!(!session.has_next());
        assert!(!session.has_previous());
    }

    #[test]
    fn play_replaces_queue_with_single_episode() {
        let mut session = seeded();
        session.play_list(abc(), 2);
        session.play(episode("ep1", 125));

        assert_eq!(session.queue().len(), 1);
        assert_eq!(session.current_index(), 0);
        assert!(session.is_playing());
        let current = session.current_episode().expect("active episode");
        assert_eq!(current.id, "ep1");
        assert_eq!(current.duration_display, "00:02:05");
    }

    #[test]
    fn play_list_sets_queue_index_and_playing_for_every_valid_index() {
        for index in 0..3 {
            let mut session = seeded();
            session.play_list(abc(), index);
            assert_eq!(session.queue(), abc().as_slice());
            assert_eq!(session.current_index(), index);
            assert!(session.is_playing());
        }
    }

    #[test]
    fn play_list_rejects_out_of_range_index() {
        let mut session = seeded();
        session.play(episode("keep", 10));
        let rx = session.subscribe();

        session.play_list(abc(), 3);
        session.play_list(Vec::new(), 0);

        assert_eq!(session.queue()[0].id, "keep");
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn toggles_track_call_parity() {
        let mut session = seeded();
        for calls in 1..=5 {
            session.toggle_loop();
            assert_eq!(session.is_looping(), calls % 2 == 1);
        }
        for calls in 1..=4 {
            session.toggle_shuffle();
            assert_eq!(session.is_shuffling(), calls % 2 == 1);
        }
        for calls in 1..=3 {
            session.toggle_play();
            assert_eq!(session.is_playing(), calls % 2 == 1);
        }
        assert!(session.is_looping());
        assert!(!session.is_shuffling());
        assert!(session.is_playing());
    }

    #[test]
    fn each_toggle_flips_only_its_own_flag() {
        let mut session = seeded();
        session.toggle_shuffle();
        assert!(session.is_shuffling());
        assert!(!session.is_looping());
        assert!(!session.is_playing());
    }

    #[test]
    fn has_next_is_true_while_shuffling_regardless_of_index() {
        let mut session = seeded();
        session.play_list(abc(), 2);
        assert!(!session.has_next());
        session.toggle_shuffle();
        assert!(session.has_next());
    }

    #[test]
    fn play_next_advances_sequentially() {
        let mut session = seeded();
        session.play_list(abc(), 1);
        session.play_next();
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn play_next_at_last_index_is_noop() {
        let mut session = seeded();
        session.play_list(abc(), 2);
        let rx = session.subscribe();

        session.play_next();

        assert_eq!(session.current_index(), 2);
        assert_eq!(session.queue().len(), 3);
        assert!(session.is_playing());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn shuffled_next_always_stays_in_range() {
        let mut session = seeded();
        session.play_list(abc(), 1);
        session.toggle_shuffle();
        let mut seen = [false; 3];
        for _ in 0..200 {
            session.play_next();
            let index = session.current_index();
            assert!(index < 3);
            seen[index] = true;
        }
        assert!(seen.iter().all(|hit| *hit), "uniform pick should hit every index");
    }

    #[test]
    fn play_previous_at_first_index_is_noop() {
        let mut session = seeded();
        session.play_list(abc(), 0);
        session.play_previous();
        assert_eq!(session.current_index(), 0);

        session.play_list(abc(), 2);
        session.play_previous();
        assert_eq!(session.current_index(), 1);
        assert!(session.has_previous());
    }

    #[test]
    fn navigation_on_empty_queue_never_panics() {
        let mut session = seeded();
        session.play_next();
        session.play_previous();
        session.toggle_shuffle();
        session.play_next();
        assert!(!session.is_active());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn clear_always_empties_queue_and_resets_index() {
        let mut session = seeded();
        session.play_list(abc(), 2);
        session.toggle_loop();
        session.clear_player_state();

        assert!(session.queue().is_empty());
        assert_eq!(session.current_index(), 0);
        assert!(session.is_looping());

        session.clear_player_state();
        assert!(session.queue().is_empty());
    }

    #[test]
    fn subscribers_see_transitions_in_order() {
        let mut session = seeded();
        let rx = session.subscribe();

        session.play_list(abc(), 0);
        session.set_playing_state(true);
        session.toggle_loop();
        session.play_next();
        session.toggle_play();
        session.clear_player_state();

        assert_eq!(
            drain(&rx),
            vec![
                SessionChange::ActiveEpisode,
                SessionChange::Playing(true),
                SessionChange::Looping(true),
                SessionChange::ActiveEpisode,
                SessionChange::Playing(false),
                SessionChange::Cleared,
            ]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut session = seeded();
        let rx = session.subscribe();
        drop(rx);
        let live = session.subscribe();

        session.toggle_shuffle();

        assert_eq!(session.subscribers.len(), 1);
        assert_eq!(drain(&live), vec![SessionChange::Shuffling(true)]);
    }
}
