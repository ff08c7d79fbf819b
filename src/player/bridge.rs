use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::resource::{AudioResource, MediaEvent, ResourceError};
use super::session::{PlaybackSession, SessionChange};

/// Keeps one [`AudioResource`] in step with a [`PlaybackSession`].
///
/// Session changes flow in through a subscription and become resource
/// commands in [`AudioBridge::sync`]; resource events flow back as session
/// commands in [`AudioBridge::handle_event`].
pub struct AudioBridge<R: AudioResource> {
    resource: R,
    changes: mpsc::Receiver<SessionChange>,
    progress: u64,
    listening: bool,
    play_requested_at: Option<Instant>,
    stall_timeout: Duration,
}

impl<R: AudioResource> AudioBridge<R> {
    pub fn new(resource: R, session: &mut PlaybackSession, stall_timeout: Duration) -> Self {
        Self {
            resource,
            changes: session.subscribe(),
            progress: 0,
            listening: false,
            play_requested_at: None,
            stall_timeout,
        }
    }

    /// Last observed position in whole seconds. Display only.
    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn is_stalled(&self) -> bool {
        self.is_stalled_at(Instant::now())
    }

    pub(crate) fn is_stalled_at(&self, now: Instant) -> bool {
        self.play_requested_at
            .is_some_and(|requested| now.saturating_duration_since(requested) >= self.stall_timeout)
    }

    #[cfg(test)]
    pub(crate) fn resource(&self) -> &R {
        &self.resource
    }

    #[cfg(test)]
    pub(crate) fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    /// Applies every pending session change to the resource.
    pub fn sync(&mut self, session: &PlaybackSession) {
        let pending: Vec<SessionChange> = self.changes.try_iter().collect();
        for change in pending {
            self.apply_change(change, session);
        }
    }

    /// Feeds resource events back into the session, then re-syncs.
    pub fn pump(&mut self, session: &mut PlaybackSession) {
        for event in self.resource.poll_events() {
            self.handle_event(event, session);
        }
        self.sync(session);
    }

    /// Optimistic: progress reflects the target before the resource confirms.
    /// A target set before metadata arrives is kept until the first
    /// position update replaces it.
    pub fn seek(&mut self, seconds: u64) {
        let result = self.resource.seek(seconds as f64);
        report("seek", result);
        self.progress = seconds;
    }

    fn apply_change(&mut self, change: SessionChange, session: &PlaybackSession) {
        match change {
            SessionChange::ActiveEpisode => {
                let Some(episode) = session.current_episode() else {
                    return;
                };
                info!(id = %episode.id, url = %episode.url, "loading episode");
                self.progress = 0;
                self.listening = false;
                report("set_looping", self.resource.set_looping(session.is_looping()));
                report("load", self.resource.load(&episode.url, session.is_playing()));
                self.play_requested_at = session.is_playing().then(Instant::now);
            }
            SessionChange::Cleared => {
                self.progress = 0;
                self.listening = false;
                self.play_requested_at = None;
                report("unload", self.resource.unload());
            }
            SessionChange::Playing(true) => {
                if !session.is_active() {
                    return;
                }
                report("play", self.resource.play());
                if self.play_requested_at.is_none() {
                    self.play_requested_at = Some(Instant::now());
                }
            }
            SessionChange::Playing(false) => {
                self.play_requested_at = None;
                if session.is_active() {
                    report("pause", self.resource.pause());
                }
            }
            SessionChange::Looping(looping) => {
                if session.is_active() {
                    report("set_looping", self.resource.set_looping(looping));
                }
            }
            SessionChange::Shuffling(_) => {}
        }
    }

    pub fn handle_event(&mut self, event: MediaEvent, session: &mut PlaybackSession) {
        match event {
            MediaEvent::Started => {
                self.play_requested_at = None;
                session.set_playing_state(true);
            }
            MediaEvent::Paused => {
                self.play_requested_at = None;
                session.set_playing_state(false);
            }
            MediaEvent::TimeAdvanced(position) => {
                if self.listening {
                    self.progress = position.max(0.0).floor() as u64;
                }
            }
            MediaEvent::MetadataReady { duration } => {
                debug!(duration, "metadata ready");
                self.listening = true;
            }
            MediaEvent::Ended => {
                // An end from the previously loaded file can still be queued
                // after a new episode was requested.
                if !self.listening {
                    debug!("ignoring end of a file that is no longer loaded");
                    return;
                }
                self.listening = false;
                if session.is_looping() {
                    warn!("resource ended while looping; advancing as if not looping");
                }
                if session.has_next() {
                    session.play_next();
                } else {
                    session.clear_player_state();
                }
            }
        }
    }
}

fn report(op: &str, result: Result<(), ResourceError>) {
    if let Err(err) = result {
        warn!(op, error = %err, "audio resource command failed");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::player::episode::{Episode, format_duration};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String, bool),
        Play,
        Pause,
        Seek(f64),
        Loop(bool),
        Unload,
    }

    #[derive(Default)]
    struct FakeResource {
        calls: Vec<Call>,
        queued: VecDeque<MediaEvent>,
        fail_play: bool,
    }

    impl FakeResource {
        fn take_calls(&mut self) -> Vec<Call> {
            std::mem::take(&mut self.calls)
        }
    }

    impl AudioResource for FakeResource {
        fn load(&mut self, url: &str, autoplay: bool) -> Result<(), ResourceError> {
            self.calls.push(Call::Load(url.to_string(), autoplay));
            Ok(())
        }

        fn play(&mut self) -> Result<(), ResourceError> {
            self.calls.push(Call::Play);
            if self.fail_play {
                return Err(ResourceError::Unavailable("autoplay blocked".to_string()));
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<(), ResourceError> {
            self.calls.push(Call::Pause);
            Ok(())
        }

        fn seek(&mut self, seconds: f64) -> Result<(), ResourceError> {
            self.calls.push(Call::Seek(seconds));
            Ok(())
        }

        fn set_looping(&mut self, looping: bool) -> Result<(), ResourceError> {
            self.calls.push(Call::Loop(looping));
            Ok(())
        }

        fn unload(&mut self) -> Result<(), ResourceError> {
            self.calls.push(Call::Unload);
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<MediaEvent> {
            self.queued.drain(..).collect()
        }
    }

    fn episode(id: &str) -> Episode {
        Episode {
            id: id.to_string(),
            title: id.to_uppercase(),
            members: "Host".to_string(),
            published_at: "1 Jan 21".to_string(),
            thumbnail: String::new(),
            description: String::new(),
            duration: 125,
            duration_display: format_duration(125),
            url: format!("https://cdn.test/{id}.mp3"),
        }
    }

    fn setup() -> (PlaybackSession, AudioBridge<FakeResource>) {
        let mut session = PlaybackSession::with_rng(StdRng::seed_from_u64(7));
        let bridge = AudioBridge::new(
            FakeResource::default(),
            &mut session,
            Duration::from_secs(5),
        );
        (session, bridge)
    }

    #[test]
    fn play_loads_active_episode_with_autoplay() {
        let (mut session, mut bridge) = setup();
        session.play(episode("ep1"));
        bridge.sync(&session);

        assert_eq!(
            bridge.resource_mut().take_calls(),
            vec![
                Call::Loop(false),
                Call::Load("https://cdn.test/ep1.mp3".to_string(), true),
                Call::Play,
            ]
        );
        assert_eq!(bridge.progress(), 0);
    }

    #[test]
    fn playing_flag_transitions_drive_play_and_pause() {
        let (mut session, mut bridge) = setup();
        session.play(episode("ep1"));
        bridge.sync(&session);
        bridge.resource_mut().take_calls();

        session.toggle_play();
        bridge.sync(&session);
        session.toggle_play();
        bridge.sync(&session);

        assert_eq!(bridge.resource_mut().take_calls(), vec![Call::Pause, Call::Play]);
    }

    #[test]
    fn toggling_play_without_episode_leaves_resource_untouched() {
        let (mut session, mut bridge) = setup();
        session.toggle_play();
        session.toggle_play();
        bridge.sync(&session);
        assert!(bridge.resource().calls.is_empty());
    }

    #[test]
    fn progress_waits_for_metadata_then_floors_position() {
        let (mut session, mut bridge) = setup();
        session.play(episode("ep1"));
        bridge.sync(&session);

        bridge.handle_event(MediaEvent::TimeAdvanced(42.0), &mut session);
        assert_eq!(bridge.progress(), 0);

        bridge.handle_event(MediaEvent::MetadataReady { duration: 125.0 }, &mut session);
        bridge.handle_event(MediaEvent::TimeAdvanced(12.9), &mut session);
        assert_eq!(bridge.progress(), 12);
        assert_eq!(format_duration(125), "00:02:05");
    }

    #[test]
    fn episode_change_resets_progress() {
        let (mut session, mut bridge) = setup();
        session.play_list(vec![episode("a"), episode("b")], 0);
        bridge.sync(&session);
        bridge.handle_event(MediaEvent::MetadataReady { duration: 300.0 }, &mut session);
        bridge.handle_event(MediaEvent::TimeAdvanced(30.0), &mut session);
        assert_eq!(bridge.progress(), 30);

        session.play_next();
        bridge.sync(&session);
        assert_eq!(bridge.progress(), 0);
        bridge.handle_event(MediaEvent::TimeAdvanced(31.0), &mut session);
        assert_eq!(bridge.progress(), 0);
    }

    #[test]
    fn seek_is_forwarded_unvalidated_and_shown_immediately() {
        let (mut session, mut bridge) = setup();
        session.play(episode("ep1"));
        bridge.sync(&session);
        bridge.resource_mut().take_calls();

        bridge.seek(9_999);

        assert_eq!(bridge.progress(), 9_999);
        assert_eq!(bridge.resource_mut().take_calls(), vec![Call::Seek(9_999.0)]);
    }

    #[test]
    fn seek_before_metadata_keeps_target() {
        let (mut session, mut bridge) = setup();
        session.play(episode("ep1"));
        bridge.sync(&session);

        bridge.seek(40);
        bridge.handle_event(MediaEvent::MetadataReady { duration: 125.0 }, &mut session);
        assert_eq!(bridge.progress(), 40);

        bridge.handle_event(MediaEvent::TimeAdvanced(40.6), &mut session);
        assert_eq!(bridge.progress(), 40);
    }

    #[test]
    fn ended_with_next_advances_queue() {
        let (mut session, mut bridge) = setup();
        session.play_list(vec![episode("a"), episode("b"), episode("c")], 1);
        bridge.sync(&session);
        bridge.resource_mut().take_calls();

        bridge.resource_mut().queued.extend([
            MediaEvent::MetadataReady { duration: 125.0 },
            MediaEvent::Ended,
        ]);
        bridge.pump(&mut session);

        assert_eq!(session.current_index(), 2);
        assert_eq!(
            bridge.resource_mut().take_calls(),
            vec![
                Call::Loop(false),
                Call::Load("https://cdn.test/c.mp3".to_string(), true),
            ]
        );
    }

    #[test]
    fn ended_without_next_clears_session() {
        let (mut session, mut bridge) = setup();
        session.play(episode("only"));
        bridge.sync(&session);
        bridge.resource_mut().take_calls();

        bridge.resource_mut().queued.extend([
            MediaEvent::MetadataReady { duration: 125.0 },
            MediaEvent::Ended,
        ]);
        bridge.pump(&mut session);

        assert!(session.queue().is_empty());
        assert_eq!(session.current_index(), 0);
        assert_eq!(bridge.resource_mut().take_calls(), vec![Call::Unload]);
    }

    #[test]
    fn end_of_replaced_file_does_not_touch_new_episode() {
        let (mut session, mut bridge) = setup();
        session.play(episode("a"));
        bridge.sync(&session);
        bridge.handle_event(MediaEvent::MetadataReady { duration: 125.0 }, &mut session);

        bridge.resource_mut().queued.push_back(MediaEvent::Ended);
        session.play(episode("b"));
        bridge.sync(&session);
        bridge.pump(&mut session);

        assert!(session.is_active());
        assert_eq!(session.current_episode().map(|e| e.id.as_str()), Some("b"));
    }

    #[test]
    fn stale_end_does_not_skip_freshly_chosen_list_entry() {
        let (mut session, mut bridge) = setup();
        session.play(episode("old"));
        bridge.sync(&session);
        bridge.handle_event(MediaEvent::MetadataReady { duration: 125.0 }, &mut session);

        bridge.resource_mut().queued.push_back(MediaEvent::Ended);
        session.play_list(vec![episode("a"), episode("b"), episode("c")], 0);
        bridge.sync(&session);
        bridge.pump(&mut session);

        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_episode().map(|e| e.id.as_str()), Some("a"));
    }

    #[test]
    fn repeated_end_in_one_batch_advances_once() {
        let (mut session, mut bridge) = setup();
        session.play_list(vec![episode("a"), episode("b"), episode("c")], 0);
        bridge.sync(&session);

        bridge.resource_mut().queued.extend([
            MediaEvent::MetadataReady { duration: 125.0 },
            MediaEvent::Ended,
            MediaEvent::Ended,
        ]);
        bridge.pump(&mut session);

        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn ended_while_looping_is_handled_like_plain_end() {
        let (mut session, mut bridge) = setup();
        session.play(episode("only"));
        session.toggle_loop();
        bridge.sync(&session);

        bridge.handle_event(MediaEvent::MetadataReady { duration: 125.0 }, &mut session);
        bridge.handle_event(MediaEvent::Ended, &mut session);

        assert!(!session.is_active());
    }

    #[test]
    fn loop_flag_is_forwarded_to_active_resource() {
        let (mut session, mut bridge) = setup();
        session.toggle_loop();
        bridge.sync(&session);
        assert!(bridge.resource().calls.is_empty());

        session.play(episode("ep1"));
        session.toggle_loop();
        bridge.sync(&session);

        assert_eq!(
            bridge.resource_mut().take_calls(),
            vec![
                Call::Loop(false),
                Call::Load("https://cdn.test/ep1.mp3".to_string(), true),
                Call::Play,
                Call::Loop(false),
            ]
        );
    }

    #[test]
    fn resource_events_reconcile_playing_flag() {
        let (mut session, mut bridge) = setup();
        session.play(episode("ep1"));
        bridge.sync(&session);

        bridge.handle_event(MediaEvent::Paused, &mut session);
        assert!(!session.is_playing());
        bridge.handle_event(MediaEvent::Started, &mut session);
        assert!(session.is_playing());

        bridge.resource_mut().take_calls();
        bridge.sync(&session);
        assert_eq!(bridge.resource_mut().take_calls(), vec![Call::Pause, Call::Play]);
    }

    #[test]
    fn failed_start_is_reported_as_stalled_until_reconciled() {
        let mut session = PlaybackSession::with_rng(StdRng::seed_from_u64(1));
        let resource = FakeResource {
            fail_play: true,
            ..FakeResource::default()
        };
        let mut bridge = AudioBridge::new(resource, &mut session, Duration::from_secs(2));

        session.play(episode("ep1"));
        bridge.sync(&session);

        assert!(session.is_playing());
        let later = Instant::now() + Duration::from_secs(3);
        assert!(bridge.is_stalled_at(later));

        bridge.handle_event(MediaEvent::Paused, &mut session);
        assert!(!bridge.is_stalled_at(later));
        assert!(!session.is_playing());
    }
}
