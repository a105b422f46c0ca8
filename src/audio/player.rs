// Player controller
// Binds the queue, the sequencer, the engine and the position reporter
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::audio::engine::{PlaybackEngine, PlaybackState};
use crate::audio::output::AudioOutput;
use crate::audio::position::PositionReporter;
use crate::db::models::TrackId;
use crate::events::{EventQueue, PlayerEvent};
use crate::library::collection::TrackLibrary;
use crate::queue::{PlaybackSession, RepeatMode, Sequencer, Transition};
use crate::settings::PlaybackSettings;

/// Point-in-time view of everything the transport bar shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub track_id: Option<TrackId>,
    pub index: Option<usize>,
    pub queue_len: usize,
    pub state: PlaybackState,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

pub struct PlayerController<O: AudioOutput> {
    engine: PlaybackEngine<O>,
    session: PlaybackSession,
    sequencer: Sequencer,
    reporter: PositionReporter,
    rng: StdRng,
    events: EventQueue,
}

impl<O: AudioOutput> PlayerController<O> {
    pub fn new(output: O, settings: &PlaybackSettings) -> Self {
        Self::with_rng(output, settings, StdRng::from_entropy())
    }

    pub fn with_rng(output: O, settings: &PlaybackSettings, rng: StdRng) -> Self {
        Self {
            engine: PlaybackEngine::new(output, settings.volume),
            session: PlaybackSession::new(settings.shuffle, settings.repeat),
            sequencer: Sequencer::new(settings.previous_threshold_secs),
            reporter: PositionReporter::new(settings.position_epsilon_secs),
            rng,
            events: EventQueue::default(),
        }
    }

    /// Replace the queue with `ids` and start at `start`.
    /// Returns false if nothing started playing.
    pub fn play_queue(&mut self, ids: Vec<TrackId>, start: usize, library: &mut TrackLibrary) -> bool {
        match self.session.load(ids, start) {
            Some(index) => self.start_track(index, library),
            None => {
                self.engine.unload();
                library.mark_now_playing(None);
                self.events.push(PlayerEvent::StateChanged(PlaybackState::Stopped));
                false
            }
        }
    }

    /// The play/pause button: pause, resume, or replay the current entry when stopped
    pub fn toggle_play_pause(&mut self, library: &mut TrackLibrary) {
        match self.engine.state() {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Stopped => {
                if let Some(index) = self.session.current_index() {
                    self.start_track(index, library);
                }
            }
        }
    }

    pub fn pause(&mut self) {
        if self.engine.pause() {
            self.events.push(PlayerEvent::StateChanged(PlaybackState::Paused));
        }
    }

    pub fn resume(&mut self) {
        if self.engine.resume() {
            self.events.push(PlayerEvent::StateChanged(PlaybackState::Playing));
        }
    }

    pub fn next(&mut self, library: &mut TrackLibrary) {
        let transition = self.sequencer.next(&self.session, &mut self.rng);
        tracing::debug!(?transition, "next");
        self.apply(transition, library);
    }

    pub fn previous(&mut self, library: &mut TrackLibrary) {
        let position = self.engine.position_secs();
        let transition = self.sequencer.previous(&self.session, position, &mut self.rng);
        tracing::debug!(?transition, position, "previous");
        self.apply(transition, library);
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.session.set_shuffle(shuffle);
        self.events.push(PlayerEvent::ShuffleChanged(shuffle));
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.session.shuffle());
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.session.set_repeat(repeat);
        self.events.push(PlayerEvent::RepeatChanged(repeat));
    }

    pub fn cycle_repeat(&mut self) {
        self.set_repeat(self.session.repeat().cycle());
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
        self.events.push(PlayerEvent::VolumeChanged(self.engine.volume()));
    }

    pub fn adjust_volume(&mut self, delta: f32) {
        self.set_volume(self.engine.volume() + delta);
    }

    pub fn begin_seek_drag(&mut self) {
        self.reporter.begin_drag();
    }

    pub fn end_seek_drag(&mut self, position_secs: f64) {
        match self.reporter.end_drag(&mut self.engine, position_secs) {
            Ok(update) => self.events.push(PlayerEvent::Position(update)),
            Err(e) => {
                tracing::warn!("seek failed: {e}");
                self.events.notice(e.to_string());
            }
        }
    }

    /// One-shot seek, as if the seek control was dragged and released at once
    pub fn seek(&mut self, position_secs: f64) {
        self.begin_seek_drag();
        self.end_seek_drag(position_secs);
    }

    /// Called once per frame: handle a finished track, then publish the position
    pub fn tick(&mut self, library: &mut TrackLibrary) {
        if self.engine.poll_completion() {
            let transition = self.sequencer.on_completion(&self.session, &mut self.rng);
            tracing::debug!(?transition, "track completed");
            self.apply(transition, library);
        }

        if let Some(update) = self.reporter.tick(&self.engine) {
            self.events.push(PlayerEvent::Position(update));
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track_id: self.engine.loaded_track(),
            index: self.session.current_index(),
            queue_len: self.session.len(),
            state: self.engine.state(),
            position_secs: self.engine.position_secs(),
            duration_secs: self.engine.duration_secs(),
            volume: self.engine.volume(),
            shuffle: self.session.shuffle(),
            repeat: self.session.repeat(),
        }
    }

    pub fn current_track(&self) -> Option<TrackId> {
        self.engine.loaded_track()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = PlayerEvent> + '_ {
        self.events.drain()
    }

    fn apply(&mut self, transition: Transition, library: &mut TrackLibrary) {
        match transition {
            Transition::Play(index) => {
                self.start_track(index, library);
            }
            Transition::Restart => {
                if let Some(index) = self.session.current_index() {
                    self.start_track(index, library);
                }
            }
            Transition::Stop => {
                self.engine.stop();
                library.mark_now_playing(None);
                self.events.push(PlayerEvent::StateChanged(PlaybackState::Stopped));
                self.events.push(PlayerEvent::QueueFinished);
                tracing::info!("queue finished");
            }
            Transition::Stay => {}
        }
    }

    /// Load and play the queue entry at `index`. A refused load leaves the cursor where it was;
    /// if it also cost the engine its previous track, observers are told playback stopped.
    fn start_track(&mut self, index: usize, library: &mut TrackLibrary) -> bool {
        let Some(track_id) = self.session.track_at(index) else {
            return false;
        };
        let Some(track) = library.get(track_id) else {
            tracing::warn!(track_id, "queued track is not in the library");
            self.events.notice(format!("track {track_id} is no longer in the library"));
            return false;
        };

        let had_track = self.engine.loaded_track().is_some();
        if let Err(e) = self.engine.load(track) {
            tracing::warn!(track_id, "playback refused: {e}");
            self.events.notice(e.to_string());
            if had_track && self.engine.loaded_track().is_none() {
                library.mark_now_playing(None);
                self.events.push(PlayerEvent::StateChanged(PlaybackState::Stopped));
            }
            return false;
        }
        tracing::info!(track_id, title = %track.title, index, "now playing");

        self.engine.play();
        self.session.set_current_index(index);
        library.mark_now_playing(Some(track_id));

        self.events.push(PlayerEvent::TrackChanged { track_id, index });
        self.events.push(PlayerEvent::StateChanged(PlaybackState::Playing));
        let reset = self.reporter.reset(&self.engine);
        self.events.push(PlayerEvent::Position(reset));
        true
    }
}
