// Playback engine: owns the audio output and its Stopped/Paused/Playing state
use serde::Serialize;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::audio::output::{AudioOutput, CompletionSignal};
use crate::db::models::{Track, TrackId};
use crate::error::PlaybackError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

pub struct PlaybackEngine<O: AudioOutput> {
    output: O,
    state: PlaybackState,
    loaded: Option<TrackId>,
    generation: u64,
    position_secs: f64,
    duration_secs: f64,
    volume: f32,
    seek_in_flight: bool,
    completion_tx: Sender<u64>,
    completion_rx: Receiver<u64>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(mut output: O, volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        output.set_volume(volume);
        let (completion_tx, completion_rx) = mpsc::channel();

        Self {
            output,
            state: PlaybackState::Stopped,
            loaded: None,
            generation: 0,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume,
            seek_in_flight: false,
            completion_tx,
            completion_rx,
        }
    }

    /// Open a track, paused at 0. Refuses before touching the output if the file is gone.
    /// If the output cannot open it, the previous track is gone too and the engine is left unloaded.
    pub fn load(&mut self, track: &Track) -> Result<(), PlaybackError> {
        let path = Path::new(&track.file_path);
        if !path.exists() {
            return Err(PlaybackError::MissingFile(path.to_path_buf()));
        }

        // Any completion still queued for the previous load is now stale
        self.generation += 1;
        let signal = CompletionSignal::new(self.generation, self.completion_tx.clone());
        let reported = match self.output.open(path, signal) {
            Ok(reported) => reported,
            Err(e) => {
                self.unload();
                return Err(e);
            }
        };

        self.duration_secs = reported
            .map(|d| d.as_secs_f64())
            .or_else(|| track.duration_secs())
            .unwrap_or(0.0);
        self.position_secs = 0.0;
        self.state = PlaybackState::Stopped;
        self.loaded = Some(track.id);

        tracing::debug!(
            track_id = track.id,
            generation = self.generation,
            duration = self.duration_secs,
            "loaded track"
        );
        Ok(())
    }

    pub fn play(&mut self) -> bool {
        if self.loaded.is_none() {
            return false;
        }
        self.output.play();
        self.state = PlaybackState::Playing;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.position_secs = self.output.position().as_secs_f64();
        self.output.pause();
        self.state = PlaybackState::Paused;
        true
    }

    /// Continue from the last known position. Only valid from Paused.
    pub fn resume(&mut self) -> bool {
        if self.state != PlaybackState::Paused || self.loaded.is_none() {
            return false;
        }
        if let Err(e) = self.output.seek(Duration::from_secs_f64(self.position_secs)) {
            tracing::warn!("could not restore position on resume: {e}");
        }
        self.output.play();
        self.state = PlaybackState::Playing;
        true
    }

    /// Halt output but keep the track loaded
    pub fn stop(&mut self) {
        self.position_secs = self.output.position().as_secs_f64();
        self.output.stop();
        self.state = PlaybackState::Stopped;
    }

    /// Halt output and forget the current track
    pub fn unload(&mut self) {
        self.output.stop();
        self.state = PlaybackState::Stopped;
        self.loaded = None;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
    }

    /// Jump to an absolute position. A seek issued while one is in flight is dropped.
    pub fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if self.seek_in_flight || self.loaded.is_none() {
            return Ok(());
        }

        let mut target = seconds.max(0.0);
        if self.duration_secs > 0.0 {
            target = target.min(self.duration_secs);
        }

        let position =
            Duration::try_from_secs_f64(target).map_err(|e| PlaybackError::Seek(e.to_string()))?;

        self.seek_in_flight = true;
        let result = self.output.seek(position);
        self.seek_in_flight = false;

        result?;
        self.position_secs = target;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.output.set_volume(self.volume);
    }

    /// Drain completion signals. True if the currently loaded track finished.
    pub fn poll_completion(&mut self) -> bool {
        let mut finished = false;
        while let Ok(generation) = self.completion_rx.try_recv() {
            if generation == self.generation && self.loaded.is_some() {
                finished = true;
            } else {
                tracing::debug!(generation, current = self.generation, "dropping stale completion");
            }
        }

        if finished && self.state == PlaybackState::Playing {
            self.position_secs = self.duration_secs;
            self.state = PlaybackState::Stopped;
            return true;
        }
        false
    }

    /// Live position while playing, last known position otherwise
    pub fn position_secs(&self) -> f64 {
        match self.state {
            PlaybackState::Playing => self.output.position().as_secs_f64(),
            _ => self.position_secs,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_seeking(&self) -> bool {
        self.seek_in_flight
    }

    pub fn loaded_track(&self) -> Option<TrackId> {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::fake::FakeOutput;
    use tempfile::TempDir;

    fn track_in(dir: &TempDir, id: TrackId, name: &str) -> Track {
        let path = dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        Track {
            id,
            title: name.to_string(),
            file_path: path.to_string_lossy().to_string(),
            duration_ms: Some(200_000),
            ..Track::default()
        }
    }

    #[test]
    fn test_missing_file_never_reaches_output() {
        let output = FakeOutput::default();
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);
        let track = Track {
            id: 1,
            file_path: "/definitely/not/here.mp3".to_string(),
            ..Track::default()
        };

        let err = engine.load(&track).unwrap_err();
        assert!(matches!(err, PlaybackError::MissingFile(_)));
        assert_eq!(output.opened_count(), 0);
        assert!(!engine.play());
    }

    #[test]
    fn test_pause_and_resume_restore_position() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::default();
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);

        engine.load(&track_in(&dir, 1, "a.mp3")).unwrap();
        assert!(!engine.resume());
        assert!(engine.play());
        output.set_position(42.0);

        assert!(engine.pause());
        assert_eq!(engine.state(), PlaybackState::Paused);
        output.set_position(0.0);

        assert!(engine.resume());
        assert_eq!(engine.position_secs(), 42.0);
        assert_eq!(output.state.borrow().seeks.last(), Some(&Duration::from_secs(42)));
    }

    #[test]
    fn test_duration_falls_back_to_track_metadata() {
        let dir = TempDir::new().unwrap();
        let mut engine = PlaybackEngine::new(FakeOutput::default(), 0.5);
        engine.load(&track_in(&dir, 1, "a.mp3")).unwrap();
        assert_eq!(engine.duration_secs(), 200.0);

        let mut engine = PlaybackEngine::new(FakeOutput::with_duration(90), 0.5);
        engine.load(&track_in(&dir, 2, "b.mp3")).unwrap();
        assert_eq!(engine.duration_secs(), 90.0);
    }

    #[test]
    fn test_seek_is_clamped_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::with_duration(100);
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);
        engine.load(&track_in(&dir, 1, "a.mp3")).unwrap();
        engine.play();

        engine.seek(30.0).unwrap();
        engine.seek(30.0).unwrap();
        assert_eq!(engine.position_secs(), 30.0);

        engine.seek(500.0).unwrap();
        assert_eq!(output.state.borrow().position, Duration::from_secs(100));
        assert!(!engine.is_seeking());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::default();
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);

        engine.load(&track_in(&dir, 1, "a.mp3")).unwrap();
        engine.play();
        let stale = output.state.borrow().pending.clone().unwrap();

        engine.load(&track_in(&dir, 2, "b.mp3")).unwrap();
        engine.play();
        stale.fire();
        assert!(!engine.poll_completion());
        assert!(engine.is_playing());

        output.finish();
        assert!(engine.poll_completion());
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.loaded_track(), Some(2));
    }

    #[test]
    fn test_unopenable_file_unloads_previous_track() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::default();
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);
        engine.load(&track_in(&dir, 1, "a.mp3")).unwrap();
        engine.play();
        let old = output.state.borrow().pending.clone().unwrap();

        let corrupt = track_in(&dir, 2, "corrupt.mp3");
        output.reject(&corrupt.file_path);
        let err = engine.load(&corrupt).unwrap_err();
        assert!(matches!(err, PlaybackError::Open { .. }));
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.loaded_track(), None);
        assert!(!engine.play());

        old.fire();
        assert!(!engine.poll_completion());
    }

    #[test]
    fn test_seek_far_past_unknown_duration_is_an_error() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::default();
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);
        let mut track = track_in(&dir, 1, "a.mp3");
        track.duration_ms = None;
        engine.load(&track).unwrap();
        engine.play();
        assert_eq!(engine.duration_secs(), 0.0);

        let err = engine.seek(1e20).unwrap_err();
        assert!(matches!(err, PlaybackError::Seek(_)));
        assert!(!engine.is_seeking());
        assert!(output.state.borrow().seeks.is_empty());

        engine.seek(75.0).unwrap();
        assert_eq!(engine.position_secs(), 75.0);
    }

    #[test]
    fn test_unload_forgets_track() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::with_duration(100);
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);
        engine.load(&track_in(&dir, 1, "a.mp3")).unwrap();
        engine.play();

        engine.unload();
        assert_eq!(engine.loaded_track(), None);
        assert_eq!(engine.duration_secs(), 0.0);
        assert!(!output.state.borrow().playing);
        assert!(!engine.play());
    }

    #[test]
    fn test_volume_is_clamped() {
        let output = FakeOutput::default();
        let mut engine = PlaybackEngine::new(output.clone(), 3.0);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(-1.0);
        assert_eq!(output.state.borrow().volume, 0.0);
    }
}
