// Republishes the engine position at frame cadence
use serde::Serialize;

use crate::audio::engine::PlaybackEngine;
use crate::audio::output::AudioOutput;
use crate::error::PlaybackError;

/// Smallest position change worth telling observers about
pub const DEFAULT_POSITION_EPSILON_SECS: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionUpdate {
    pub position_secs: f64,
    pub duration_secs: f64,
}

/// Ticked by the host frame loop. Publishes only when the position moved by more
/// than epsilon, and stays quiet while the user drags the seek control.
#[derive(Debug, Clone)]
pub struct PositionReporter {
    epsilon: f64,
    last_position: f64,
    last_duration: f64,
    dragging: bool,
}

impl Default for PositionReporter {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION_EPSILON_SECS)
    }
}

impl PositionReporter {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.max(0.0),
            last_position: 0.0,
            last_duration: 0.0,
            dragging: false,
        }
    }

    pub fn tick<O: AudioOutput>(&mut self, engine: &PlaybackEngine<O>) -> Option<PositionUpdate> {
        if self.dragging || !engine.is_playing() || engine.is_seeking() {
            return None;
        }

        let position = engine.position_secs();
        let duration = engine.duration_secs();
        let moved = (position - self.last_position).abs() > self.epsilon;
        if !moved && duration == self.last_duration {
            return None;
        }

        Some(self.publish(position, duration))
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Release the seek control: one authoritative seek, then reporting resumes from there
    pub fn end_drag<O: AudioOutput>(
        &mut self,
        engine: &mut PlaybackEngine<O>,
        position_secs: f64,
    ) -> Result<PositionUpdate, PlaybackError> {
        self.dragging = false;
        engine.seek(position_secs)?;
        Ok(self.publish(engine.position_secs(), engine.duration_secs()))
    }

    /// Forget the last published value, e.g. after a track change
    pub fn reset<O: AudioOutput>(&mut self, engine: &PlaybackEngine<O>) -> PositionUpdate {
        self.publish(0.0, engine.duration_secs())
    }

    fn publish(&mut self, position_secs: f64, duration_secs: f64) -> PositionUpdate {
        self.last_position = position_secs;
        self.last_duration = duration_secs;
        PositionUpdate {
            position_secs,
            duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::fake::FakeOutput;
    use crate::db::models::Track;
    use tempfile::TempDir;

    fn playing_engine(dir: &TempDir, output: &FakeOutput) -> PlaybackEngine<FakeOutput> {
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"").unwrap();
        let mut engine = PlaybackEngine::new(output.clone(), 0.5);
        engine
            .load(&Track {
                id: 1,
                file_path: path.to_string_lossy().to_string(),
                ..Track::default()
            })
            .unwrap();
        engine.play();
        engine
    }

    #[test]
    fn test_small_drift_is_not_published() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::with_duration(180);
        let engine = playing_engine(&dir, &output);
        let mut reporter = PositionReporter::default();

        output.set_position(1.0);
        assert!(reporter.tick(&engine).is_some());

        for _ in 0..100 {
            output.set_position(1.04);
            assert_eq!(reporter.tick(&engine), None);
        }

        output.set_position(1.2);
        let update = reporter.tick(&engine).unwrap();
        assert_eq!(update.position_secs, 1.2);
        assert_eq!(update.duration_secs, 180.0);
    }

    #[test]
    fn test_dragging_suspends_reporting_until_release() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::with_duration(180);
        let mut engine = playing_engine(&dir, &output);
        let mut reporter = PositionReporter::default();

        reporter.begin_drag();
        output.set_position(5.0);
        assert_eq!(reporter.tick(&engine), None);

        let released = reporter.end_drag(&mut engine, 90.0).unwrap();
        assert_eq!(released.position_secs, 90.0);
        assert!(!reporter.is_dragging());
        assert_eq!(reporter.tick(&engine), None);

        output.set_position(91.0);
        assert!(reporter.tick(&engine).is_some());
    }

    #[test]
    fn test_paused_engine_is_silent() {
        let dir = TempDir::new().unwrap();
        let output = FakeOutput::with_duration(180);
        let mut engine = playing_engine(&dir, &output);
        let mut reporter = PositionReporter::default();

        output.set_position(12.0);
        engine.pause();
        output.set_position(30.0);
        assert_eq!(reporter.tick(&engine), None);
    }
}
