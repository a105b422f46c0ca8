// Audio output using rodio
// One OS output stream, one sink per loaded track

use rodio::source::EmptyCallback;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::error::PlaybackError;

/// Handed to the output on every open; fired from the audio thread when the
/// track runs out. Tagged with the engine's load generation so the owner can
/// tell a stale signal from a live one.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    generation: u64,
    tx: Sender<u64>,
}

impl CompletionSignal {
    pub fn new(generation: u64, tx: Sender<u64>) -> Self {
        Self { generation, tx }
    }

    pub fn fire(&self) {
        // The receiver only goes away when the engine is dropped
        let _ = self.tx.send(self.generation);
    }
}

/// The single OS-level sink the playback engine drives.
pub trait AudioOutput {
    /// Open `path` paused at position 0. Returns the decoded duration when known.
    fn open(&mut self, path: &Path, on_complete: CompletionSignal) -> Result<Option<Duration>, PlaybackError>;

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;

    fn position(&self) -> Duration;

    /// 0.0 to 1.0
    fn set_volume(&mut self, volume: f32);
}

pub struct RodioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioOutput {
    /// Create an output on the default device
    pub fn new() -> Result<Self, PlaybackError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| PlaybackError::Output(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            handle,
            sink: None,
            volume: 1.0,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn open(&mut self, path: &Path, on_complete: CompletionSignal) -> Result<Option<Duration>, PlaybackError> {
        self.stop();

        let open_error = |reason: String| PlaybackError::Open {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_error(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| open_error(e.to_string()))?;
        let duration = source.total_duration();

        let sink = Sink::try_new(&self.handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(source);
        sink.append(EmptyCallback::<f32>::new(Box::new(move || on_complete.fire())));

        self.sink = Some(sink);
        Ok(duration)
    }

    fn play(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        match self.sink.as_ref() {
            Some(sink) => sink
                .try_seek(position)
                .map_err(|e| PlaybackError::Seek(e.to_string())),
            None => Ok(()),
        }
    }

    fn position(&self) -> Duration {
        self.sink.as_ref().map(|s| s.get_pos()).unwrap_or_default()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.volume);
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-process stand-in for the OS sink.

    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub(crate) struct FakeState {
        pub opened: Vec<PathBuf>,
        pub position: Duration,
        pub playing: bool,
        pub volume: f32,
        pub seeks: Vec<Duration>,
        pub duration: Option<Duration>,
        pub pending: Option<CompletionSignal>,
        pub rejected: Vec<PathBuf>,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeOutput {
        pub state: Rc<RefCell<FakeState>>,
    }

    impl FakeOutput {
        pub fn with_duration(secs: u64) -> Self {
            let output = Self::default();
            output.state.borrow_mut().duration = Some(Duration::from_secs(secs));
            output
        }

        /// Pretend the audio thread reached the end of the current track
        pub fn finish(&self) {
            if let Some(signal) = self.state.borrow().pending.as_ref() {
                signal.fire();
            }
        }

        pub fn set_position(&self, secs: f64) {
            self.state.borrow_mut().position = Duration::from_secs_f64(secs);
        }

        /// Make `open` fail for this path, like an undecodable file
        pub fn reject(&self, path: impl Into<PathBuf>) {
            self.state.borrow_mut().rejected.push(path.into());
        }

        pub fn opened_count(&self) -> usize {
            self.state.borrow().opened.len()
        }
    }

    impl AudioOutput for FakeOutput {
        fn open(&mut self, path: &Path, on_complete: CompletionSignal) -> Result<Option<Duration>, PlaybackError> {
            let mut state = self.state.borrow_mut();
            state.playing = false;
            state.pending = None;
            if state.rejected.iter().any(|p| p == path) {
                return Err(PlaybackError::Open {
                    path: path.to_path_buf(),
                    reason: "unsupported format".to_string(),
                });
            }
            state.opened.push(path.to_path_buf());
            state.position = Duration::ZERO;
            state.playing = false;
            state.pending = Some(on_complete);
            Ok(state.duration)
        }

        fn play(&mut self) {
            self.state.borrow_mut().playing = true;
        }

        fn pause(&mut self) {
            self.state.borrow_mut().playing = false;
        }

        fn stop(&mut self) {
            let mut state = self.state.borrow_mut();
            state.playing = false;
            state.pending = None;
        }

        fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
            let mut state = self.state.borrow_mut();
            state.seeks.push(position);
            state.position = position;
            Ok(())
        }

        fn position(&self) -> Duration {
            self.state.borrow().position
        }

        fn set_volume(&mut self, volume: f32) {
            self.state.borrow_mut().volume = volume;
        }
    }
}
