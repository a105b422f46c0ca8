// Playback session: the queue snapshot and cursor the sequencer works on
use crate::db::models::TrackId;
use crate::queue::sequencer::RepeatMode;

#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    queue: Vec<TrackId>,
    current_index: Option<usize>,
    shuffle: bool,
    repeat: RepeatMode,
}

impl PlaybackSession {
    pub fn new(shuffle: bool, repeat: RepeatMode) -> Self {
        Self {
            shuffle,
            repeat,
            ..Self::default()
        }
    }

    /// Replace the queue and point at `start`, clamped into range.
    /// An empty queue leaves no current index.
    pub fn load(&mut self, queue: Vec<TrackId>, start: usize) -> Option<usize> {
        self.current_index = if queue.is_empty() {
            None
        } else {
            Some(start.min(queue.len() - 1))
        };
        self.queue = queue;
        self.current_index
    }

    pub fn queue(&self) -> &[TrackId] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<TrackId> {
        self.current_index.and_then(|i| self.track_at(i))
    }

    pub fn track_at(&self, index: usize) -> Option<TrackId> {
        self.queue.get(index).copied()
    }

    /// Move the cursor. Out-of-range indices are ignored.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index < self.queue.len() {
            self.current_index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }
}
