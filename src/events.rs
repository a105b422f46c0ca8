// State changes published to whatever UI is attached
use serde::Serialize;
use std::collections::VecDeque;

use crate::audio::engine::PlaybackState;
use crate::audio::position::PositionUpdate;
use crate::db::models::TrackId;
use crate::queue::RepeatMode;

/// One change, keyed by the identity of the entity it is about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PlayerEvent {
    TrackChanged { track_id: TrackId, index: usize },
    StateChanged(PlaybackState),
    Position(PositionUpdate),
    QueueFinished,
    ShuffleChanged(bool),
    RepeatChanged(RepeatMode),
    VolumeChanged(f32),
    FavoriteChanged { track_id: TrackId, is_favorite: bool },
    /// Non-fatal message for the user
    Notice(String),
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<PlayerEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: PlayerEvent) {
        self.pending.push_back(event);
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.push(PlayerEvent::Notice(message.into()));
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PlayerEvent> + '_ {
        self.pending.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
