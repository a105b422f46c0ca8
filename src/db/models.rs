// Data models
use serde::{Deserialize, Serialize};

pub type TrackId = i64;
pub type PlaylistId = i64;
pub type UserId = i64;

/// Reserved playlist name backing each user's favorite flags
pub const FAVORITES_PLAYLIST_NAME: &str = "Favorites";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_id: i64,
    pub artist: Option<String>,
    pub album_id: i64,
    pub album: Option<String>,
    pub file_path: String,
    pub duration_ms: Option<i64>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub date_added: i64,
    /// Persisted membership in the user's Favorites playlist
    pub is_favorite: bool,
    /// Optimistic flag shown before the store confirms the change
    pub is_favorite_local: bool,
    #[serde(skip)]
    pub is_now_playing: bool,
}

impl Track {
    /// Set the persisted flag; the optimistic flag follows it.
    pub fn set_favorite(&mut self, value: bool) {
        self.is_favorite = value;
        self.is_favorite_local = value;
    }

    /// Flip the optimistic flag and return its new value.
    pub fn toggle_local_favorite(&mut self) -> bool {
        self.is_favorite_local = !self.is_favorite_local;
        self.is_favorite_local
    }

    pub fn rollback_local_favorite(&mut self) {
        self.is_favorite_local = self.is_favorite;
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub artist_id: i64,
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub user_id: UserId,
    pub created_at: i64,
    pub track_count: i64,
}

impl Playlist {
    pub fn is_favorites(&self) -> bool {
        self.name == FAVORITES_PLAYLIST_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_flag_drives_local_flag() {
        let mut track = Track::default();
        track.set_favorite(true);
        assert!(track.is_favorite && track.is_favorite_local);
    }

    #[test]
    fn test_rollback_restores_persisted_value() {
        let mut track = Track::default();
        assert!(track.toggle_local_favorite());
        assert!(!track.is_favorite);
        track.rollback_local_favorite();
        assert!(!track.is_favorite_local);
    }
}
