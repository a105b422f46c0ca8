// The narrow storage contract the player core depends on
use crate::db::connection::DatabaseConnection;
use crate::db::models::{Playlist, PlaylistId, Track, TrackId, UserId};
use crate::db::operations::DbOperations;
use crate::error::StoreResult;

/// Storage operations used by the library view and the favorites synchronizer.
///
/// Every call is synchronous and fallible; failures are reported to the caller and
/// never escalate past the UI boundary.
pub trait LibraryStore {
    fn fetch_all_tracks(&self) -> StoreResult<Vec<Track>>;

    /// Tracks of a playlist ordered by position
    fn fetch_playlist(&self, playlist_id: PlaylistId) -> StoreResult<Vec<Track>>;

    fn fetch_or_create_favorites(&self, user_id: UserId) -> StoreResult<Playlist>;

    fn add_membership(&self, playlist_id: PlaylistId, track_id: TrackId) -> StoreResult<()>;

    fn remove_membership(&self, playlist_id: PlaylistId, track_id: TrackId) -> StoreResult<()>;

    fn is_member(&self, playlist_id: PlaylistId, track_id: TrackId) -> StoreResult<bool>;
}

impl LibraryStore for DatabaseConnection {
    fn fetch_all_tracks(&self) -> StoreResult<Vec<Track>> {
        DbOperations::get_all_tracks(self)
    }

    fn fetch_playlist(&self, playlist_id: PlaylistId) -> StoreResult<Vec<Track>> {
        DbOperations::get_playlist_tracks(self, playlist_id)
    }

    fn fetch_or_create_favorites(&self, user_id: UserId) -> StoreResult<Playlist> {
        DbOperations::get_or_create_favorites(self, user_id)
    }

    fn add_membership(&self, playlist_id: PlaylistId, track_id: TrackId) -> StoreResult<()> {
        DbOperations::add_track_to_playlist(self, playlist_id, track_id).map(|_| ())
    }

    fn remove_membership(&self, playlist_id: PlaylistId, track_id: TrackId) -> StoreResult<()> {
        DbOperations::remove_track_from_playlist(self, playlist_id, track_id).map(|_| ())
    }

    fn is_member(&self, playlist_id: PlaylistId, track_id: TrackId) -> StoreResult<bool> {
        DbOperations::is_track_in_playlist(self, playlist_id, track_id)
    }
}
