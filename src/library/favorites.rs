// Keeps favorite flags, the Favorites playlist and the in-memory library in step
use std::collections::HashSet;

use crate::db::models::{Playlist, TrackId, UserId};
use crate::db::store::LibraryStore;
use crate::error::{StoreError, StoreResult};
use crate::library::collection::TrackLibrary;

#[derive(Debug)]
pub struct FavoritesSync {
    user_id: UserId,
    favorites: Option<Playlist>,
}

impl FavoritesSync {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            favorites: None,
        }
    }

    /// The Favorites playlist, if it has been looked up already
    pub fn playlist(&self) -> Option<&Playlist> {
        self.favorites.as_ref()
    }

    /// Mark every library track from persisted Favorites membership
    pub fn hydrate<S: LibraryStore>(&mut self, store: &S, library: &mut TrackLibrary) -> StoreResult<()> {
        let playlist_id = self.favorites_id(store)?;
        let favorite_ids: HashSet<TrackId> = store
            .fetch_playlist(playlist_id)?
            .into_iter()
            .map(|t| t.id)
            .collect();

        for id in library.ids() {
            library.apply_favorite(id, favorite_ids.contains(&id));
        }
        tracing::debug!(count = favorite_ids.len(), "hydrated favorites");
        Ok(())
    }

    /// Flip a track's favorite flag.
    ///
    /// The local flag changes first so the UI reacts immediately; the membership row
    /// is then written to match. On success the persisted flag is committed on the
    /// library copy. On failure the local flag is rolled back and the error returned.
    pub fn toggle<S: LibraryStore>(
        &mut self,
        store: &S,
        library: &mut TrackLibrary,
        track_id: TrackId,
    ) -> StoreResult<bool> {
        let desired = library
            .get_mut(track_id)
            .map(|track| track.toggle_local_favorite())
            .ok_or_else(|| StoreError::NotFound(format!("track {track_id}")))?;

        match self.persist(store, track_id, desired) {
            Ok(()) => {
                library.apply_favorite(track_id, desired);
                tracing::info!(track_id, favorite = desired, "favorite updated");
                Ok(desired)
            }
            Err(e) => {
                if let Some(track) = library.get_mut(track_id) {
                    track.rollback_local_favorite();
                }
                tracing::warn!(track_id, "favorite update failed, rolled back: {e}");
                Err(e)
            }
        }
    }

    fn persist<S: LibraryStore>(&mut self, store: &S, track_id: TrackId, favorite: bool) -> StoreResult<()> {
        let playlist_id = self.favorites_id(store)?;
        let member = store.is_member(playlist_id, track_id)?;

        match (favorite, member) {
            (true, false) => store.add_membership(playlist_id, track_id),
            (false, true) => store.remove_membership(playlist_id, track_id),
            _ => Ok(()),
        }
    }

    fn favorites_id<S: LibraryStore>(&mut self, store: &S) -> StoreResult<i64> {
        if let Some(playlist) = &self.favorites {
            return Ok(playlist.id);
        }
        let playlist = store.fetch_or_create_favorites(self.user_id)?;
        let id = playlist.id;
        self.favorites = Some(playlist);
        Ok(id)
    }
}
