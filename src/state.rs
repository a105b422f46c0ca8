// Application state management
use std::collections::HashSet;

use crate::audio::output::AudioOutput;
use crate::audio::player::PlayerController;
use crate::db::models::{PlaylistId, Track, TrackId, User};
use crate::db::store::LibraryStore;
use crate::events::{EventQueue, PlayerEvent};
use crate::library::collection::TrackLibrary;
use crate::library::favorites::FavoritesSync;

/// Who is using the app; passed in instead of living in a global
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
}

/// What the track list currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryView {
    All,
    Playlist(PlaylistId),
}

pub struct AppState<S: LibraryStore, O: AudioOutput> {
    pub context: SessionContext,
    store: S,
    library: TrackLibrary,
    view: LibraryView,
    view_ids: Vec<TrackId>,
    displayed: Vec<TrackId>,
    favorites: FavoritesSync,
    player: PlayerController<O>,
    events: EventQueue,
}

impl<S: LibraryStore, O: AudioOutput> AppState<S, O> {
    pub fn new(context: SessionContext, store: S, player: PlayerController<O>) -> Self {
        let favorites = FavoritesSync::new(context.user.id);
        Self {
            context,
            store,
            library: TrackLibrary::default(),
            view: LibraryView::All,
            view_ids: Vec::new(),
            displayed: Vec::new(),
            favorites,
            player,
            events: EventQueue::default(),
        }
    }

    /// Fetch every track and mark favorites. Failure leaves the old library in place.
    pub fn load_library(&mut self) -> bool {
        let tracks = match self.store.fetch_all_tracks() {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::warn!("failed to load library: {e}");
                self.events.notice(format!("Could not load the library: {e}"));
                return false;
            }
        };

        self.library.replace_all(tracks);
        if let Err(e) = self.favorites.hydrate(&self.store, &mut self.library) {
            tracing::warn!("failed to load favorites: {e}");
            self.events.notice(format!("Could not load favorites: {e}"));
        }
        tracing::info!(tracks = self.library.len(), "library loaded");
        self.show_all();
        true
    }

    pub fn show_all(&mut self) {
        self.set_view(LibraryView::All, self.library.ids());
    }

    pub fn show_playlist(&mut self, playlist_id: PlaylistId) -> bool {
        match self.store.fetch_playlist(playlist_id) {
            Ok(tracks) => {
                let ids = self.library.merge(tracks);
                self.set_view(LibraryView::Playlist(playlist_id), ids);
                true
            }
            Err(e) => {
                tracing::warn!(playlist_id, "failed to load playlist: {e}");
                self.events.notice(format!("Could not load playlist {playlist_id}: {e}"));
                false
            }
        }
    }

    /// Narrow the current view to tracks matching `query`; a blank query shows the whole view
    pub fn search(&mut self, query: &str) -> &[TrackId] {
        let hits: HashSet<TrackId> = self.library.search(query).into_iter().collect();
        self.displayed = self
            .view_ids
            .iter()
            .copied()
            .filter(|id| hits.contains(id))
            .collect();
        &self.displayed
    }

    /// Queue the displayed list and start at `track_id`
    pub fn play_track(&mut self, track_id: TrackId) -> bool {
        let (queue, start) = match self.displayed.iter().position(|&id| id == track_id) {
            Some(start) => (self.displayed.clone(), start),
            None => (vec![track_id], 0),
        };
        self.player.play_queue(queue, start, &mut self.library)
    }

    /// Play button with an optional selection: a different selected track starts playing,
    /// otherwise the current track pauses or resumes. With nothing loaded the first
    /// displayed track starts.
    pub fn toggle_play_pause(&mut self, selected: Option<TrackId>) {
        match (selected, self.player.current_track()) {
            (Some(id), current) if current != Some(id) => {
                self.play_track(id);
            }
            (None, None) => {
                if let Some(&first) = self.displayed.first() {
                    self.play_track(first);
                }
            }
            _ => self.player.toggle_play_pause(&mut self.library),
        }
    }

    pub fn next(&mut self) {
        self.player.next(&mut self.library);
    }

    pub fn previous(&mut self) {
        self.player.previous(&mut self.library);
    }

    pub fn toggle_favorite(&mut self, track_id: TrackId) -> bool {
        match self.favorites.toggle(&self.store, &mut self.library, track_id) {
            Ok(is_favorite) => {
                self.events.push(PlayerEvent::FavoriteChanged {
                    track_id,
                    is_favorite,
                });
                let favorites_id = self.favorites.playlist().map(|p| p.id);
                if let (LibraryView::Playlist(shown), Some(favorites_id)) = (self.view, favorites_id) {
                    if shown == favorites_id {
                        self.show_playlist(shown);
                    }
                }
                true
            }
            Err(e) => {
                self.events.notice(format!("Could not update favorites: {e}"));
                false
            }
        }
    }

    pub fn toggle_current_favorite(&mut self) -> bool {
        match self.player.current_track() {
            Some(id) => self.toggle_favorite(id),
            None => false,
        }
    }

    pub fn tick(&mut self) {
        self.player.tick(&mut self.library);
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain().chain(self.player.drain_events()).collect()
    }

    pub fn view(&self) -> LibraryView {
        self.view
    }

    pub fn displayed(&self) -> &[TrackId] {
        &self.displayed
    }

    pub fn displayed_tracks(&self) -> impl Iterator<Item = &Track> {
        self.displayed.iter().filter_map(|&id| self.library.get(id))
    }

    pub fn library(&self) -> &TrackLibrary {
        &self.library
    }

    pub fn player(&self) -> &PlayerController<O> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerController<O> {
        &mut self.player
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn set_view(&mut self, view: LibraryView, ids: Vec<TrackId>) {
        self.view = view;
        self.displayed = ids.clone();
        self.view_ids = ids;
    }
}
