// In-memory track library: exactly one copy of every track, views hold ids
use std::collections::HashMap;

use crate::db::models::{Track, TrackId};

#[derive(Debug, Default)]
pub struct TrackLibrary {
    tracks: Vec<Track>,
    positions: HashMap<TrackId, usize>,
}

impl TrackLibrary {
    /// Replace the whole library with a fresh fetch from storage
    pub fn replace_all(&mut self, tracks: Vec<Track>) -> Vec<TrackId> {
        self.tracks.clear();
        self.positions.clear();
        self.merge(tracks)
    }

    /// Upsert fetched tracks and return their ids in fetch order.
    /// Flags already held in memory win over the freshly fetched row.
    pub fn merge(&mut self, tracks: Vec<Track>) -> Vec<TrackId> {
        let mut ids = Vec::with_capacity(tracks.len());
        for track in tracks {
            ids.push(track.id);
            match self.positions.get(&track.id) {
                Some(&pos) => {
                    let held = &mut self.tracks[pos];
                    let (favorite, local, playing) =
                        (held.is_favorite, held.is_favorite_local, held.is_now_playing);
                    *held = Track {
                        is_favorite: favorite,
                        is_favorite_local: local,
                        is_now_playing: playing,
                        ..track
                    };
                }
                None => {
                    self.positions.insert(track.id, self.tracks.len());
                    self.tracks.push(track);
                }
            }
        }
        ids
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.positions.get(&id).map(|&pos| &self.tracks[pos])
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.positions.get(&id).map(|&pos| &mut self.tracks[pos])
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Highlight the playing track; every other row is cleared
    pub fn mark_now_playing(&mut self, id: Option<TrackId>) {
        for track in &mut self.tracks {
            track.is_now_playing = Some(track.id) == id;
        }
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.is_now_playing)
    }

    /// Commit a persisted favorite flag. Returns false for unknown ids.
    pub fn apply_favorite(&mut self, id: TrackId, is_favorite: bool) -> bool {
        match self.get_mut(id) {
            Some(track) => {
                track.set_favorite(is_favorite);
                true
            }
            None => false,
        }
    }

    /// Case-insensitive substring match on title, artist and genre
    pub fn search(&self, query: &str) -> Vec<TrackId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.ids();
        }

        let matches = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
        self.tracks
            .iter()
            .filter(|t| {
                matches(Some(&t.title)) || matches(t.artist.as_deref()) || matches(t.genre.as_deref())
            })
            .map(|t| t.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: TrackId, title: &str, artist: &str, genre: &str) -> Track {
        Track {
            id,
            title: title.to_string(),
            artist: Some(artist.to_string()),
            genre: Some(genre.to_string()),
            ..Track::default()
        }
    }

    #[test]
    fn test_merge_keeps_one_copy_and_local_flags() {
        let mut library = TrackLibrary::default();
        library.replace_all(vec![track(1, "Halo", "Low", "Slowcore")]);
        library.apply_favorite(1, true);

        let ids = library.merge(vec![track(2, "Plastic Cup", "Low", "Rock"), track(1, "Halo (remaster)", "Low", "Slowcore")]);
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(library.len(), 2);

        let halo = library.get(1).unwrap();
        assert_eq!(halo.title, "Halo (remaster)");
        assert!(halo.is_favorite && halo.is_favorite_local);
    }

    #[test]
    fn test_now_playing_is_exclusive() {
        let mut library = TrackLibrary::default();
        library.replace_all((1..=4).map(|id| track(id, "t", "a", "g")).collect());

        library.mark_now_playing(Some(3));
        library.mark_now_playing(Some(2));
        let playing: Vec<_> = library.iter().filter(|t| t.is_now_playing).map(|t| t.id).collect();
        assert_eq!(playing, vec![2]);

        library.mark_now_playing(None);
        assert!(library.now_playing().is_none());
    }

    #[test]
    fn test_search_matches_title_artist_and_genre() {
        let mut library = TrackLibrary::default();
        library.replace_all(vec![
            track(1, "Lullaby", "Low", "Slowcore"),
            track(2, "Windowlicker", "Aphex Twin", "IDM"),
            track(3, "Slow Show", "The National", "Indie"),
        ]);

        assert_eq!(library.search("SLOW"), vec![1, 3]);
        assert_eq!(library.search("aphex"), vec![2]);
        assert_eq!(library.search("idm"), vec![2]);
        assert_eq!(library.search("  ").len(), 3);
    }
}
