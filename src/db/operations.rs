use rusqlite::{params, OptionalExtension, Row};

use crate::db::connection::DatabaseConnection;
use crate::db::models::{
    Playlist, PlaylistId, Track, TrackId, User, UserId, FAVORITES_PLAYLIST_NAME,
};
use crate::error::{StoreError, StoreResult};

const TRACK_SELECT: &str = "SELECT t.id, t.title, t.artist_id, ar.name, t.album_id, al.title,
        t.file_path, t.duration_ms, t.genre, t.year, t.date_added
     FROM tracks t
     INNER JOIN artists ar ON ar.id = t.artist_id
     INNER JOIN albums al ON al.id = t.album_id";

const PLAYLIST_SELECT: &str = "SELECT p.id, p.name, p.user_id, p.created_at,
        (SELECT COUNT(*) FROM playlist_tracks pt WHERE pt.playlist_id = p.id)
     FROM playlists p";

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        artist_id: row.get(2)?,
        artist: row.get(3)?,
        album_id: row.get(4)?,
        album: row.get(5)?,
        file_path: row.get(6)?,
        duration_ms: row.get(7)?,
        genre: row.get(8)?,
        year: row.get::<_, Option<i64>>(9)?.map(|y| y as u32),
        date_added: row.get(10)?,
        ..Track::default()
    })
}

fn playlist_from_row(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
        track_count: row.get(4)?,
    })
}

/// Database operations for library management
pub struct DbOperations;

impl DbOperations {
    /// Look up a user by name, creating the row on first use
    pub fn get_or_create_user(db: &DatabaseConnection, username: &str) -> StoreResult<User> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let existing = conn
            .query_row(
                "SELECT id, username, email FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;

        if let Some(user) = existing {
            return Ok(user);
        }

        conn.execute("INSERT INTO users (username) VALUES (?1)", params![username])?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: None,
        })
    }

    /// Insert or get artist ID
    pub fn insert_or_get_artist(db: &DatabaseConnection, name: &str) -> StoreResult<i64> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let existing = conn
            .query_row(
                "SELECT id FROM artists WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute("INSERT INTO artists (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert or get album ID; albums are unique per (title, artist)
    pub fn insert_or_get_album(
        db: &DatabaseConnection,
        title: &str,
        artist_id: i64,
        year: Option<u32>,
    ) -> StoreResult<i64> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let existing = conn
            .query_row(
                "SELECT id FROM albums WHERE title = ?1 AND artist_id = ?2",
                params![title, artist_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO albums (title, artist_id, year) VALUES (?1, ?2, ?3)",
            params![title, artist_id, year.map(|y| y as i64)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn track_exists(db: &DatabaseConnection, file_path: &str) -> StoreResult<bool> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tracks WHERE file_path = ?1)",
            params![file_path],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a track; `artist_id` and `album_id` must already exist
    pub fn insert_track(db: &DatabaseConnection, track: &Track) -> StoreResult<TrackId> {
        let conn = db.get_connection();
        let conn = conn.lock();

        conn.execute(
            "INSERT INTO tracks (
                title, artist_id, album_id, file_path, duration_ms, genre, year, date_added
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                track.title,
                track.artist_id,
                track.album_id,
                track.file_path,
                track.duration_ms,
                track.genre,
                track.year.map(|y| y as i64),
                track.date_added,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get all tracks
    pub fn get_all_tracks(db: &DatabaseConnection) -> StoreResult<Vec<Track>> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(&format!("{TRACK_SELECT} ORDER BY ar.name, al.title, t.title"))?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tracks)
    }

    pub fn get_track(db: &DatabaseConnection, track_id: TrackId) -> StoreResult<Option<Track>> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let track = conn
            .query_row(
                &format!("{TRACK_SELECT} WHERE t.id = ?1"),
                params![track_id],
                track_from_row,
            )
            .optional()?;
        Ok(track)
    }

    /// Tracks of a playlist, ordered by their explicit position
    pub fn get_playlist_tracks(
        db: &DatabaseConnection,
        playlist_id: PlaylistId,
    ) -> StoreResult<Vec<Track>> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(&format!(
            "{TRACK_SELECT}
             INNER JOIN playlist_tracks pt ON pt.track_id = t.id
             WHERE pt.playlist_id = ?1
             ORDER BY pt.position"
        ))?;
        let tracks = stmt
            .query_map(params![playlist_id], track_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tracks)
    }

    pub fn get_playlists(db: &DatabaseConnection, user_id: UserId) -> StoreResult<Vec<Playlist>> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(&format!(
            "{PLAYLIST_SELECT} WHERE p.user_id = ?1 ORDER BY p.created_at, p.id"
        ))?;
        let playlists = stmt
            .query_map(params![user_id], playlist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(playlists)
    }

    pub fn get_playlist(
        db: &DatabaseConnection,
        playlist_id: PlaylistId,
    ) -> StoreResult<Option<Playlist>> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let playlist = conn
            .query_row(
                &format!("{PLAYLIST_SELECT} WHERE p.id = ?1"),
                params![playlist_id],
                playlist_from_row,
            )
            .optional()?;
        Ok(playlist)
    }

    pub fn get_playlist_by_name(
        db: &DatabaseConnection,
        user_id: UserId,
        name: &str,
    ) -> StoreResult<Option<Playlist>> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let playlist = conn
            .query_row(
                &format!("{PLAYLIST_SELECT} WHERE p.user_id = ?1 AND p.name = ?2"),
                params![user_id, name],
                playlist_from_row,
            )
            .optional()?;
        Ok(playlist)
    }

    pub fn create_playlist(
        db: &DatabaseConnection,
        user_id: UserId,
        name: &str,
    ) -> StoreResult<Playlist> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let created_at = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO playlists (name, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![name, user_id, created_at],
        )?;

        Ok(Playlist {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            user_id,
            created_at,
            track_count: 0,
        })
    }

    /// The user's Favorites playlist, created lazily
    pub fn get_or_create_favorites(db: &DatabaseConnection, user_id: UserId) -> StoreResult<Playlist> {
        if let Some(playlist) = Self::get_playlist_by_name(db, user_id, FAVORITES_PLAYLIST_NAME)? {
            return Ok(playlist);
        }
        tracing::info!(user_id, "creating favorites playlist");
        Self::create_playlist(db, user_id, FAVORITES_PLAYLIST_NAME)
    }

    /// Append a track at the end of a playlist. Returns false if it was already a member.
    pub fn add_track_to_playlist(
        db: &DatabaseConnection,
        playlist_id: PlaylistId,
        track_id: TrackId,
    ) -> StoreResult<bool> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let known: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tracks WHERE id = ?1)",
            params![track_id],
            |row| row.get(0),
        )?;
        if !known {
            return Err(StoreError::NotFound(format!("track {track_id}")));
        }

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO playlist_tracks (playlist_id, track_id, position, date_added)
             VALUES (
                ?1, ?2,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_tracks WHERE playlist_id = ?1),
                ?3
             )",
            params![playlist_id, track_id, chrono::Utc::now().timestamp()],
        )?;

        Ok(inserted > 0)
    }

    /// Returns false if the track was not a member
    pub fn remove_track_from_playlist(
        db: &DatabaseConnection,
        playlist_id: PlaylistId,
        track_id: TrackId,
    ) -> StoreResult<bool> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let removed = conn.execute(
            "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2",
            params![playlist_id, track_id],
        )?;
        Ok(removed > 0)
    }

    pub fn is_track_in_playlist(
        db: &DatabaseConnection,
        playlist_id: PlaylistId,
        track_id: TrackId,
    ) -> StoreResult<bool> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let member = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2)",
            params![playlist_id, track_id],
            |row| row.get(0),
        )?;
        Ok(member)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Insert a track with its artist and album into a fresh row set
    pub(crate) fn seed_track(db: &DatabaseConnection, title: &str, artist: &str, path: &str) -> TrackId {
        let artist_id = DbOperations::insert_or_get_artist(db, artist).unwrap();
        let album_id = DbOperations::insert_or_get_album(db, "Without Album", artist_id, None).unwrap();
        DbOperations::insert_track(
            db,
            &Track {
                title: title.to_string(),
                artist_id,
                album_id,
                file_path: path.to_string(),
                duration_ms: Some(180_000),
                genre: Some("Rock".to_string()),
                ..Track::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_artist_and_album_are_deduplicated() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let a = DbOperations::insert_or_get_artist(&db, "Low").unwrap();
        let b = DbOperations::insert_or_get_artist(&db, "Low").unwrap();
        assert_eq!(a, b);

        let x = DbOperations::insert_or_get_album(&db, "Things We Lost", a, Some(2001)).unwrap();
        let y = DbOperations::insert_or_get_album(&db, "Things We Lost", a, None).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_tracks_join_artist_and_album_names() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let id = seed_track(&db, "Sunflower", "Low", "/music/sunflower.mp3");

        let track = DbOperations::get_track(&db, id).unwrap().unwrap();
        assert_eq!(track.artist.as_deref(), Some("Low"));
        assert_eq!(track.album.as_deref(), Some("Without Album"));
        assert!(DbOperations::track_exists(&db, "/music/sunflower.mp3").unwrap());
        assert!(!DbOperations::track_exists(&db, "/music/other.mp3").unwrap());
    }

    #[test]
    fn test_playlist_tracks_keep_insertion_order() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let user = DbOperations::get_or_create_user(&db, "ada").unwrap();
        let first = seed_track(&db, "B side", "Low", "/b.mp3");
        let second = seed_track(&db, "A side", "Low", "/a.mp3");

        let playlist = DbOperations::create_playlist(&db, user.id, "Road").unwrap();
        assert!(DbOperations::add_track_to_playlist(&db, playlist.id, first).unwrap());
        assert!(DbOperations::add_track_to_playlist(&db, playlist.id, second).unwrap());
        assert!(!DbOperations::add_track_to_playlist(&db, playlist.id, first).unwrap());

        let titles: Vec<_> = DbOperations::get_playlist_tracks(&db, playlist.id)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["B side", "A side"]);

        let listed = DbOperations::get_playlists(&db, user.id).unwrap();
        assert_eq!(listed[0].track_count, 2);
    }

    #[test]
    fn test_adding_unknown_track_is_not_found() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let user = DbOperations::get_or_create_user(&db, "ada").unwrap();
        let playlist = DbOperations::create_playlist(&db, user.id, "Road").unwrap();

        let err = DbOperations::add_track_to_playlist(&db, playlist.id, 42).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_favorites_playlist_is_created_once() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let user = DbOperations::get_or_create_user(&db, "ada").unwrap();

        let first = DbOperations::get_or_create_favorites(&db, user.id).unwrap();
        let second = DbOperations::get_or_create_favorites(&db, user.id).unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.is_favorites());
        assert_eq!(DbOperations::get_playlists(&db, user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_user_lookup_is_stable() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let a = DbOperations::get_or_create_user(&db, "ada").unwrap();
        let b = DbOperations::get_or_create_user(&db, "ada").unwrap();
        assert_eq!(a, b);
    }
}
