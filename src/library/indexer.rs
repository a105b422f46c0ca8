use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::db::connection::DatabaseConnection;
use crate::db::models::Track;
use crate::db::operations::DbOperations;
use crate::metadata::extractor::TagExtractor;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Without Album";

/// Result of an indexing operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingResult {
    pub total_files: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Progress update for indexing
#[derive(Debug, Clone, Serialize)]
pub struct IndexingProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

/// Library indexer for adding tracks to database
pub struct LibraryIndexer;

impl LibraryIndexer {
    /// Index a list of audio files into the database with progress callback.
    /// Files already in the library (by path) are skipped; one bad file never aborts the run.
    pub fn index_files_with_progress<P: AsRef<Path>, F>(
        paths: &[P],
        db: &DatabaseConnection,
        mut progress_callback: F,
    ) -> Result<IndexingResult>
    where
        F: FnMut(IndexingProgress),
    {
        let mut result = IndexingResult {
            total_files: paths.len(),
            ..IndexingResult::default()
        };

        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();

            progress_callback(IndexingProgress {
                current: index + 1,
                total: result.total_files,
                current_file: path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });

            match Self::index_single_file(path, db) {
                Ok(true) => result.added += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to index: {e:#}");
                    result.failed += 1;
                    result.errors.push(format!("{}: {e:#}", path.display()));
                }
            }
        }

        tracing::info!(
            added = result.added,
            skipped = result.skipped,
            failed = result.failed,
            "indexing finished"
        );
        Ok(result)
    }

    /// Returns true if the file was inserted, false if it was already indexed
    fn index_single_file(path: &Path, db: &DatabaseConnection) -> Result<bool> {
        let file_path = path.to_string_lossy().to_string();
        if DbOperations::track_exists(db, &file_path)? {
            return Ok(false);
        }

        let tags = TagExtractor::extract(path)?;

        let artist_name = tags.artist.as_deref().unwrap_or(UNKNOWN_ARTIST);
        let artist_id = DbOperations::insert_or_get_artist(db, artist_name)?;
        let album_title = tags.album.as_deref().unwrap_or(UNKNOWN_ALBUM);
        let album_id = DbOperations::insert_or_get_album(db, album_title, artist_id, tags.year)?;

        let track_id = DbOperations::insert_track(
            db,
            &Track {
                title: tags.title,
                artist_id,
                album_id,
                file_path,
                duration_ms: tags.duration_ms,
                genre: tags.genre,
                year: tags.year,
                date_added: chrono::Utc::now().timestamp(),
                ..Track::default()
            },
        )?;
        tracing::debug!(track_id, path = %path.display(), "indexed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_index_adds_then_skips() {
        let dir = TempDir::new().unwrap();
        let files: Vec<_> = ["01 - Lullaby.mp3", "Halo.flac"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, b"").unwrap();
                path
            })
            .collect();
        let db = DatabaseConnection::open_in_memory().unwrap();

        let mut progress = Vec::new();
        let first = LibraryIndexer::index_files_with_progress(&files, &db, |p| progress.push(p.current)).unwrap();
        assert_eq!(first.added, 2);
        assert_eq!(progress, vec![1, 2]);

        let second = LibraryIndexer::index_files_with_progress(&files, &db, |_| {}).unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 2);

        let tracks = DbOperations::get_all_tracks(&db).unwrap();
        assert_eq!(tracks.len(), 2);
        let lullaby = tracks.iter().find(|t| t.title == "Lullaby").unwrap();
        assert_eq!(lullaby.artist.as_deref(), Some(UNKNOWN_ARTIST));
        assert_eq!(lullaby.album.as_deref(), Some(UNKNOWN_ALBUM));
    }

    #[test]
    fn test_unreadable_file_is_counted_not_fatal() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let result =
            LibraryIndexer::index_files_with_progress(&["/no/such/file.mp3"], &db, |_| {}).unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
    }
}
