use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scanner for finding audio files in a directory tree
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Audio files under `directory` whose extension is in `extensions` (case-insensitive),
    /// sorted by path. With `recursive` off only the top level is read.
    pub fn scan<P: AsRef<Path>>(directory: P, extensions: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            bail!("{} is not a directory", directory.display());
        }

        let walker = WalkDir::new(directory).follow_links(false);
        let walker = if recursive { walker } else { walker.max_depth(1) };

        let mut audio_files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| Self::has_extension(path, extensions))
            .collect();

        audio_files.sort();
        tracing::info!(dir = %directory.display(), found = audio_files.len(), "scanned directory");
        Ok(audio_files)
    }

    fn has_extension(path: &Path, extensions: &[String]) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }
}
