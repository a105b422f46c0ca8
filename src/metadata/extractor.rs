// Tag extraction using lofty with an id3 fallback for problematic MP3 files
use anyhow::{Context, Result};
use id3::TagLike;
use lofty::file::TaggedFile;
use lofty::picture::PictureType;
use lofty::prelude::{Accessor, AudioFile, ItemKey, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::path::Path;

use crate::metadata::parser::{parse_year, primary_value, title_from_filename};

/// What the indexer needs from a file's tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub duration_ms: Option<i64>,
}

pub struct TagExtractor;

impl TagExtractor {
    /// Read tags from an audio file. Never fails on bad tags, only on an unreadable file:
    /// lofty first, then id3 for MP3s, then just a title from the filename.
    pub fn extract(path: &Path) -> Result<TrackTags> {
        std::fs::metadata(path).with_context(|| format!("Cannot read {}", path.display()))?;

        match Self::read_tagged(path) {
            Ok(tagged) => Ok(Self::from_lofty(path, &tagged)),
            Err(e) => {
                tracing::debug!(path = %path.display(), "lofty could not read tags: {e}");
                Ok(Self::fallback(path))
            }
        }
    }

    /// Embedded front cover, or the first picture of any other type
    pub fn front_cover(path: &Path) -> Result<Option<Vec<u8>>> {
        let tagged = Self::read_tagged(path)
            .with_context(|| format!("Failed to read tags from {}", path.display()))?;

        let pictures: Vec<_> = tagged
            .primary_tag()
            .into_iter()
            .chain(tagged.tags().iter())
            .flat_map(|tag| tag.pictures())
            .collect();

        let cover = pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first())
            .map(|p| p.data().to_vec());
        Ok(cover)
    }

    fn read_tagged(path: &Path) -> Result<TaggedFile> {
        let tagged = Probe::open(path)?.guess_file_type()?.read()?;
        Ok(tagged)
    }

    fn from_lofty(path: &Path, tagged: &TaggedFile) -> TrackTags {
        let tag: Option<&Tag> = tagged.primary_tag().or(tagged.first_tag());
        let duration = tagged.properties().duration();

        let text = |key: ItemKey| tag.and_then(|t| t.get_string(&key).map(str::to_string));

        let year = tag.and_then(|t| t.year()).or_else(|| {
            text(ItemKey::Year)
                .or_else(|| text(ItemKey::RecordingDate))
                .and_then(|raw| parse_year(&raw))
        });

        TrackTags {
            title: tag
                .and_then(|t| t.title().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| title_from_filename(path)),
            artist: tag.and_then(|t| t.artist().and_then(|s| primary_value(&s))),
            album: tag
                .and_then(|t| t.album().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty()),
            genre: tag.and_then(|t| t.genre().and_then(|s| primary_value(&s))),
            year,
            duration_ms: (!duration.is_zero()).then(|| duration.as_millis() as i64),
        }
    }

    fn fallback(path: &Path) -> TrackTags {
        let is_mp3 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));

        if is_mp3 {
            match id3::Tag::read_from_path(path) {
                Ok(tag) => return Self::from_id3(path, &tag),
                Err(e) => tracing::debug!(path = %path.display(), "id3 could not read tags: {e}"),
            }
        }

        TrackTags {
            title: title_from_filename(path),
            ..TrackTags::default()
        }
    }

    fn from_id3(path: &Path, tag: &id3::Tag) -> TrackTags {
        TrackTags {
            title: tag
                .title()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| title_from_filename(path)),
            artist: tag.artist().and_then(primary_value),
            album: tag.album().map(str::to_string),
            genre: tag.genre_parsed().and_then(|g| primary_value(&g)),
            year: tag
                .year()
                .or_else(|| tag.date_recorded().map(|d| d.year))
                .and_then(|y| u32::try_from(y).ok())
                .filter(|&y| y > 0),
            // TLEN is stored in milliseconds
            duration_ms: tag.duration().map(i64::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_untagged_file_gets_title_from_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("07 - Sunflower.mp3");
        std::fs::write(&path, b"not really audio").unwrap();

        let tags = TagExtractor::extract(&path).unwrap();
        assert_eq!(tags.title, "Sunflower");
        assert_eq!(tags.artist, None);
        assert_eq!(tags.duration_ms, None);
    }

    #[test]
    fn test_id3_fallback_reads_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("track.mp3");
        std::fs::write(&path, b"").unwrap();

        let mut tag = id3::Tag::new();
        tag.set_title("Lullaby");
        tag.set_artist("Low; Mimi Parker");
        tag.set_year(1994);
        tag.write_to_path(&path, id3::Version::Id3v23).unwrap();

        let tags = TagExtractor::extract(&path).unwrap();
        assert_eq!(tags.title, "Lullaby");
        assert_eq!(tags.artist.as_deref(), Some("Low"));
        assert_eq!(tags.year, Some(1994));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(TagExtractor::extract(Path::new("/no/such/track.flac")).is_err());
    }
}
