// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::position::DEFAULT_POSITION_EPSILON_SECS;
use crate::queue::sequencer::DEFAULT_PREVIOUS_THRESHOLD_SECS;
use crate::queue::RepeatMode;

/// Who is signed in for this data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub username: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            username: "default".to_string(),
        }
    }
}

/// Where the music lives and which files count as audio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub music_dir: Option<PathBuf>,
    pub recursive: bool,
    pub extensions: Vec<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            music_dir: dirs::audio_dir(),
            recursive: true,
            extensions: ["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub volume: f32, // 0.0-1.0
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub previous_threshold_secs: f64,
    pub position_epsilon_secs: f64,
    pub tick_rate_hz: u32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 0.5,
            shuffle: false,
            repeat: RepeatMode::None,
            previous_threshold_secs: DEFAULT_PREVIOUS_THRESHOLD_SECS,
            position_epsilon_secs: DEFAULT_POSITION_EPSILON_SECS,
            tick_rate_hz: 60,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub user: UserSettings,
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            user: UserSettings::default(),
            library: LibrarySettings::default(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            tracing::info!("no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = AppSettings::load(dir.path()).unwrap();
        assert_eq!(settings.playback.volume, 0.5);
        assert_eq!(settings.playback.previous_threshold_secs, 10.0);
        assert_eq!(settings.playback.tick_rate_hz, 60);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            AppSettings::get_settings_path(dir.path()),
            r#"{ "playback": { "repeat": "all", "volume": 0.8 } }"#,
        )
        .unwrap();

        let settings = AppSettings::load(dir.path()).unwrap();
        assert_eq!(settings.playback.repeat, RepeatMode::All);
        assert_eq!(settings.playback.volume, 0.8);
        assert!(!settings.playback.shuffle);
        assert_eq!(settings.user.username, "default");
        assert!(settings.library.recursive);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("melodeck");

        let mut settings = AppSettings::default();
        settings.user.username = "ada".to_string();
        settings.playback.shuffle = true;
        settings.save(&nested).unwrap();

        let loaded = AppSettings::load(&nested).unwrap();
        assert_eq!(loaded.user.username, "ada");
        assert!(loaded.playback.shuffle);
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(AppSettings::get_settings_path(dir.path()), "not json").unwrap();
        assert!(AppSettings::load(dir.path()).is_err());
    }
}
