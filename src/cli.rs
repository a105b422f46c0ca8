use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::db::models::{PlaylistId, TrackId};
use crate::queue::RepeatMode;

/// melodeck - a music library player for the terminal
#[derive(Parser, Debug)]
#[command(name = "melodeck", version, about)]
pub struct Args {
    /// Data directory holding the database and settings.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Library user (defaults to the one in settings.json)
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Debug logging for melodeck
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index audio files into the library
    Scan {
        /// Directory to scan (defaults to the configured music directory)
        dir: Option<PathBuf>,
    },
    /// List tracks
    Tracks {
        /// Only tracks whose title, artist or genre contain this text
        #[arg(long, short = 's')]
        search: Option<String>,
        /// Only tracks of this playlist, in playlist order
        #[arg(long, short = 'p')]
        playlist: Option<PlaylistId>,
    },
    /// List the user's playlists
    Playlists,
    /// Create playlists and add tracks to them
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },
    /// Toggle a track in the Favorites playlist
    Favorite { track: TrackId },
    /// Write a track's embedded cover art to a file
    Cover { track: TrackId, out: PathBuf },
    /// Play interactively
    Play {
        /// Queue this playlist instead of the whole library
        #[arg(long, short = 'p')]
        playlist: Option<PlaylistId>,
        /// Start at this track
        #[arg(long, short = 't')]
        track: Option<TrackId>,
        #[arg(long)]
        shuffle: bool,
        /// none, all or one
        #[arg(long, short = 'r')]
        repeat: Option<RepeatMode>,
        /// 0.0 to 1.0
        #[arg(long)]
        volume: Option<f32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// Create an empty playlist
    Create { name: String },
    /// Append a track to a playlist
    Add { playlist: PlaylistId, track: TrackId },
}
