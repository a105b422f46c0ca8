// Command handlers behind the CLI
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::audio::engine::PlaybackState;
use crate::audio::output::{AudioOutput, RodioOutput};
use crate::audio::player::PlayerController;
use crate::cli::{Command, PlaylistAction};
use crate::db::connection::DatabaseConnection;
use crate::db::models::{PlaylistId, Track, TrackId, User};
use crate::db::operations::DbOperations;
use crate::db::store::LibraryStore;
use crate::events::PlayerEvent;
use crate::library::collection::TrackLibrary;
use crate::library::favorites::FavoritesSync;
use crate::library::indexer::{IndexingResult, LibraryIndexer};
use crate::library::scanner::DirectoryScanner;
use crate::metadata::extractor::TagExtractor;
use crate::queue::RepeatMode;
use crate::settings::AppSettings;
use crate::state::{AppState, SessionContext};

const DB_FILE: &str = "melodeck.db";
const VOLUME_STEP: f32 = 0.05;

/// Everything a command needs: where data lives, settings, storage, and who is asking
pub struct AppContext {
    pub data_dir: PathBuf,
    pub settings: AppSettings,
    pub db: DatabaseConnection,
    pub user: User,
}

impl AppContext {
    pub fn open(data_dir: Option<PathBuf>, user: Option<String>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("Could not determine the user data directory, pass --data-dir")?
                .join("melodeck"),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let settings = AppSettings::load(&data_dir)?;
        if !AppSettings::get_settings_path(&data_dir).exists() {
            settings.save(&data_dir)?;
        }

        let db = DatabaseConnection::new(&data_dir.join(DB_FILE))?;
        let username = user.unwrap_or_else(|| settings.user.username.clone());
        let user = DbOperations::get_or_create_user(&db, &username)?;
        tracing::debug!(data_dir = %data_dir.display(), user = %user.username, "context ready");

        Ok(Self {
            data_dir,
            settings,
            db,
            user,
        })
    }
}

pub async fn dispatch(ctx: AppContext, command: Command) -> Result<()> {
    match command {
        Command::Scan { dir } => scan(&ctx, dir).await,
        Command::Tracks { search, playlist } => list_tracks(&ctx, search.as_deref(), playlist),
        Command::Playlists => list_playlists(&ctx),
        Command::Playlist { action } => playlist(&ctx, action),
        Command::Favorite { track } => favorite(&ctx, track),
        Command::Cover { track, out } => cover(&ctx, track, &out),
        Command::Play {
            playlist,
            track,
            shuffle,
            repeat,
            volume,
        } => {
            let options = PlayOptions {
                playlist,
                track,
                shuffle,
                repeat,
                volume,
            };
            play(ctx, options).await
        }
    }
}

// ===== Library Management Commands =====

async fn scan(ctx: &AppContext, dir: Option<PathBuf>) -> Result<()> {
    let directory = match dir.or_else(|| ctx.settings.library.music_dir.clone()) {
        Some(dir) => dir,
        None => bail!("No music directory given and none configured in settings.json"),
    };
    let extensions = ctx.settings.library.extensions.clone();
    let recursive = ctx.settings.library.recursive;
    let db = ctx.db.clone();

    // Tag reading is blocking file I/O
    let result = tokio::task::spawn_blocking(move || -> Result<IndexingResult> {
        let audio_files = DirectoryScanner::scan(&directory, &extensions, recursive)
            .context("Failed to scan directory")?;
        LibraryIndexer::index_files_with_progress(&audio_files, &db, |progress| {
            tracing::debug!(
                current = progress.current,
                total = progress.total,
                file = %progress.current_file,
                "indexing"
            );
        })
        .context("Failed to index files")
    })
    .await
    .context("Scan task failed")??;

    println!(
        "Scanned {} files: {} added, {} already indexed, {} failed",
        result.total_files, result.added, result.skipped, result.failed
    );
    for error in &result.errors {
        println!("  {error}");
    }
    Ok(())
}

fn list_tracks(ctx: &AppContext, search: Option<&str>, playlist: Option<PlaylistId>) -> Result<()> {
    let mut library = TrackLibrary::default();
    let mut ids = library.replace_all(ctx.db.fetch_all_tracks()?);
    FavoritesSync::new(ctx.user.id).hydrate(&ctx.db, &mut library)?;

    if let Some(playlist_id) = playlist {
        let playlist = DbOperations::get_playlist(&ctx.db, playlist_id)?
            .with_context(|| format!("Playlist {playlist_id} does not exist"))?;
        println!("{} ({} tracks)", playlist.name, playlist.track_count);
        ids = library.merge(ctx.db.fetch_playlist(playlist_id)?);
    }
    if let Some(query) = search {
        let hits = library.search(query);
        ids.retain(|id| hits.contains(id));
    }

    for track in ids.iter().filter_map(|&id| library.get(id)) {
        println!("{}", format_track(track));
    }
    Ok(())
}

fn list_playlists(ctx: &AppContext) -> Result<()> {
    let playlists = DbOperations::get_playlists(&ctx.db, ctx.user.id)?;
    if playlists.is_empty() {
        println!("No playlists for {}", ctx.user.username);
    }
    for playlist in playlists {
        println!("{:>5}  {} ({} tracks)", playlist.id, playlist.name, playlist.track_count);
    }
    Ok(())
}

fn playlist(ctx: &AppContext, action: PlaylistAction) -> Result<()> {
    match action {
        PlaylistAction::Create { name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("Playlist name cannot be empty");
            }
            if DbOperations::get_playlist_by_name(&ctx.db, ctx.user.id, name)?.is_some() {
                bail!("Playlist '{name}' already exists");
            }
            let playlist = DbOperations::create_playlist(&ctx.db, ctx.user.id, name)?;
            println!("Created playlist {} ({})", playlist.name, playlist.id);
        }
        PlaylistAction::Add { playlist, track } => {
            let target = DbOperations::get_playlist(&ctx.db, playlist)?
                .with_context(|| format!("Playlist {playlist} does not exist"))?;
            if target.user_id != ctx.user.id {
                bail!("Playlist {playlist} belongs to another user");
            }
            if DbOperations::add_track_to_playlist(&ctx.db, playlist, track)? {
                println!("Added track {track} to {}", target.name);
            } else {
                println!("Track {track} is already in {}", target.name);
            }
        }
    }
    Ok(())
}

fn favorite(ctx: &AppContext, track_id: TrackId) -> Result<()> {
    let mut library = TrackLibrary::default();
    library.replace_all(ctx.db.fetch_all_tracks()?);
    let mut favorites = FavoritesSync::new(ctx.user.id);
    favorites.hydrate(&ctx.db, &mut library)?;

    let is_favorite = favorites.toggle(&ctx.db, &mut library, track_id)?;
    let title = library.get(track_id).map(|t| t.title.as_str()).unwrap_or("?");
    if is_favorite {
        println!("★ Added '{title}' to favorites");
    } else {
        println!("Removed '{title}' from favorites");
    }
    Ok(())
}

fn cover(ctx: &AppContext, track_id: TrackId, out: &Path) -> Result<()> {
    let track = DbOperations::get_track(&ctx.db, track_id)?
        .with_context(|| format!("Track {track_id} does not exist"))?;

    match TagExtractor::front_cover(Path::new(&track.file_path))? {
        Some(data) => {
            std::fs::write(out, &data).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {} bytes to {}", data.len(), out.display());
        }
        None => println!("'{}' has no embedded cover art", track.title),
    }
    Ok(())
}

// ===== Playback =====

pub struct PlayOptions {
    pub playlist: Option<PlaylistId>,
    pub track: Option<TrackId>,
    pub shuffle: bool,
    pub repeat: Option<RepeatMode>,
    pub volume: Option<f32>,
}

/// One line typed at the play prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    TogglePause,
    Next,
    Previous,
    Shuffle,
    Repeat,
    Favorite,
    VolumeUp,
    VolumeDown,
    Seek(f64),
    Quit,
}

impl Control {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let control = match parts.next()? {
            "p" | "pause" | "play" => Control::TogglePause,
            "n" | "next" => Control::Next,
            "b" | "prev" | "previous" => Control::Previous,
            "s" | "shuffle" => Control::Shuffle,
            "r" | "repeat" => Control::Repeat,
            "f" | "fav" | "favorite" => Control::Favorite,
            "+" => Control::VolumeUp,
            "-" => Control::VolumeDown,
            "seek" => Control::Seek(parts.next()?.parse::<f64>().ok().filter(|s| s.is_finite())?),
            "q" | "quit" | "exit" => Control::Quit,
            _ => return None,
        };
        Some(control)
    }
}

async fn play(ctx: AppContext, options: PlayOptions) -> Result<()> {
    let mut playback = ctx.settings.playback.clone();
    playback.shuffle |= options.shuffle;
    if let Some(repeat) = options.repeat {
        playback.repeat = repeat;
    }
    if let Some(volume) = options.volume {
        playback.volume = volume;
    }

    let output = RodioOutput::new().context("No audio output device")?;
    let player = PlayerController::new(output, &playback);
    let context = SessionContext { user: ctx.user };
    let mut state = AppState::new(context, ctx.db, player);

    if !state.load_library() {
        render_events(&mut state, &mut TimeLine::default());
        bail!("Could not load the library");
    }
    if let Some(playlist_id) = options.playlist {
        if !state.show_playlist(playlist_id) {
            render_events(&mut state, &mut TimeLine::default());
            bail!("Could not load playlist {playlist_id}");
        }
    }
    if state.displayed().is_empty() {
        bail!("Nothing to play, run `melodeck scan` first");
    }

    match options.track {
        Some(track_id) => {
            state.play_track(track_id);
        }
        None => state.toggle_play_pause(None),
    }

    println!("Controls: p pause/resume, n next, b previous, s shuffle, r repeat, f favorite, +/- volume, seek SECS, q quit");
    run_play_loop(&mut state, playback.tick_rate_hz).await
}

async fn run_play_loop<S: LibraryStore, O: AudioOutput>(state: &mut AppState<S, O>, tick_rate_hz: u32) -> Result<()> {
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut timeline = TimeLine::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => state.tick(),
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read controls")? else {
                    break;
                };
                match Control::parse(&line) {
                    Some(Control::Quit) => break,
                    Some(control) => apply_control(state, control),
                    None if line.trim().is_empty() => {}
                    None => println!("Unknown control '{}'", line.trim()),
                }
            }
        }
        render_events(state, &mut timeline);
    }

    state.player_mut().pause();
    println!();
    Ok(())
}

fn apply_control<S: LibraryStore, O: AudioOutput>(state: &mut AppState<S, O>, control: Control) {
    match control {
        Control::TogglePause => state.toggle_play_pause(None),
        Control::Next => state.next(),
        Control::Previous => state.previous(),
        Control::Shuffle => state.player_mut().toggle_shuffle(),
        Control::Repeat => state.player_mut().cycle_repeat(),
        Control::Favorite => {
            state.toggle_current_favorite();
        }
        Control::VolumeUp => state.player_mut().adjust_volume(VOLUME_STEP),
        Control::VolumeDown => state.player_mut().adjust_volume(-VOLUME_STEP),
        Control::Seek(secs) => state.player_mut().seek(secs),
        Control::Quit => {}
    }
}

/// Redraws the progress line only when the displayed second changes
#[derive(Default)]
struct TimeLine {
    last_second: Option<u64>,
}

fn render_events<S: LibraryStore, O: AudioOutput>(state: &mut AppState<S, O>, timeline: &mut TimeLine) {
    for event in state.drain_events() {
        match event {
            PlayerEvent::TrackChanged { track_id, index } => {
                timeline.last_second = None;
                if let Some(track) = state.library().get(track_id) {
                    let total = state.player().session().len();
                    println!("\n▶ [{}/{}] {}", index + 1, total, format_track(track));
                }
            }
            PlayerEvent::StateChanged(PlaybackState::Paused) => println!("\n⏸ paused"),
            PlayerEvent::StateChanged(_) => {}
            PlayerEvent::Position(update) => {
                let second = update.position_secs as u64;
                if timeline.last_second != Some(second) {
                    timeline.last_second = Some(second);
                    print!(
                        "\r  {} / {}   ",
                        format_time(update.position_secs),
                        format_time(update.duration_secs)
                    );
                    let _ = std::io::stdout().flush();
                }
            }
            PlayerEvent::QueueFinished => println!("\n■ end of queue"),
            PlayerEvent::ShuffleChanged(on) => println!("\nshuffle {}", if on { "on" } else { "off" }),
            PlayerEvent::RepeatChanged(mode) => println!("\nrepeat {mode}"),
            PlayerEvent::VolumeChanged(volume) => println!("\nvolume {:.0}%", volume * 100.0),
            PlayerEvent::FavoriteChanged { track_id, is_favorite } => {
                let title = state.library().get(track_id).map(|t| t.title.clone()).unwrap_or_default();
                let mark = if is_favorite { "★ favorited" } else { "☆ unfavorited" };
                println!("\n{mark} {title}");
            }
            PlayerEvent::Notice(message) => println!("\n! {message}"),
        }
    }
}

fn format_track(track: &Track) -> String {
    let favorite = if track.is_favorite_local { "★" } else { " " };
    let duration = track.duration_secs().map(format_time).unwrap_or_else(|| "--:--".to_string());
    format!(
        "{:>5} {} {} - {} [{}] {}",
        track.id,
        favorite,
        track.title,
        track.artist.as_deref().unwrap_or("Unknown Artist"),
        track.album.as_deref().unwrap_or("Without Album"),
        duration
    )
}

/// `m:ss`, or `h:mm:ss` past an hour
fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
