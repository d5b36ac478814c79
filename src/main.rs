// scrobble-hook: submits now playing songs and scrobbles from a player hook
// Invoked once per player event; state carries over through the settings file

mod config;
mod error;
mod media_monitor;
mod scrobbler;
mod settings;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser};
use config::Config;
use media_monitor::{PlaybackTracker, PlayerState, PlayerStatus};
use scrobbler::{ClientId, HttpTransport, SubmissionClient, Track, TrackTags};
use settings::SettingsStore;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "scrobble-hook", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "SCROBBLE_HOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the playback settings between runs
    #[arg(long, env = "SCROBBLE_HOOK_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// More logging, repeat for trace output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(flatten)]
    status: StatusArgs,
}

/// Player status, normally provided through the hook environment
#[derive(Args, Debug)]
struct StatusArgs {
    /// Player state: play, pause or stop
    #[arg(long, env = "MPD_STATUS_STATE", default_value = "stop")]
    state: String,

    /// Total time of the current song in seconds, 0 when unknown
    #[arg(long, env = "MPD_STATUS_TOTAL_TIME", default_value_t = 0)]
    total_time: u64,

    #[arg(long, env = "MPD_SONG_ID", default_value_t = -1, allow_negative_numbers = true)]
    song_id: i64,

    #[arg(long, env = "MPD_SONG_URI", default_value = "")]
    uri: String,

    #[arg(long, env = "MPD_SONG_TAG_ARTIST")]
    artist: Option<String>,

    #[arg(long, env = "MPD_SONG_TAG_TITLE")]
    title: Option<String>,

    #[arg(long, env = "MPD_SONG_TAG_ALBUM")]
    album: Option<String>,

    #[arg(long, env = "MPD_SONG_TAG_TRACK")]
    track: Option<String>,

    #[arg(long, env = "MPD_SONG_TAG_MUSICBRAINZ_TRACKID")]
    musicbrainz_trackid: Option<String>,

    /// How many times the hook ran since the player started, 1 discards stale settings
    #[arg(long, env = "MC_CALLS_PLAYER", default_value_t = 0)]
    calls: u64,
}

impl StatusArgs {
    fn into_status(self) -> PlayerStatus {
        let track = Track {
            id: self.song_id,
            uri: self.uri,
            duration: Some(self.total_time).filter(|&t| t > 0),
            tags: TrackTags {
                artist: self.artist,
                title: self.title,
                album: self.album,
                track: self.track,
                musicbrainz_trackid: self.musicbrainz_trackid,
            },
            start: Utc::now(),
        };

        PlayerStatus {
            state: PlayerState::from(self.state.as_str()),
            track,
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => Config::state_dir()?,
    };
    let store = SettingsStore::new(state_dir.join("settings.json"));

    if cli.status.calls == 1 {
        log::info!("First run, removing cruft");
        store.clear().context("Failed to remove stale settings")?;
    }
    let mut settings = store.load();

    let client_id = ClientId {
        id: config.client_id.clone(),
        version: config.client_version.clone(),
    };
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut clients: Vec<_> = config
        .services()
        .into_iter()
        .map(|service| SubmissionClient::new(service, client_id.clone(), HttpTransport::new(timeout)))
        .collect();

    let status = cli.status.into_status();
    log::debug!("Player {:?}, song {} ({:?})", status.state, status.track.id, status.track.uri);

    let transition = PlaybackTracker::new(&store, &mut clients)
        .handle(&mut settings, status, Utc::now())
        .context("Failed to save playback settings")?;
    log::debug!("Handled as {:?}", transition);

    Ok(())
}
