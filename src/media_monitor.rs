// Media monitoring module
// Turns successive player status snapshots into now playing and scrobble submissions

use crate::error::Result;
use crate::scrobbler::{SubmissionClient, Track, Transport};
use crate::settings::{PlaybackSettings, SettingsStore};
use chrono::{DateTime, Utc};

/// Player state as reported by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Play,
    Pause,
    Stop,
}

impl From<&str> for PlayerState {
    /// Anything but `play` and `pause` counts as stopped
    fn from(state: &str) -> Self {
        match state {
            "play" => Self::Play,
            "pause" => Self::Pause,
            _ => Self::Stop,
        }
    }
}

/// Snapshot of the player when the hook is invoked
#[derive(Debug, Clone)]
pub struct PlayerStatus {
    pub state: PlayerState,
    pub track: Track,
}

/// Which path a snapshot took through the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The paused track continued
    Resumed,
    /// First track since the player started
    Initial,
    /// A different track started, the previous one was submitted
    Changed,
    /// Same track still playing
    Seek,
    Paused,
    Stopped,
}

/// Playback state machine driving the submission clients
pub struct PlaybackTracker<'a, T: Transport> {
    store: &'a SettingsStore,
    services: &'a mut [SubmissionClient<T>],
}

impl<'a, T: Transport> PlaybackTracker<'a, T> {
    pub fn new(store: &'a SettingsStore, services: &'a mut [SubmissionClient<T>]) -> Self {
        Self { store, services }
    }

    /// Apply one snapshot to `settings`, persisting them and submitting as needed.
    ///
    /// Submission failures are logged per service; only persistence errors are returned.
    pub fn handle(
        &mut self,
        settings: &mut PlaybackSettings,
        status: PlayerStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let mut track = status.track;

        let state = match status.state {
            PlayerState::Play if track.is_none() => {
                log::warn!("Player reports play without a song, treating as stopped");
                PlayerState::Stop
            }
            state => state,
        };

        match state {
            PlayerState::Play if settings.pause && track.id == settings.song.id => {
                log::info!("Paused song {:?} continued", track.uri);
                settings.pause = false;
                self.store.save(settings)?;
                Ok(Transition::Resumed)
            }
            PlayerState::Play if settings.song.is_none() => {
                log::info!("Initial song playing {:?}", track.uri);
                track.start = now;
                settings.pause = false;
                settings.song = track.clone();
                self.store.save(settings)?;

                for client in self.services.iter_mut() {
                    announce(client, &track);
                }
                Ok(Transition::Initial)
            }
            PlayerState::Play if settings.song.id != track.id => {
                track.start = now;
                settings.pause = false;
                let previous = std::mem::replace(&mut settings.song, track.clone());
                log::info!("Song changed from {:?} to {:?}", previous.uri, track.uri);
                self.store.save(settings)?;

                for client in self.services.iter_mut() {
                    submit(client, &previous);
                    announce(client, &track);
                }
                Ok(Transition::Changed)
            }
            PlayerState::Play => {
                log::info!("Seek called on the song {:?}", track.uri);
                self.store.save(settings)?;
                Ok(Transition::Seek)
            }
            PlayerState::Pause => {
                log::info!("Song {:?} paused", track.uri);
                settings.pause = true;
                track.start = if track.id == settings.song.id { settings.song.start } else { now };
                settings.song = track;
                self.store.save(settings)?;
                Ok(Transition::Paused)
            }
            PlayerState::Stop => {
                log::info!("Stopped");
                settings.pause = false;
                settings.song = track;
                self.store.save(settings)?;
                Ok(Transition::Stopped)
            }
        }
    }
}

/// Send a now playing notification to one service
fn announce<T: Transport>(client: &mut SubmissionClient<T>, track: &Track) {
    log::info!("Sending now playing notification for {:?} to {}", track.uri, client.name());

    if let Err(e) = client.handshake().map(|_| ()) {
        log::warn!("Handshake with {} failed: {}", client.name(), e);
        return;
    }

    match client.now_playing(track) {
        Ok(true) => log::info!("{}: now playing updated", client.name()),
        Ok(false) => log::info!("{}: now playing not sent for {:?}", client.name(), track.uri),
        Err(e) => log::warn!("{}: now playing failed: {}", client.name(), e),
    }
}

/// Scrobble the track that just ended to one service
fn submit<T: Transport>(client: &mut SubmissionClient<T>, previous: &Track) {
    log::info!("Scrobbling previous song {:?} to {}", previous.uri, client.name());

    let result = match client.handshake().map(|_| ()) {
        Ok(_) => client.queue(previous, previous.start).map(|_| ()),
        Err(e) => {
            log::warn!("Handshake with {} failed: {}", client.name(), e);
            client.defer(previous)
        }
    };

    if let Err(e) = result {
        log::error!("{}: failed to update journal: {}", client.name(), e);
    }
}
