// Submission client for one Audioscrobbler-compatible service
// Now playing notifications, scrobbles and the journal-backed submission queue

use super::auth::{self, ClientId, Session};
use super::journal::Journal;
use super::traits::{Track, Transport};
use crate::config::Service;
use crate::error::{Result, ScrobbleError};
use chrono::{DateTime, Utc};

const MIN_TRACK_DURATION: u64 = 30; // Tracks must be longer than this to be submitted
const SCROBBLE_TIME_THRESHOLD: i64 = 240; // 4 minutes in seconds

/// Whether a played track qualifies for a scrobble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Artist or title missing
    MissingTags,
    /// Known length of 30 seconds or less
    TooShort,
    /// Neither 240 seconds nor half the track have passed yet
    NotPlayedEnough,
}

impl Eligibility {
    /// Rejections that no amount of waiting can turn into a scrobble
    pub fn is_permanent(self) -> bool {
        matches!(self, Self::MissingTags | Self::TooShort)
    }
}

/// Decide whether `track`, started at `start`, may be scrobbled at `now`.
///
/// The track must be longer than 30 seconds and have played for 240 seconds
/// or half its length, whichever comes first.
pub fn eligibility(track: &Track, start: DateTime<Utc>, now: DateTime<Utc>) -> Eligibility {
    if track.artist_title().is_none() {
        return Eligibility::MissingTags;
    }

    let threshold = match track.duration {
        Some(duration) if duration <= MIN_TRACK_DURATION => return Eligibility::TooShort,
        Some(duration) => SCROBBLE_TIME_THRESHOLD.min((duration / 2) as i64),
        None => SCROBBLE_TIME_THRESHOLD,
    };

    let elapsed = now.signed_duration_since(start).num_seconds().max(0);
    if elapsed >= threshold {
        Eligibility::Eligible
    } else {
        Eligibility::NotPlayedEnough
    }
}

/// Outcome of [`SubmissionClient::queue`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueReport {
    /// Scrobbles the service acknowledged
    pub submitted: usize,
    /// Entries left in the journal for a later run
    pub pending: usize,
    /// Entries discarded because they can never qualify
    pub dropped: usize,
}

enum Replay {
    Submitted,
    Keep,
    Drop,
    /// The session could not be renewed, nothing more can be sent this run
    SessionLost,
}

pub struct SubmissionClient<T: Transport> {
    service: Service,
    client: ClientId,
    transport: T,
    session: Option<Session>,
}

impl<T: Transport> SubmissionClient<T> {
    pub fn new(service: Service, client: ClientId, transport: T) -> Self {
        Self {
            service,
            client,
            transport,
            session: None,
        }
    }

    /// Display name of the service
    pub fn name(&self) -> &'static str {
        self.service.name
    }

    #[cfg(test)]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Authenticate, replacing any previous session
    pub fn handshake(&mut self) -> Result<&Session> {
        self.session = None;
        let session = auth::handshake(&self.transport, &self.service, &self.client, Utc::now())?;
        log::debug!(
            "{}: {}, session {}, now playing url {}, submission url {}",
            self.service.name,
            session.status,
            session.session_id,
            session.now_playing_url,
            session.submission_url
        );
        Ok(self.session.insert(session))
    }

    /// Send a now playing notification.
    ///
    /// Returns `Ok(false)` without any request when the track lacks artist or
    /// title, or is known to be 30 seconds or shorter.
    pub fn now_playing(&self, track: &Track) -> Result<bool> {
        let session = self.session.as_ref().ok_or(ScrobbleError::NoSession)?;

        let Some((artist, title)) = track.artist_title() else {
            log::debug!("{}: not announcing {:?}, artist or title missing", self.service.name, track.uri);
            return Ok(false);
        };
        if matches!(track.duration, Some(d) if d <= MIN_TRACK_DURATION) {
            log::debug!("{}: not announcing {:?}, shorter than 30 seconds", self.service.name, track.uri);
            return Ok(false);
        }

        let form = [
            ("s", session.session_id.clone()),
            ("a", artist.to_string()),
            ("t", title.to_string()),
            ("b", tag(&track.tags.album)),
            ("l", length(track)),
            ("n", tag(&track.tags.track)),
            ("m", tag(&track.tags.musicbrainz_trackid)),
        ];

        let body = self.transport.post_form(&session.now_playing_url, &form)?;
        parse_status(&body)?;
        Ok(true)
    }

    /// Scrobble `track` played from `start`.
    ///
    /// Returns `Ok(false)` without any request when the track is not eligible.
    pub fn scrobble(&self, track: &Track, start: DateTime<Utc>) -> Result<bool> {
        let session = self.session.as_ref().ok_or(ScrobbleError::NoSession)?;

        match eligibility(track, start, Utc::now()) {
            Eligibility::Eligible => {}
            rejected => {
                log::info!("{}: not scrobbling {:?}: {:?}", self.service.name, track.uri, rejected);
                return Ok(false);
            }
        }

        let form = [
            ("s", session.session_id.clone()),
            ("a[0]", tag(&track.tags.artist)),
            ("t[0]", tag(&track.tags.title)),
            ("i[0]", start.timestamp().to_string()),
            ("o[0]", "P".to_string()),
            ("r[0]", String::new()),
            ("l[0]", length(track)),
            ("b[0]", tag(&track.tags.album)),
            ("n[0]", tag(&track.tags.track)),
            ("m[0]", tag(&track.tags.musicbrainz_trackid)),
        ];

        let body = self.transport.post_form(&session.submission_url, &form)?;
        parse_status(&body)?;
        Ok(true)
    }

    /// Scrobble `track`, caching it in the journal when it cannot be sent.
    ///
    /// With a journal, every pending entry is replayed in order before the new one
    /// and whatever is still not accepted is written back. Protocol errors are
    /// logged, only journal IO errors are returned.
    pub fn queue(&mut self, track: &Track, start: DateTime<Utc>) -> Result<QueueReport> {
        let mut track = track.clone();
        track.start = start;

        let Some(path) = self.service.journal.clone() else {
            log::debug!("{}: no journal configured, skipping caching", self.service.name);
            return Ok(self.queue_uncached(&track));
        };

        let journal = Journal::new(path);
        let mut entries = journal.load();
        log::info!(
            "{}: caching {:?} to journal {:?}",
            self.service.name,
            track.uri,
            journal.path()
        );
        entries.push(track);

        let mut report = QueueReport::default();
        let mut pending = Vec::new();
        let mut session_lost = false;

        for entry in entries {
            if session_lost {
                pending.push(entry);
                continue;
            }

            match self.replay(&entry) {
                Replay::Submitted => report.submitted += 1,
                Replay::Drop => report.dropped += 1,
                Replay::Keep => pending.push(entry),
                Replay::SessionLost => {
                    session_lost = true;
                    pending.push(entry);
                }
            }
        }

        report.pending = pending.len();
        journal.save(&pending)?;
        log::info!(
            "{}: {} scrobbled, {} pending, {} dropped",
            self.service.name,
            report.submitted,
            report.pending,
            report.dropped
        );

        Ok(report)
    }

    /// Append `track` to the journal without contacting the service.
    ///
    /// Used when no session could be obtained; the next queue replays it.
    pub fn defer(&self, track: &Track) -> Result<()> {
        let Some(path) = &self.service.journal else {
            log::info!("{}: no journal configured, {:?} is lost", self.service.name, track.uri);
            return Ok(());
        };

        let journal = Journal::new(path);
        let mut entries = journal.load();
        log::info!("{}: caching {:?} to journal {:?}", self.service.name, track.uri, journal.path());
        entries.push(track.clone());
        journal.save(&entries)
    }

    fn queue_uncached(&mut self, track: &Track) -> QueueReport {
        let mut report = QueueReport::default();

        if self.session.is_none() {
            if let Err(e) = self.handshake().map(|_| ()) {
                log::warn!("{}: scrobbling {:?} failed: {}", self.service.name, track.uri, e);
                return report;
            }
        }

        match self.scrobble(track, track.start) {
            Ok(true) => report.submitted = 1,
            Ok(false) => report.dropped = 1,
            Err(e) => log::warn!("{}: scrobbling {:?} failed: {}", self.service.name, track.uri, e),
        }
        report
    }

    fn replay(&mut self, entry: &Track) -> Replay {
        match eligibility(entry, entry.start, Utc::now()) {
            Eligibility::Eligible => {}
            rejected if rejected.is_permanent() => {
                log::info!("{}: dropping {:?}: {:?}", self.service.name, entry.uri, rejected);
                return Replay::Drop;
            }
            rejected => {
                log::info!("{}: keeping {:?} for later: {:?}", self.service.name, entry.uri, rejected);
                return Replay::Keep;
            }
        }

        if self.session.is_none() && !self.renew_session() {
            return Replay::SessionLost;
        }

        log::debug!("{}: scrobbling cached {:?}", self.service.name, entry.uri);
        match self.scrobble(entry, entry.start) {
            Ok(true) => Replay::Submitted,
            Ok(false) => Replay::Drop,
            Err(ScrobbleError::BadSession) => {
                log::info!("{}: session expired, renewing", self.service.name);
                if !self.renew_session() {
                    return Replay::SessionLost;
                }
                match self.scrobble(entry, entry.start) {
                    Ok(true) => Replay::Submitted,
                    Ok(false) => Replay::Drop,
                    Err(e) => self.keep_after(entry, e),
                }
            }
            Err(e) => self.keep_after(entry, e),
        }
    }

    fn renew_session(&mut self) -> bool {
        match self.handshake().map(|_| ()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{}: handshake failed: {}", self.service.name, e);
                false
            }
        }
    }

    fn keep_after(&self, entry: &Track, e: ScrobbleError) -> Replay {
        log::warn!(
            "{}: scrobbling {:?} failed, caching for later submission: {}",
            self.service.name,
            entry.uri,
            e
        );
        Replay::Keep
    }
}

/// Interpret the status line of a submission response
fn parse_status(body: &str) -> Result<()> {
    let status = body.lines().next().unwrap_or_default().trim_end_matches('\r');

    if status.starts_with("OK") {
        Ok(())
    } else if status.starts_with("BADSESSION") {
        Err(ScrobbleError::BadSession)
    } else {
        Err(ScrobbleError::request_failed(status))
    }
}

fn tag(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn length(track: &Track) -> String {
    track.duration.map(|d| d.to_string()).unwrap_or_default()
}
