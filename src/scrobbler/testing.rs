// Scripted transport and fixtures for tests

use super::traits::{Track, TrackTags, Transport};
use crate::config::Service;
use crate::error::{Result, ScrobbleError};
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

pub const AUTH_URL: &str = "http://auth.test/";
pub const NOW_PLAYING_URL: &str = "http://np.test/";
pub const SUBMISSION_URL: &str = "http://sub.test/";
pub const HANDSHAKE_OK: &str = "OK\nsess\nhttp://np.test/\nhttp://sub.test/\n";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

impl Call {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Replies per URL: one-shot replies are consumed first, then the sticky one.
/// A URL with no reply answers with a transport failure.
#[derive(Default)]
pub struct FakeTransport {
    once: RefCell<HashMap<String, VecDeque<String>>>,
    sticky: HashMap<String, String>,
    calls: RefCell<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport where handshake, now playing and submission all succeed
    pub fn accepting() -> Self {
        Self::new()
            .reply(AUTH_URL, HANDSHAKE_OK)
            .reply(NOW_PLAYING_URL, "OK\n")
            .reply(SUBMISSION_URL, "OK\n")
    }

    pub fn reply(mut self, url: &str, body: &str) -> Self {
        self.sticky.insert(url.to_string(), body.to_string());
        self
    }

    pub fn reply_once(self, url: &str, body: &str) -> Self {
        self.once
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<Call> {
        self.calls.borrow().iter().filter(|c| c.url == url).cloned().collect()
    }

    fn answer(&self, method: &'static str, url: &str, fields: &[(&str, String)]) -> Result<String> {
        self.calls.borrow_mut().push(Call {
            method,
            url: url.to_string(),
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        });

        if let Some(body) = self.once.borrow_mut().get_mut(url).and_then(VecDeque::pop_front) {
            return Ok(body);
        }
        self.sticky
            .get(url)
            .cloned()
            .ok_or_else(|| ScrobbleError::request_failed(format!("connection refused: {}", url)))
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        self.answer("GET", url, query)
    }

    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String> {
        self.answer("POST", url, form)
    }
}

pub fn service(journal: Option<PathBuf>) -> Service {
    Service {
        name: "Test.fm",
        auth_url: AUTH_URL.to_string(),
        version: "1.2.1".to_string(),
        user: "alice".to_string(),
        password: "secret".to_string(),
        journal,
    }
}

/// A fully tagged track that started `ago` seconds before now
pub fn track(id: i64, duration: Option<u64>, ago: i64) -> Track {
    track_started(id, duration, Utc::now() - Duration::seconds(ago))
}

pub fn track_started(id: i64, duration: Option<u64>, start: DateTime<Utc>) -> Track {
    Track {
        id,
        uri: format!("music/{}.flac", id),
        duration,
        tags: TrackTags {
            artist: Some("Artist".to_string()),
            title: Some(format!("Title {}", id)),
            album: Some("Album".to_string()),
            track: Some("3".to_string()),
            musicbrainz_trackid: None,
        },
        start,
    }
}
