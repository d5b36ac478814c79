// Common types and the transport seam shared by the submission code

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the sentinel track that stands for "nothing tracked"
pub const NO_TRACK: i64 = -1;

/// Tags of a track as reported by the player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub track: Option<String>,
    pub musicbrainz_trackid: Option<String>,
}

/// Track information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub uri: String,
    pub duration: Option<u64>, // Duration in seconds, None when unknown
    #[serde(default)]
    pub tags: TrackTags,
    /// When the track was recognized as newly playing
    pub start: DateTime<Utc>,
}

impl Track {
    /// The sentinel track
    pub fn none() -> Self {
        Self {
            id: NO_TRACK,
            uri: String::new(),
            duration: None,
            tags: TrackTags::default(),
            start: Utc::now(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.id < 0
    }

    /// Artist and title, when both are present and non-empty
    pub fn artist_title(&self) -> Option<(&str, &str)> {
        let artist = self.tags.artist.as_deref().filter(|a| !a.is_empty())?;
        let title = self.tags.title.as_deref().filter(|t| !t.is_empty())?;
        Some((artist, title))
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::none()
    }
}

/// Blocking HTTP transport used by the handshake and the submissions.
///
/// Both calls return the response body.
pub trait Transport {
    /// GET `url` with the given query parameters
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String>;

    /// POST the given fields to `url` as an urlencoded form
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String>;
}
