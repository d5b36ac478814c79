// Scrobbler module
// Audioscrobbler 1.2.1 handshake, submissions and the retry journal

pub mod auth;
pub mod client;
pub mod http;
pub mod journal;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use auth::ClientId;
pub use client::SubmissionClient;
pub use http::HttpTransport;
pub use traits::{Track, TrackTags, Transport};
