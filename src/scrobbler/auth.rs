// Audioscrobbler handshake
// Token is md5(md5(password) + timestamp), answered by a status line and the session lines

use super::traits::Transport;
use crate::config::Service;
use crate::error::{Result, ScrobbleError};
use chrono::{DateTime, Utc};

/// Credentials obtained from a successful handshake.
///
/// Lives for one invocation only, every run authenticates again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub status: String,
    pub session_id: String,
    pub now_playing_url: String,
    pub submission_url: String,
}

/// Client identification sent along with the handshake
#[derive(Debug, Clone)]
pub struct ClientId {
    pub id: String,
    pub version: String,
}

/// Hex digest of the password, accepting an already hashed `md5:<digest>` form
pub fn password_digest(password: &str) -> String {
    match password.strip_prefix("md5:") {
        Some(digest) => digest.to_string(),
        None => format!("{:x}", md5::compute(password.as_bytes())),
    }
}

/// Authentication token for the given timestamp
pub fn auth_token(password_digest: &str, timestamp: i64) -> String {
    format!("{:x}", md5::compute(format!("{}{}", password_digest, timestamp)))
}

/// Authenticate against the service's handshake URL
pub fn handshake<T: Transport>(
    transport: &T,
    service: &Service,
    client: &ClientId,
    now: DateTime<Utc>,
) -> Result<Session> {
    let timestamp = now.timestamp();
    let token = auth_token(&password_digest(&service.password), timestamp);

    let query = [
        ("hs", "true".to_string()),
        ("p", service.version.clone()),
        ("c", client.id.clone()),
        ("v", client.version.clone()),
        ("u", service.user.clone()),
        ("t", timestamp.to_string()),
        ("a", token),
    ];

    log::debug!("Handshake with {} as {}", service.name, service.user);
    let body = transport.get(&service.auth_url, &query)?;
    parse_handshake(&body)
}

/// Interpret a handshake response body
pub fn parse_handshake(body: &str) -> Result<Session> {
    let mut lines = body.lines().map(|line| line.trim_end_matches('\r'));
    let status = lines.next().unwrap_or_default();

    if status.starts_with("OK") {
        let mut next = || lines.next().filter(|l| !l.is_empty()).map(str::to_string);
        match (next(), next(), next()) {
            (Some(session_id), Some(now_playing_url), Some(submission_url)) => Ok(Session {
                status: status.to_string(),
                session_id,
                now_playing_url,
                submission_url,
            }),
            _ => Err(ScrobbleError::request_failed("malformed handshake response")),
        }
    } else if status.starts_with("BANNED") {
        Err(ScrobbleError::Banned)
    } else if status.starts_with("BADAUTH") {
        Err(ScrobbleError::BadAuth)
    } else if status.starts_with("BADTIME") {
        Err(ScrobbleError::BadTime)
    } else {
        Err(ScrobbleError::request_failed(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobbler::testing::{service, FakeTransport, AUTH_URL, HANDSHAKE_OK};
    use chrono::TimeZone;

    #[test]
    fn password_digest_hashes_bare_passwords() {
        assert_eq!(password_digest("secret"), "5ebe2294ecd0e0f08eab7690d2a6ee69");
    }

    #[test]
    fn password_digest_keeps_prehashed_passwords() {
        assert_eq!(password_digest("md5:0123abcd"), "0123abcd");
    }

    #[test]
    fn token_is_md5_of_digest_and_timestamp() {
        let digest = password_digest("secret");
        let expected = format!("{:x}", md5::compute(format!("{}1234567890", digest)));
        assert_eq!(auth_token(&digest, 1_234_567_890), expected);
    }

    #[test]
    fn ok_yields_session() {
        let session = parse_handshake("OK\nabc\nhttp://np\nhttp://sub\n").unwrap();
        assert_eq!(session.status, "OK");
        assert_eq!(session.session_id, "abc");
        assert_eq!(session.now_playing_url, "http://np");
        assert_eq!(session.submission_url, "http://sub");
    }

    #[test]
    fn ok_accepts_crlf_lines() {
        let session = parse_handshake("OK\r\nabc\r\nhttp://np\r\nhttp://sub\r\n").unwrap();
        assert_eq!(session.session_id, "abc");
        assert_eq!(session.submission_url, "http://sub");
    }

    #[test]
    fn ok_without_session_lines_fails() {
        let err = parse_handshake("OK\nabc\n").unwrap_err();
        assert!(matches!(err, ScrobbleError::RequestFailed(_)));
    }

    #[test]
    fn every_status_maps_to_one_outcome() {
        assert!(matches!(parse_handshake("BANNED"), Err(ScrobbleError::Banned)));
        assert!(matches!(parse_handshake("BADAUTH"), Err(ScrobbleError::BadAuth)));
        assert!(matches!(parse_handshake("BADTIME"), Err(ScrobbleError::BadTime)));
        assert!(matches!(
            parse_handshake("FAILED Plugin bug"),
            Err(ScrobbleError::RequestFailed(ref s)) if s == "FAILED Plugin bug"
        ));
        assert!(matches!(
            parse_handshake("<html>teapot</html>"),
            Err(ScrobbleError::RequestFailed(ref s)) if s == "<html>teapot</html>"
        ));
        assert!(matches!(parse_handshake(""), Err(ScrobbleError::RequestFailed(_))));
    }

    #[test]
    fn status_match_is_case_sensitive() {
        assert!(matches!(parse_handshake("ok\na\nb\nc"), Err(ScrobbleError::RequestFailed(_))));
    }

    #[test]
    fn handshake_sends_protocol_query() {
        let transport = FakeTransport::new().reply(AUTH_URL, HANDSHAKE_OK);
        let client = ClientId { id: "tst".to_string(), version: "1.0".to_string() };
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let session = handshake(&transport, &service(None), &client, now).unwrap();
        assert_eq!(session.session_id, "sess");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.method, "GET");
        assert_eq!(call.url, AUTH_URL);
        assert_eq!(call.field("hs"), Some("true"));
        assert_eq!(call.field("p"), Some("1.2.1"));
        assert_eq!(call.field("c"), Some("tst"));
        assert_eq!(call.field("v"), Some("1.0"));
        assert_eq!(call.field("u"), Some("alice"));
        assert_eq!(call.field("t"), Some("1700000000"));
        let token = auth_token(&password_digest("secret"), 1_700_000_000);
        assert_eq!(call.field("a"), Some(token.as_str()));
    }
}
