// HTTP transport backed by attohttpc

use super::traits::Transport;
use crate::error::{Result, ScrobbleError};
use attohttpc::header::{ACCEPT_CHARSET, USER_AGENT};
use attohttpc::Response;
use std::time::Duration;

pub struct HttpTransport {
    timeout: Duration,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    fn read_body(url: &str, response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let first_line = body.lines().next().unwrap_or_default();
            return Err(ScrobbleError::request_failed(format!(
                "{} answered with HTTP {}: {}",
                url, status, first_line
            )));
        }

        Ok(body)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        log::debug!("GET {}", url);

        let response = attohttpc::get(url)
            .params(query.iter().map(|(k, v)| (*k, v.as_str())))
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT_CHARSET, "UTF-8")
            .timeout(self.timeout)
            .send()?;

        Self::read_body(url, response)
    }

    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String> {
        log::debug!("POST {}", url);

        let response = attohttpc::post(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT_CHARSET, "UTF-8")
            .timeout(self.timeout)
            .form(&form)?
            .send()?;

        Self::read_body(url, response)
    }
}
