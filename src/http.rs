use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP status {status} after {attempts} attempt(s){}", detail_suffix(.body))]
    Status {
        status: u16,
        body: String,
        attempts: usize,
    },
    #[error("transport error after {attempts} attempt(s): {message}")]
    Transport { message: String, attempts: usize },
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn detail_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub attempts: usize,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(8),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn get_text(
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
) -> Result<String, HttpError> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    let mut attempt = 1;
    loop {
        let mut request = agent.get(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        debug!(url, attempt, "GET");

        let retryable = match request.call() {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()));
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response
                    .into_string()
                    .ok()
                    .unwrap_or_default()
                    .trim()
                    .chars()
                    .take(240)
                    .collect::<String>();
                let err = HttpError::Status {
                    status,
                    body,
                    attempts: attempt,
                };
                if !should_retry_http_status(status) {
                    return Err(err);
                }
                err
            }
            Err(ureq::Error::Transport(err)) => HttpError::Transport {
                message: err.to_string(),
                attempts: attempt,
            },
        };

        if attempt >= attempts {
            return Err(retryable);
        }
        warn!(url, attempt, error = %retryable, "request failed, retrying");
        thread::sleep(policy.retry_delay);
        attempt += 1;
    }
}
