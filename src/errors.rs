use std::io;

use thiserror::Error;

/// Errors produced by the shuffle core, the persisted state and the remote
/// player gateway.
///
/// Sources are flattened to their message; the error stays `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShuffleError {
    /// Non-2xx answer (or transport failure, status 0) from the Web API.
    #[error("remote player error ({status}): {message}")]
    RemoteService { status: u16, message: String },
    /// 429 from the Web API. `retry_after` is the advertised delay in seconds.
    #[error("rate limited{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },
    /// A remote call did not return within the configured bound.
    #[error("remote player call timed out")]
    Timeout,
    #[error("{0} not found")]
    NotFound(String),
    #[error("no devices found")]
    NoDevices,
    #[error("invalid shuffle_choice '{0}'")]
    InvalidChoice(String),
    /// The selected source resolved to zero playable tracks.
    #[error("{0} has no playable tracks")]
    EmptySource(String),
    #[error("invalid track id '{0}'")]
    InvalidTrackId(String),
    #[error("bundle already exists")]
    DuplicateBundle,
    #[error("storage error: {0}")]
    Storage(String),
}

impl ShuffleError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ShuffleError::RemoteService {
            status,
            message: message.into(),
        }
    }

    /// Whether the failed operation may succeed when tried again on a later
    /// tick. Rejected credentials (401, 403) do not recover on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ShuffleError::RemoteService { status, .. } => !matches!(status, 401 | 403),
            ShuffleError::RateLimited { .. } | ShuffleError::Timeout => true,
            _ => false,
        }
    }
}

fn retry_suffix(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {}s", secs))
        .unwrap_or_default()
}

impl From<io::Error> for ShuffleError {
    fn from(err: io::Error) -> Self {
        ShuffleError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ShuffleError {
    fn from(err: serde_json::Error) -> Self {
        ShuffleError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ShuffleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ShuffleError::Timeout;
        }
        let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
        ShuffleError::remote(status, err.to_string())
    }
}
