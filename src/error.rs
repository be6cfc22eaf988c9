use std::fmt;

use thiserror::Error;

/// Why a fetch did not produce a page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    InvalidUrl(String),
    Status(u16),
    Timeout,
    Network(String),
    Redirect(String),
    Decode(String),
}

impl FetchCause {
    /// Whether another attempt has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchCause::Timeout | FetchCause::Network(_) => true,
            FetchCause::Status(code) => *code == 429 || (500..600).contains(code),
            FetchCause::InvalidUrl(_) | FetchCause::Redirect(_) | FetchCause::Decode(_) => false,
        }
    }
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::InvalidUrl(reason) => write!(f, "invalid URL: {}", reason),
            FetchCause::Status(code) => write!(f, "HTTP status {}", code),
            FetchCause::Timeout => write!(f, "timed out"),
            FetchCause::Network(msg) => write!(f, "network error: {}", msg),
            FetchCause::Redirect(msg) => write!(f, "redirect failed: {}", msg),
            FetchCause::Decode(msg) => write!(f, "undecodable body: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(url: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            url: url.into(),
            cause,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.cause.is_transient()
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = err.status() {
            FetchCause::Status(status.as_u16())
        } else if err.is_builder() {
            FetchCause::InvalidUrl(err.to_string())
        } else if err.is_redirect() {
            FetchCause::Redirect(err.to_string())
        } else if err.is_decode() {
            FetchCause::Decode(err.to_string())
        } else {
            FetchCause::Network(err.to_string())
        };
        Self::new(url, cause)
    }
}

/// The HTTP client could not be constructed. No request was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("build HTTP client: {0}")]
pub struct ClientError(pub String);

/// A product node on a listing page that lacks a structural marker we need.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("product node #{index}: {reason}")]
pub struct ParseError {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
