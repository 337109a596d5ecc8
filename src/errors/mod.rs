// src/errors/mod.rs
use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Which of the two listing calls a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    LatestCursor,
    Continue,
}

impl Endpoint {
    /// Path relative to the API base, without a leading slash.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::LatestCursor => "2/files/list_folder/get_latest_cursor",
            Endpoint::Continue => "2/files/list_folder/continue",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::LatestCursor => f.write_str("list_folder/get_latest_cursor"),
            Endpoint::Continue => f.write_str("list_folder/continue"),
        }
    }
}

/// Coarse fault categories reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    MissingCredential,
    TransportFailure,
    DecodeFailure,
    MissingCursor,
    UnexpectedFailure,
}

/// Main error type for probe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{var} environment variable not set")]
    MissingCredential { var: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: Endpoint,
        status: StatusCode,
        body: String,
        summary: Option<String>,
    },

    #[error("JSON parsing error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no cursor found in response")]
    MissingCursor,

    #[error("HTTP middleware error: {0}")]
    Middleware(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    HeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("{0}")]
    Unexpected(String),
}

impl From<reqwest_middleware::Error> for ProbeError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => ProbeError::Transport(e),
            other => ProbeError::Middleware(other.to_string()),
        }
    }
}

impl ProbeError {
    pub fn kind(&self) -> FaultKind {
        match self {
            ProbeError::MissingCredential { .. } => FaultKind::MissingCredential,
            ProbeError::Transport(_) | ProbeError::Status { .. } => FaultKind::TransportFailure,
            ProbeError::Decode(_) => FaultKind::DecodeFailure,
            ProbeError::MissingCursor => FaultKind::MissingCursor,
            ProbeError::Middleware(_)
            | ProbeError::Io(_)
            | ProbeError::HeaderName(_)
            | ProbeError::HeaderValue(_)
            | ProbeError::UrlParse(_)
            | ProbeError::Unexpected(_) => FaultKind::UnexpectedFailure,
        }
    }

    /// HTTP status attached to the failure, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProbeError::Status { status, .. } => Some(*status),
            ProbeError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Convenience Result type that uses ProbeError
pub type Result<T> = std::result::Result<T, ProbeError>;
