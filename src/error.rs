//! Typed errors for the fetch, markup and extraction stages.
//!
//! The orchestration layer wraps these in `anyhow` errors; per-document
//! failures are reported and skipped rather than propagated.

use thiserror::Error;

/// Failure to retrieve a listing or a document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {uri} timed out after {seconds}s")]
    Timeout { uri: String, seconds: u64 },

    #[error("cannot connect to {uri}")]
    Connect { uri: String },

    #[error("{uri} returned HTTP {status}")]
    Status { uri: String, status: u16 },

    #[error("request to {uri} failed: {source}")]
    Request {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body from {uri}: {source}")]
    Body {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// The document text is not well-formed markup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("malformed markup at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("document has no root element")]
    Empty,

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("document has more than one root element (second is <{0}>)")]
    MultipleRoots(String),

    #[error("unexpected text outside the root element")]
    StrayText,
}

/// The markup is well-formed but does not look like a vote document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unexpected root element <{0}>")]
    UnexpectedRoot(String),

    #[error("missing <{0}> element")]
    MissingElement(&'static str),

    #[error("missing {0} attribute")]
    MissingAttribute(&'static str),

    #[error("cannot parse vote timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Anything that makes a whole document unusable.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
