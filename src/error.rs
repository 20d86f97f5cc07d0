//! Error taxonomy for the URL seeder.
//!
//! Internal helpers use `anyhow::Result` for ergonomic `?`-propagation; the public
//! boundary (`UrlSeeder::urls`/`many_urls`) converts into `SeederError` so callers get
//! a closed, matchable set of failure modes instead of an opaque error chain.

use std::fmt;

/// Errors that can cross the public API boundary of the seeder.
#[derive(Debug, Clone)]
pub enum SeederError {
    /// Configuration is invalid: unknown source tag, non-positive concurrency,
    /// or a `max_urls` value other than `-1` that is negative.
    BadInput(String),
    /// Connection or timeout failure at the transport layer.
    Network(String),
    /// Non-success HTTP status where the caller did not opt into reading the body.
    HttpStatus(u16),
    /// Malformed HTML, XML, or JSON encountered while parsing a response.
    ParseError(String),
    /// Filesystem error reading or writing a cache file.
    CacheError(String),
    /// The call was cancelled before it could complete.
    Cancelled,
}

impl fmt::Display for SeederError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadInput(msg) => write!(f, "invalid seeder configuration: {msg}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::HttpStatus(code) => write!(f, "unexpected HTTP status: {code}"),
            Self::ParseError(msg) => write!(f, "parse error: {msg}"),
            Self::CacheError(msg) => write!(f, "cache error: {msg}"),
            Self::Cancelled => write!(f, "seeding operation was cancelled"),
        }
    }
}

impl std::error::Error for SeederError {}

impl From<anyhow::Error> for SeederError {
    fn from(err: anyhow::Error) -> Self {
        Self::Network(format!("{err:#}"))
    }
}

impl From<reqwest::Error> for SeederError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for SeederError {
    fn from(err: std::io::Error) -> Self {
        Self::CacheError(err.to_string())
    }
}

/// Convenience alias for `Result` with `SeederError`.
pub type SeederResult<T> = Result<T, SeederError>;
