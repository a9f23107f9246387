//! Error taxonomy for the watchdog.
//!
//! Fetch and delivery errors are recoverable and never leave a single check;
//! configuration errors are fatal at startup.

use std::time::Duration;

/// Why a page could not be fetched or rendered.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("render failed: {0}")]
    Render(String),
}

impl FetchError {
    /// Classify a reqwest failure into a short diagnostic.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout);
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_builder() {
            return Self::InvalidUrl(err.to_string());
        }
        Self::Transport(without_url(&err))
    }
}

/// reqwest embeds the full URL in its messages; the target URL is already part
/// of every notification, and cache-busted URLs would only add noise.
fn without_url(err: &reqwest::Error) -> String {
    use std::error::Error as _;

    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    if parts.is_empty() {
        err.to_string()
    } else {
        parts.join(": ")
    }
}

/// A notification could not be handed to the messaging API.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("delivery rejected with HTTP status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("delivery transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Invalid or unreadable settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no targets configured under \"product\"")]
    NoTargets,

    #[error("duplicate target name: {0}")]
    DuplicateTarget(String),

    #[error("target #{index}: {reason}")]
    InvalidTarget { index: usize, reason: String },

    #[error("\"{field}\" must be a positive number of seconds")]
    NonPositive { field: &'static str },

    #[error("\"telegram\" must look like bot_id:bot_secret:chat_id")]
    InvalidTelegram,
}
