//! Settings loading and validation.
//!
//! The settings file is JSON:
//!
//! ```json
//! {
//!   "product": [{ "name": "Widget", "url": "https://shop.example/w", "value": "IN STOCK" }],
//!   "interval": 60,
//!   "timeout": 5,
//!   "telegram": "123456:ABC-secret:987654",
//!   "fetcher": "browser",
//!   "initial_state": "present"
//! }
//! ```
//!
//! Raw values are deserialised first and then validated into [`Settings`];
//! anything malformed is a [`ConfigError`] and the watchdog refuses to start.

use crate::error::ConfigError;
use crate::target::{Presence, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default settings file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Fetch timeout used when the settings omit one.
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// How pages are retrieved. One strategy is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Fresh client and single GET per check.
    Plain,
    /// One client with a cookie jar shared by every check.
    Session,
    /// Randomised query parameters and no-cache headers on every request.
    CacheBusted,
    /// Headless Chromium render.
    #[default]
    Browser,
}

/// Presence assumed for every target before its first check, and whether a
/// missing marker on that first check is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    /// Assume the marker is present; a first-check absence notifies as a change.
    #[default]
    Present,
    /// Start unknown and notify immediately if the first check misses the marker.
    #[serde(alias = "unknown")]
    #[value(alias = "unknown")]
    UnknownNotify,
    /// Start unknown and record the first observation silently, either way.
    UnknownSilent,
}

impl InitialState {
    pub fn presence(self) -> Presence {
        match self {
            InitialState::Present => Presence::Present,
            InitialState::UnknownNotify | InitialState::UnknownSilent => Presence::Unknown,
        }
    }

    /// Whether an absent marker on the first observation raises `Changed`.
    pub fn notifies_missing_baseline(self) -> bool {
        !matches!(self, InitialState::UnknownSilent)
    }
}

/// Telegram bot credentials, already split out of the `telegram` setting.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    /// `bot_id:bot_secret`.
    pub token: String,
    pub chat_id: String,
}

impl TelegramCredentials {
    /// Split `bot_id:bot_secret:chat_id` at the last colon.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (token, chat_id) = raw.trim().rsplit_once(':').ok_or(ConfigError::InvalidTelegram)?;
        let token_ok = token
            .split_once(':')
            .is_some_and(|(id, secret)| !id.is_empty() && !secret.is_empty());
        if !token_ok || chat_id.is_empty() {
            return Err(ConfigError::InvalidTelegram);
        }
        Ok(Self {
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Validated watchdog settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub targets: Vec<Target>,
    pub interval: Duration,
    pub timeout: Duration,
    pub telegram: TelegramCredentials,
    pub fetcher: FetchStrategy,
    pub initial_state: InitialState,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    product: Vec<RawTarget>,
    interval: f64,
    timeout: Option<f64>,
    telegram: String,
    fetcher: Option<FetchStrategy>,
    initial_state: Option<InitialState>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: String,
    url: String,
    value: String,
}

impl Settings {
    /// Read and validate a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate settings from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(text)?;
        Self::validate(raw)
    }

    fn validate(raw: RawSettings) -> Result<Self, ConfigError> {
        if raw.product.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(raw.product.len());
        for (index, t) in raw.product.into_iter().enumerate() {
            let invalid = |reason: &str| ConfigError::InvalidTarget {
                index,
                reason: reason.to_string(),
            };
            if t.name.trim().is_empty() {
                return Err(invalid("empty name"));
            }
            if t.value.is_empty() {
                return Err(invalid("empty value"));
            }
            match url::Url::parse(&t.url) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => {}
                Ok(u) => return Err(invalid(&format!("unsupported URL scheme \"{}\"", u.scheme()))),
                Err(e) => return Err(invalid(&format!("bad URL \"{}\": {e}", t.url))),
            }
            if !seen.insert(t.name.clone()) {
                return Err(ConfigError::DuplicateTarget(t.name));
            }
            targets.push(Target::new(t.name, t.url, t.value));
        }

        let interval = positive_secs(raw.interval, "interval")?;
        let timeout = positive_secs(raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS), "timeout")?;
        let telegram = TelegramCredentials::parse(&raw.telegram)?;

        Ok(Self {
            targets,
            interval,
            timeout,
            telegram,
            fetcher: raw.fetcher.unwrap_or_default(),
            initial_state: raw.initial_state.unwrap_or_default(),
        })
    }
}

fn positive_secs(value: f64, field: &'static str) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NonPositive { field });
    }
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::NonPositive { field })
}
