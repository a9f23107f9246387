//! Watched targets and their presence state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A page being watched for a marker string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique human-readable name.
    pub name: String,
    /// Page to fetch.
    pub url: String,
    /// Substring whose presence is tracked.
    pub marker: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            marker: marker.into(),
        }
    }
}

/// Last known presence of a target's marker.
///
/// `Unknown` only exists before the first successful evaluation in the
/// current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Unknown,
    Present,
    Absent,
}

impl From<bool> for Presence {
    fn from(present: bool) -> Self {
        if present {
            Presence::Present
        } else {
            Presence::Absent
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Presence::Unknown => "unknown",
            Presence::Present => "present",
            Presence::Absent => "absent",
        };
        f.write_str(s)
    }
}
