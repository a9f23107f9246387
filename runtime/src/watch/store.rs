//! In-memory presence store, one entry per configured target.

use crate::target::{Presence, Target};
use std::collections::HashMap;

/// Last known presence per target name.
///
/// Populated once at startup and never cleared; there is no persistence
/// across restarts.
#[derive(Debug, Clone)]
pub struct PresenceStore {
    states: HashMap<String, Presence>,
}

impl PresenceStore {
    /// Create a store with every target set to `initial`.
    pub fn new<'a>(targets: impl IntoIterator<Item = &'a Target>, initial: Presence) -> Self {
        let states = targets
            .into_iter()
            .map(|t| (t.name.clone(), initial))
            .collect();
        Self { states }
    }

    /// Presence for a target; unconfigured names read as `Unknown`.
    pub fn get(&self, name: &str) -> Presence {
        self.states.get(name).copied().unwrap_or(Presence::Unknown)
    }

    pub(crate) fn set(&mut self, name: &str, presence: Presence) {
        match self.states.get_mut(name) {
            Some(slot) => *slot = presence,
            None => {
                self.states.insert(name.to_string(), presence);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Snapshot of all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Presence)> {
        self.states.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
