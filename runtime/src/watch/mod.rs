//! Change detection: per-target presence store and the state machine over it.

pub mod detector;
pub mod store;

pub use detector::{decide, ChangeDetector, Decision};
pub use store::PresenceStore;
