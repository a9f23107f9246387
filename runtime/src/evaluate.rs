//! Marker presence check.

/// Exact, case-sensitive substring containment. No trimming or normalisation.
pub fn is_present(content: &str, marker: &str) -> bool {
    content.contains(marker)
}
