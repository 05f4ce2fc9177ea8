//! Line-oriented unified diffs between successive branch contents.

use similar::TextDiff;

/// Lines of context around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Unified diff from `previous` to `current`, empty when they are equal.
///
/// The sides are labelled `previous` and `current`. A first commit diffs
/// against the empty string.
#[must_use]
pub fn unified_diff(previous: &str, current: &str) -> String {
    if previous == current {
        return String::new();
    }

    TextDiff::from_lines(previous, current)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header("previous", "current")
        .to_string()
}
