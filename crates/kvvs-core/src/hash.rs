//! Content fingerprints and commit-hash derivation.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the raw content bytes.
#[must_use]
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Hex-encoded SHA-256 over `repo`, `branch`, `parent`, `content` and the
/// creation time, joined by newlines.
///
/// The timestamp makes repeated writes of identical content distinct.
#[must_use]
pub fn commit_hash(
    repo: &str,
    branch: &str,
    parent: &str,
    content: &str,
    timestamp: DateTime<Utc>,
) -> String {
    let stamp = format_rfc3339_nano(timestamp);
    let mut hasher = Sha256::new();
    for (i, part) in [repo, branch, parent, content, stamp.as_str()]
        .into_iter()
        .enumerate()
    {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// RFC 3339 in UTC with up to nine fractional digits, trailing zeros trimmed.
///
/// `2024-05-01T10:00:00.5Z`, `2024-05-01T10:00:00Z`.
#[must_use]
pub fn format_rfc3339_nano(timestamp: DateTime<Utc>) -> String {
    let mut out = timestamp.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = timestamp.timestamp_subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push('Z');
    out
}
