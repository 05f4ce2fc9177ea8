//! Persisted key layout.
//!
//! These names are shared with every deployment that reads the same server,
//! so they must not change.

use chrono::{DateTime, Utc};

pub fn commit(repo: &str, hash: &str) -> String {
    format!("commit:{repo}:{hash}")
}

pub fn content(repo: &str, hash: &str) -> String {
    format!("content:{repo}:{hash}")
}

pub fn branch(repo: &str, name: &str) -> String {
    format!("branch:{repo}:{name}")
}

pub fn branch_set(repo: &str) -> String {
    format!("branchset:{repo}")
}

pub fn tag(repo: &str, name: &str) -> String {
    format!("tag:{repo}:{name}")
}

pub fn tag_set(repo: &str) -> String {
    format!("tagset:{repo}")
}

/// Sorted set of commit hashes scored by creation time.
pub fn history(repo: &str) -> String {
    format!("repo:commits:{repo}")
}

pub fn author(repo: &str, id: &str) -> String {
    format!("author:{repo}:{id}")
}

pub fn policy(repo: &str) -> String {
    format!("policy:{repo}")
}

/// History-index score: creation time in Unix nanoseconds.
#[allow(clippy::cast_precision_loss)]
pub fn history_score(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX) as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(commit("analytics", "abc"), "commit:analytics:abc");
        assert_eq!(content("analytics", "abc"), "content:analytics:abc");
        assert_eq!(branch("analytics", "main"), "branch:analytics:main");
        assert_eq!(branch_set("analytics"), "branchset:analytics");
        assert_eq!(tag("analytics", "v1"), "tag:analytics:v1");
        assert_eq!(tag_set("analytics"), "tagset:analytics");
        assert_eq!(history("analytics"), "repo:commits:analytics");
        assert_eq!(author("analytics", "alice@id"), "author:analytics:alice@id");
        assert_eq!(policy("analytics"), "policy:analytics");
    }

    #[test]
    fn test_history_score_orders_by_time() {
        let earlier = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert!(history_score(earlier) < history_score(later));
        assert!((history_score(earlier) - 1.7e18).abs() < 1.0e3);
    }
}
