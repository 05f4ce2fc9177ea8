//! Data model shared by every store backend.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Branch used when a write does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Message recorded on every commit created by a blob write.
pub const AUTO_COMMIT_MESSAGE: &str = "auto commit";

/// One immutable version of a repository branch.
///
/// Only `archived` may change after creation, and only from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub repo: String,
    pub branch: String,
    pub hash: String,
    /// Hash of the previous branch head, empty for a branch root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(rename = "author")]
    pub author_name: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// SHA-256 fingerprint of the content.
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
    /// Content lives in the archive instead of hot storage.
    pub archived: bool,
}

/// A movable pointer to the latest commit of one line of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub repo: String,
    pub name: String,
    pub commit: String,
    pub updated_at: DateTime<Utc>,
}

/// A write-once pointer to a specific commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub repo: String,
    pub name: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// A versioned blob submission.
#[derive(Debug, Clone, Default)]
pub struct BlobWriteRequest {
    /// Repository name.
    pub repo: String,
    /// Target branch; empty selects [`DEFAULT_BRANCH`].
    pub branch: String,
    pub content: String,
    pub author_name: String,
    pub author_id: String,
}

impl BlobWriteRequest {
    /// Branch the write lands on.
    #[must_use]
    pub fn effective_branch(&self) -> &str {
        if self.branch.is_empty() {
            DEFAULT_BRANCH
        } else {
            &self.branch
        }
    }
}

/// Summary of the commit created by a blob write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobCommitResult {
    pub commit_hash: String,
    pub branch: String,
    pub created_at: DateTime<Utc>,
    /// Unified diff against the previous branch head, empty when unchanged.
    pub diff: String,
}

/// History query parameters.
#[derive(Debug, Clone, Default)]
pub struct ListCommitsOptions {
    pub repo: String,
    /// Newest first when set.
    pub descending: bool,
    /// Maximum number of commits; 0 means unlimited.
    pub limit: usize,
}

/// Create or move a branch pointer.
#[derive(Debug, Clone, Default)]
pub struct BranchRequest {
    pub repo: String,
    pub name: String,
    pub commit: String,
}

/// Create a tag.
#[derive(Debug, Clone, Default)]
pub struct TagRequest {
    pub repo: String,
    pub name: String,
    pub commit: String,
    pub note: String,
}

/// Hot-tier limits for one repository.
///
/// A zero limit disables that rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub repo: String,
    /// Maximum number of commits whose content stays in hot storage.
    pub hot_commit_limit: i64,
    /// Maximum age of a commit before its content is archived.
    pub hot_duration: TimeDelta,
    /// Set once the policy has been stored; its limits can no longer change.
    pub locked: bool,
}

impl RetentionPolicy {
    /// Build an unlocked policy for `repo`.
    #[must_use]
    pub fn new(repo: impl Into<String>, hot_commit_limit: i64, hot_duration: TimeDelta) -> Self {
        Self {
            repo: repo.into(),
            hot_commit_limit,
            hot_duration,
            locked: false,
        }
    }

    /// Whether either limit is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.hot_commit_limit > 0 || self.hot_duration > TimeDelta::zero()
    }

    /// Whether `other` carries the same limits, ignoring repository and lock.
    #[must_use]
    pub fn same_limits(&self, other: &Self) -> bool {
        self.hot_commit_limit == other.hot_commit_limit
            && self.hot_duration.num_seconds() == other.hot_duration.num_seconds()
    }

    /// Convert to the persisted record form.
    #[must_use]
    pub fn to_record(&self) -> PolicyRecord {
        PolicyRecord {
            hot_commit_limit: self.hot_commit_limit,
            hot_duration_seconds: self.hot_duration.num_seconds(),
            locked: self.locked,
        }
    }
}

/// Process-wide fallback limits, applied to repositories without a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionDefaults {
    pub hot_commit_limit: i64,
    pub hot_duration: TimeDelta,
}

impl Default for RetentionDefaults {
    fn default() -> Self {
        Self {
            hot_commit_limit: 0,
            hot_duration: TimeDelta::zero(),
        }
    }
}

impl RetentionDefaults {
    /// The default policy bound to `repo`, unlocked.
    #[must_use]
    pub fn policy_for(&self, repo: &str) -> RetentionPolicy {
        RetentionPolicy::new(repo, self.hot_commit_limit, self.hot_duration)
    }
}

/// Stored form of a [`RetentionPolicy`]; durations have whole-second granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hot_commit_limit: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hot_duration_seconds: i64,
    pub locked: bool,
}

impl PolicyRecord {
    /// Rebuild the policy for `repo`.
    #[must_use]
    pub fn to_policy(self, repo: &str) -> RetentionPolicy {
        RetentionPolicy {
            repo: repo.to_owned(),
            hot_commit_limit: self.hot_commit_limit,
            hot_duration: seconds_delta(self.hot_duration_seconds),
            locked: self.locked,
        }
    }
}

/// Whole seconds as a [`TimeDelta`], saturating at the representable range.
#[must_use]
pub fn seconds_delta(secs: i64) -> TimeDelta {
    TimeDelta::try_seconds(secs).unwrap_or(if secs < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_json_layout() {
        let commit = Commit {
            repo: "analytics".into(),
            branch: "main".into(),
            hash: "abc".into(),
            parent: String::new(),
            author_name: "Alice".into(),
            author_id: "alice@id".into(),
            message: AUTO_COMMIT_MESSAGE.into(),
            content_hash: "def".into(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 5).unwrap(),
            archived: false,
        };

        let value = serde_json::to_value(&commit).unwrap();
        assert_eq!(value["author"], "Alice");
        assert_eq!(value["authorId"], "alice@id");
        assert_eq!(value["contentHash"], "def");
        assert!(value.get("parent").is_none());

        let back: Commit = serde_json::from_value(value).unwrap();
        assert_eq!(back, commit);
    }

    #[test]
    fn test_effective_branch_defaults_to_main() {
        let mut req = BlobWriteRequest::default();
        assert_eq!(req.effective_branch(), DEFAULT_BRANCH);
        req.branch = "dev".into();
        assert_eq!(req.effective_branch(), "dev");
    }

    #[test]
    fn test_policy_record_keeps_whole_seconds() {
        let policy = RetentionPolicy::new("repo", 3, TimeDelta::milliseconds(90_500));
        let record = policy.to_record();
        assert_eq!(record.hot_duration_seconds, 90);
        assert!(policy.same_limits(&record.to_policy("repo")));

        let json = serde_json::to_string(&PolicyRecord {
            hot_commit_limit: 0,
            hot_duration_seconds: 0,
            locked: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"locked":true}"#);
    }

    #[test]
    fn test_default_policy_is_inert() {
        let policy = RetentionDefaults::default().policy_for("repo");
        assert_eq!(policy.repo, "repo");
        assert!(!policy.locked);
        assert!(!policy.is_enabled());
    }
}
