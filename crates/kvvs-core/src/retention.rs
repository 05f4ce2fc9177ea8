//! Hot/cold retention planning.
//!
//! Stores call [`plan_archival`] after every successful write and policy
//! change, then move each selected commit's content into the archive. The
//! plan only looks at unarchived commits, so repeating it with the same
//! policy and no new writes selects nothing.

use chrono::{DateTime, Utc};

use crate::types::RetentionPolicy;

/// One history-index entry as seen by the retention scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub archived: bool,
}

/// Select the commits whose content should leave hot storage.
///
/// `entries` must be in history-index order, oldest first. The result keeps
/// that order and never contains an archived commit.
#[must_use]
pub fn plan_archival(
    entries: &[HistoryEntry],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<String> {
    if !policy.is_enabled() {
        return Vec::new();
    }

    let mut marked = vec![false; entries.len()];

    // A cutoff before the representable range means nothing is old enough.
    if policy.hot_duration > chrono::TimeDelta::zero()
        && let Some(cutoff) = now.checked_sub_signed(policy.hot_duration)
    {
        for (i, entry) in entries.iter().enumerate() {
            if !entry.archived && entry.timestamp < cutoff {
                marked[i] = true;
            }
        }
    }

    if policy.hot_commit_limit > 0 {
        let remaining: Vec<usize> = (0..entries.len())
            .filter(|&i| !entries[i].archived && !marked[i])
            .collect();
        let limit = usize::try_from(policy.hot_commit_limit).unwrap_or(usize::MAX);
        let excess = remaining.len().saturating_sub(limit);
        for &i in &remaining[..excess] {
            marked[i] = true;
        }
    }

    entries
        .iter()
        .zip(marked)
        .filter_map(|(entry, marked)| marked.then(|| entry.hash.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn history(now: DateTime<Utc>, ages_secs: &[(i64, bool)]) -> Vec<HistoryEntry> {
        ages_secs
            .iter()
            .enumerate()
            .map(|(i, &(age, archived))| HistoryEntry {
                hash: format!("c{i}"),
                timestamp: now - TimeDelta::seconds(age),
                archived,
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_disabled_policy_plans_nothing() {
        let entries = history(now(), &[(500, false), (10, false)]);
        let policy = RetentionPolicy::new("r", 0, TimeDelta::zero());
        assert!(plan_archival(&entries, &policy, now()).is_empty());
    }

    #[test]
    fn test_count_limit_archives_oldest() {
        let entries = history(now(), &[(30, false), (20, false), (10, false)]);
        let policy = RetentionPolicy::new("r", 1, TimeDelta::zero());
        assert_eq!(plan_archival(&entries, &policy, now()), vec!["c0", "c1"]);
    }

    #[test]
    fn test_count_limit_ignores_already_archived() {
        let entries = history(now(), &[(30, true), (20, false), (10, false)]);
        let policy = RetentionPolicy::new("r", 1, TimeDelta::zero());
        assert_eq!(plan_archival(&entries, &policy, now()), vec!["c1"]);
    }

    #[test]
    fn test_age_limit_archives_expired() {
        let entries = history(now(), &[(600, false), (120, true), (5, false)]);
        let policy = RetentionPolicy::new("r", 0, TimeDelta::seconds(60));
        assert_eq!(plan_archival(&entries, &policy, now()), vec!["c0"]);
    }

    #[test]
    fn test_age_and_count_combine() {
        // c0 expires by age, leaving c1..c3 for the count rule with limit 2.
        let entries = history(now(), &[(600, false), (40, false), (30, false), (20, false)]);
        let policy = RetentionPolicy::new("r", 2, TimeDelta::seconds(300));
        assert_eq!(plan_archival(&entries, &policy, now()), vec!["c0", "c1"]);
    }

    #[test]
    fn test_huge_duration_archives_nothing_by_age() {
        let entries = history(now(), &[(600, false), (5, false)]);
        let policy = RetentionPolicy::new("r", 0, TimeDelta::MAX);
        assert!(plan_archival(&entries, &policy, now()).is_empty());

        // The count rule still applies.
        let policy = RetentionPolicy::new("r", 1, TimeDelta::MAX);
        assert_eq!(plan_archival(&entries, &policy, now()), vec!["c0"]);
    }

    #[test]
    fn test_plan_converges() {
        let mut entries = history(now(), &[(30, false), (20, false), (10, false)]);
        let policy = RetentionPolicy::new("r", 1, TimeDelta::zero());
        for hash in plan_archival(&entries, &policy, now()) {
            entries.iter_mut().find(|e| e.hash == hash).unwrap().archived = true;
        }
        assert!(plan_archival(&entries, &policy, now()).is_empty());
    }
}
