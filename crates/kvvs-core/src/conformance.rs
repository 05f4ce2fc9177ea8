//! Behavioral checks every [`CommitStore`] backend must pass.
//!
//! Each check takes a fresh repository name so backends sharing a server can
//! run them side by side. The stores passed to
//! [`archived_content_stays_readable`] and [`write_on_archived_head`] must
//! have an archive configured.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use chrono::TimeDelta;

use crate::traits::CommitStore;
use crate::types::{
    BlobWriteRequest, BranchRequest, DEFAULT_BRANCH, ListCommitsOptions, RetentionPolicy,
    TagRequest,
};
use crate::{ErrorKind, hash};

fn write(repo: &str, content: &str, name: &str, id: &str) -> BlobWriteRequest {
    BlobWriteRequest {
        repo: repo.into(),
        branch: String::new(),
        content: content.into(),
        author_name: name.into(),
        author_id: id.into(),
    }
}

fn alice(repo: &str, content: &str) -> BlobWriteRequest {
    write(repo, content, "Alice", "alice@id")
}

fn history(repo: &str, descending: bool, limit: usize) -> ListCommitsOptions {
    ListCommitsOptions {
        repo: repo.into(),
        descending,
        limit,
    }
}

/// Two writes, a tag, and an author mismatch on one repository.
pub async fn versioning_scenario<S: CommitStore>(store: &S, repo: &str) {
    let c1 = store
        .put_blob_and_commit(alice(repo, "line one\nline two\n"))
        .await
        .unwrap();
    assert_eq!(c1.branch, DEFAULT_BRANCH);
    assert!(!c1.diff.is_empty());

    let (meta, content) = store.get_commit(repo, &c1.commit_hash).await.unwrap();
    assert_eq!(meta.parent, "");
    assert_eq!(content, "line one\nline two\n");
    assert_eq!(meta.content_hash, hash::content_hash("line one\nline two\n"));

    let c2 = store
        .put_blob_and_commit(alice(repo, "line one\nline two updated\n"))
        .await
        .unwrap();
    assert!(c2.diff.contains("-line two\n"));
    assert!(c2.diff.contains("+line two updated\n"));

    let (meta, _) = store.get_commit(repo, &c2.commit_hash).await.unwrap();
    assert_eq!(meta.parent, c1.commit_hash);
    assert_eq!(
        store.get_branch(repo, DEFAULT_BRANCH).await.unwrap().commit,
        c2.commit_hash
    );

    let listed: Vec<String> = store
        .list_commits(history(repo, true, 0))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.hash)
        .collect();
    assert_eq!(listed, [c2.commit_hash.clone(), c1.commit_hash.clone()]);

    let tag = TagRequest {
        repo: repo.into(),
        name: "v1".into(),
        commit: c2.commit_hash.clone(),
        note: "first release".into(),
    };
    let created = store.create_tag(tag.clone()).await.unwrap();
    assert_eq!(created.commit, c2.commit_hash);
    assert!(store.create_tag(tag).await.unwrap_err().is_conflict());

    let err = store
        .put_blob_and_commit(write(repo, "line three\n", "Bob", "alice@id"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

/// A rejected author leaves history, branch and registry untouched.
pub async fn author_conflict_leaves_no_trace<S: CommitStore>(store: &S, repo: &str) {
    let first = store.put_blob_and_commit(alice(repo, "a\n")).await.unwrap();

    let mut bob = write(repo, "b\n", "Bob", "alice@id");
    bob.branch = "feature".into();
    assert!(store.put_blob_and_commit(bob).await.unwrap_err().is_conflict());

    assert_eq!(store.list_commits(history(repo, false, 0)).await.unwrap().len(), 1);
    assert!(store.get_branch(repo, "feature").await.unwrap_err().is_not_found());
    assert_eq!(
        store.get_branch(repo, DEFAULT_BRANCH).await.unwrap().commit,
        first.commit_hash
    );

    // The original binding still works, and the id is free in other repositories.
    store.put_blob_and_commit(alice(repo, "c\n")).await.unwrap();
    let elsewhere = format!("{repo}-other");
    store
        .put_blob_and_commit(write(&elsewhere, "d\n", "Bob", "alice@id"))
        .await
        .unwrap();
}

/// Ordering, limits and identical-content writes.
pub async fn history_ordering_and_limit<S: CommitStore>(store: &S, repo: &str) {
    let mut hashes = Vec::new();
    for content in ["same\n", "same\n", "same\n"] {
        let result = store.put_blob_and_commit(alice(repo, content)).await.unwrap();
        hashes.push(result.commit_hash);
    }
    // Identical content still creates distinct commits.
    assert_ne!(hashes[0], hashes[1]);
    assert_ne!(hashes[1], hashes[2]);

    let ascending: Vec<String> = store
        .list_commits(history(repo, false, 0))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.hash)
        .collect();
    assert_eq!(ascending, hashes);

    let newest = store.list_commits(history(repo, true, 2)).await.unwrap();
    assert_eq!(newest.len(), 2);
    assert_eq!(newest[0].hash, hashes[2]);
    assert_eq!(newest[1].hash, hashes[1]);

    let unknown = format!("{repo}-empty");
    assert!(store.list_commits(history(&unknown, true, 0)).await.unwrap().is_empty());
}

/// Branch moves, sorted listings, write-once tags.
pub async fn branch_and_tag_directory<S: CommitStore>(store: &S, repo: &str) {
    let first = store.put_blob_and_commit(alice(repo, "one\n")).await.unwrap();
    let mut dev = alice(repo, "two\n");
    dev.branch = "dev".into();
    let second = store.put_blob_and_commit(dev).await.unwrap();
    assert_eq!(second.branch, "dev");

    let moved = store
        .upsert_branch(BranchRequest {
            repo: repo.into(),
            name: "alpha".into(),
            commit: first.commit_hash.clone(),
        })
        .await
        .unwrap();
    assert_eq!(moved.commit, first.commit_hash);

    let names: Vec<String> = store
        .list_branches(repo)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, ["alpha", "dev", "main"]);

    let missing = store
        .upsert_branch(BranchRequest {
            repo: repo.into(),
            name: "ghost".into(),
            commit: "0".repeat(64),
        })
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    // A commit of another repository is not a valid target.
    let other = format!("{repo}-other");
    let foreign = store.put_blob_and_commit(alice(&other, "x\n")).await.unwrap();
    let err = store
        .create_tag(TagRequest {
            repo: repo.into(),
            name: "foreign".into(),
            commit: foreign.commit_hash,
            note: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Validation));

    for name in ["v2", "v1"] {
        store
            .create_tag(TagRequest {
                repo: repo.into(),
                name: name.into(),
                commit: second.commit_hash.clone(),
                note: String::new(),
            })
            .await
            .unwrap();
    }
    let tags: Vec<String> = store
        .list_tags(repo)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(tags, ["v1", "v2"]);
    assert_eq!(store.get_tag(repo, "v1").await.unwrap().commit, second.commit_hash);
    assert!(store.get_tag(repo, "v3").await.unwrap_err().is_not_found());
}

/// Policies lock on first set; identical re-sets succeed.
pub async fn policy_is_write_once<S: CommitStore>(store: &S, repo: &str) {
    let unset = store.get_policy(repo).await.unwrap();
    assert_eq!(unset.repo, repo);
    assert!(!unset.locked);

    let policy = RetentionPolicy::new(repo, 5, TimeDelta::hours(1));
    let stored = store.set_policy(policy.clone()).await.unwrap();
    assert!(stored.locked);
    assert_eq!(stored.hot_commit_limit, 5);
    assert_eq!(stored.hot_duration, TimeDelta::hours(1));

    let again = store.set_policy(policy).await.unwrap();
    assert_eq!(again, stored);

    let changed = RetentionPolicy::new(repo, 6, TimeDelta::hours(1));
    assert!(store.set_policy(changed).await.unwrap_err().is_conflict());
    assert_eq!(store.get_policy(repo).await.unwrap(), stored);

    let negative = RetentionPolicy::new(repo, -1, TimeDelta::zero());
    assert_eq!(
        store.set_policy(negative).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
}

/// With `hotCommitLimit` 1, older content moves to the archive but stays readable.
pub async fn archived_content_stays_readable<S: CommitStore>(store: &S, repo: &str) {
    store
        .set_policy(RetentionPolicy::new(repo, 1, TimeDelta::zero()))
        .await
        .unwrap();

    let first = store.put_blob_and_commit(alice(repo, "old\n")).await.unwrap();
    let second = store.put_blob_and_commit(alice(repo, "new\n")).await.unwrap();

    let (meta, content) = store.get_commit(repo, &first.commit_hash).await.unwrap();
    assert!(meta.archived);
    assert_eq!(content, "old\n");

    let (meta, content) = store.get_commit(repo, &second.commit_hash).await.unwrap();
    assert!(!meta.archived);
    assert_eq!(content, "new\n");

    // Re-enforcing with no new writes archives nothing further.
    store
        .set_policy(RetentionPolicy::new(repo, 1, TimeDelta::zero()))
        .await
        .unwrap();
    assert!(!store.get_commit(repo, &second.commit_hash).await.unwrap().0.archived);
}

/// A write whose branch head was archived diffs against the archived content.
pub async fn write_on_archived_head<S: CommitStore>(store: &S, repo: &str) {
    store
        .set_policy(RetentionPolicy::new(repo, 1, TimeDelta::zero()))
        .await
        .unwrap();

    let head = store.put_blob_and_commit(alice(repo, "a\n")).await.unwrap();
    let mut side = alice(repo, "b\n");
    side.branch = "side".into();
    store.put_blob_and_commit(side).await.unwrap();
    assert!(store.get_commit(repo, &head.commit_hash).await.unwrap().0.archived);

    let next = store.put_blob_and_commit(alice(repo, "c\n")).await.unwrap();
    assert!(next.diff.contains("-a\n"));
    assert!(next.diff.contains("+c\n"));
    let (meta, _) = store.get_commit(repo, &next.commit_hash).await.unwrap();
    assert_eq!(meta.parent, head.commit_hash);
}

/// A duration too large to subtract from the current time archives nothing
/// by age and leaves the repository writable.
pub async fn huge_duration_policy<S: CommitStore>(store: &S, repo: &str) {
    let first = store.put_blob_and_commit(alice(repo, "1\n")).await.unwrap();
    let policy = store
        .set_policy(RetentionPolicy::new(repo, 0, TimeDelta::MAX))
        .await
        .unwrap();
    assert!(policy.locked);

    store.put_blob_and_commit(alice(repo, "2\n")).await.unwrap();
    let (meta, content) = store.get_commit(repo, &first.commit_hash).await.unwrap();
    assert!(!meta.archived);
    assert_eq!(content, "1\n");
}

/// Empty required fields fail validation on every operation.
pub async fn validation_errors<S: CommitStore>(store: &S) {
    fn kind(result: crate::Result<()>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    assert_eq!(
        kind(store.put_blob_and_commit(alice("", "x")).await.map(drop)),
        ErrorKind::Validation
    );
    assert_eq!(
        kind(store.put_blob_and_commit(alice("r", "")).await.map(drop)),
        ErrorKind::Validation
    );
    assert_eq!(
        kind(store.put_blob_and_commit(write("r", "x", "", "id")).await.map(drop)),
        ErrorKind::Validation
    );
    assert_eq!(
        kind(store.list_commits(history("", false, 0)).await.map(drop)),
        ErrorKind::Validation
    );
    assert_eq!(kind(store.get_policy("").await.map(drop)), ErrorKind::Validation);
    assert_eq!(kind(store.get_branch("r", "").await.map(drop)), ErrorKind::Validation);
    assert_eq!(
        kind(
            store
                .upsert_branch(BranchRequest {
                    repo: "r".into(),
                    name: "b".into(),
                    commit: String::new(),
                })
                .await
                .map(drop)
        ),
        ErrorKind::Validation
    );
}
