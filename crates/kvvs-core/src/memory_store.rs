//! In-process commit store.
//!
//! Every operation runs under one store-wide mutex, so a write observes and
//! publishes a consistent repository state without any retry logic. State
//! lives as long as the store value.
//!
//! The async [`CommitStore`] methods complete synchronously, including any
//! archive I/O, on the calling task. This suits the CLI, tests and
//! single-task embedding; servers with many concurrent tasks should use the
//! KeyDB store, which moves archive I/O off the runtime.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::archive::{Archive, fetch_text};
use crate::clock::{Clock, system_clock};
use crate::diff::unified_diff;
use crate::error::{Error, Result};
use crate::hash::{commit_hash, content_hash};
use crate::retention::{HistoryEntry, plan_archival};
use crate::traits::CommitStore;
use crate::types::{
    AUTO_COMMIT_MESSAGE, BlobCommitResult, BlobWriteRequest, Branch, BranchRequest, Commit,
    ListCommitsOptions, RetentionDefaults, RetentionPolicy, Tag, TagRequest, seconds_delta,
};
use crate::validate::{require_owned_commit, require_repo, require_repo_and_name};

#[derive(Default)]
struct RepoState {
    commits: HashMap<String, Commit>,
    /// Hot-tier content by commit hash.
    contents: HashMap<String, String>,
    /// Commit hashes in creation order.
    history: Vec<String>,
    branches: BTreeMap<String, Branch>,
    tags: BTreeMap<String, Tag>,
    /// Author id to the name first seen with it.
    authors: HashMap<String, String>,
    policy: Option<RetentionPolicy>,
}

/// Mutex-guarded [`CommitStore`] for single-process deployments and tests.
pub struct MemoryStore {
    repos: Mutex<HashMap<String, RepoState>>,
    archive: Option<Arc<dyn Archive>>,
    defaults: RetentionDefaults,
    clock: Clock,
}

impl MemoryStore {
    /// Create an empty store.
    ///
    /// Without an archive, retention never moves content.
    #[must_use]
    pub fn new(archive: Option<Arc<dyn Archive>>, defaults: RetentionDefaults) -> Self {
        Self {
            repos: Mutex::new(HashMap::new()),
            archive,
            defaults,
            clock: system_clock(),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // === Write path ===

    /// Commit the request's content as the new head of its branch.
    ///
    /// # Errors
    /// `Validation` for incomplete requests, `NotFound` if the parent's
    /// content is missing from both tiers, `Conflict` for an author-identity
    /// mismatch or hash collision.
    pub fn put_blob_and_commit(&self, req: &BlobWriteRequest) -> Result<BlobCommitResult> {
        req.validate()?;
        let branch = req.effective_branch().to_owned();

        let result = {
            let mut repos = self.repos.lock();
            let state = repos.entry(req.repo.clone()).or_default();

            let parent = state
                .branches
                .get(&branch)
                .map(|b| b.commit.clone())
                .unwrap_or_default();
            let previous = if parent.is_empty() {
                String::new()
            } else {
                self.load_content(state, &req.repo, &parent)?
            };

            if let Some(bound) = state.authors.get(&req.author_id)
                && *bound != req.author_name
            {
                return Err(Error::conflict("author", &req.author_id));
            }

            let now = (self.clock)();
            let diff = unified_diff(&previous, &req.content);
            let hash = commit_hash(&req.repo, &branch, &parent, &req.content, now);
            if state.commits.contains_key(&hash) {
                return Err(Error::conflict("commit", hash));
            }

            let commit = Commit {
                repo: req.repo.clone(),
                branch: branch.clone(),
                hash: hash.clone(),
                parent,
                author_name: req.author_name.clone(),
                author_id: req.author_id.clone(),
                message: AUTO_COMMIT_MESSAGE.to_owned(),
                content_hash: content_hash(&req.content),
                timestamp: now,
                archived: false,
            };
            state.commits.insert(hash.clone(), commit);
            state.contents.insert(hash.clone(), req.content.clone());
            state.history.push(hash.clone());
            state.branches.insert(
                branch.clone(),
                Branch {
                    repo: req.repo.clone(),
                    name: branch.clone(),
                    commit: hash.clone(),
                    updated_at: now,
                },
            );
            state
                .authors
                .entry(req.author_id.clone())
                .or_insert_with(|| req.author_name.clone());

            BlobCommitResult {
                commit_hash: hash,
                branch,
                created_at: now,
                diff,
            }
        };

        debug!(repo = %req.repo, branch = %result.branch, commit = %result.commit_hash, "committed");
        self.enforce_retention(&req.repo);
        Ok(result)
    }

    // === History ===

    /// # Errors
    /// `Validation` if the repository name is empty.
    pub fn list_commits(&self, opts: &ListCommitsOptions) -> Result<Vec<Commit>> {
        require_repo(&opts.repo)?;
        let repos = self.repos.lock();
        let Some(state) = repos.get(&opts.repo) else {
            return Ok(Vec::new());
        };

        let hydrate = |hash: &String| state.commits.get(hash).cloned();
        let mut commits: Vec<Commit> = if opts.descending {
            state.history.iter().rev().filter_map(hydrate).collect()
        } else {
            state.history.iter().filter_map(hydrate).collect()
        };
        if opts.limit > 0 {
            commits.truncate(opts.limit);
        }
        Ok(commits)
    }

    /// Metadata and content of one commit.
    ///
    /// # Errors
    /// `NotFound` if the commit is unknown or its content is in neither tier.
    pub fn get_commit(&self, repo: &str, hash: &str) -> Result<(Commit, String)> {
        if repo.is_empty() || hash.is_empty() {
            return Err(Error::validation("repo and hash are required"));
        }
        let (commit, hot) = {
            let repos = self.repos.lock();
            let state = repos
                .get(repo)
                .ok_or_else(|| Error::not_found("commit", hash))?;
            let commit = state
                .commits
                .get(hash)
                .cloned()
                .ok_or_else(|| Error::not_found("commit", hash))?;
            (commit, state.contents.get(hash).cloned())
        };

        // Content leaves the hot tier only after the archive holds it, so a
        // miss here can be served from the archive without the lock.
        let content = match hot {
            Some(content) => content,
            None => self.archived_content(repo, &commit)?,
        };
        Ok((commit, content))
    }

    // === Branches ===

    /// # Errors
    /// `NotFound` if the target commit does not exist in the repository.
    pub fn upsert_branch(&self, req: &BranchRequest) -> Result<Branch> {
        req.validate()?;
        let mut repos = self.repos.lock();
        let state = repos
            .get_mut(&req.repo)
            .ok_or_else(|| Error::not_found("commit", &req.commit))?;
        let commit = state
            .commits
            .get(&req.commit)
            .ok_or_else(|| Error::not_found("commit", &req.commit))?;
        require_owned_commit(&req.repo, commit)?;

        let branch = Branch {
            repo: req.repo.clone(),
            name: req.name.clone(),
            commit: req.commit.clone(),
            updated_at: (self.clock)(),
        };
        state.branches.insert(req.name.clone(), branch.clone());
        Ok(branch)
    }

    /// # Errors
    /// `Validation` if the repository name is empty.
    pub fn list_branches(&self, repo: &str) -> Result<Vec<Branch>> {
        require_repo(repo)?;
        Ok(self
            .repos
            .lock()
            .get(repo)
            .map(|state| state.branches.values().cloned().collect())
            .unwrap_or_default())
    }

    /// # Errors
    /// `NotFound` if the branch does not exist.
    pub fn get_branch(&self, repo: &str, name: &str) -> Result<Branch> {
        require_repo_and_name(repo, name)?;
        self.repos
            .lock()
            .get(repo)
            .and_then(|state| state.branches.get(name).cloned())
            .ok_or_else(|| Error::not_found("branch", name))
    }

    // === Tags ===

    /// # Errors
    /// `NotFound` for an unknown commit, `Conflict` if the tag name is taken.
    pub fn create_tag(&self, req: &TagRequest) -> Result<Tag> {
        req.validate()?;
        let mut repos = self.repos.lock();
        let state = repos
            .get_mut(&req.repo)
            .ok_or_else(|| Error::not_found("commit", &req.commit))?;
        let commit = state
            .commits
            .get(&req.commit)
            .ok_or_else(|| Error::not_found("commit", &req.commit))?;
        require_owned_commit(&req.repo, commit)?;
        if state.tags.contains_key(&req.name) {
            return Err(Error::conflict("tag", &req.name));
        }

        let tag = Tag {
            repo: req.repo.clone(),
            name: req.name.clone(),
            commit: req.commit.clone(),
            note: req.note.clone(),
            created_at: (self.clock)(),
        };
        state.tags.insert(req.name.clone(), tag.clone());
        Ok(tag)
    }

    /// # Errors
    /// `Validation` if the repository name is empty.
    pub fn list_tags(&self, repo: &str) -> Result<Vec<Tag>> {
        require_repo(repo)?;
        Ok(self
            .repos
            .lock()
            .get(repo)
            .map(|state| state.tags.values().cloned().collect())
            .unwrap_or_default())
    }

    /// # Errors
    /// `NotFound` if the tag does not exist.
    pub fn get_tag(&self, repo: &str, name: &str) -> Result<Tag> {
        require_repo_and_name(repo, name)?;
        self.repos
            .lock()
            .get(repo)
            .and_then(|state| state.tags.get(name).cloned())
            .ok_or_else(|| Error::not_found("tag", name))
    }

    // === Retention policy ===

    /// Store and lock `policy`, then enforce it.
    ///
    /// # Errors
    /// `Validation` for negative limits, `Conflict` if a different policy is
    /// already locked.
    pub fn set_policy(&self, policy: &RetentionPolicy) -> Result<RetentionPolicy> {
        policy.validate()?;
        let stored = RetentionPolicy {
            repo: policy.repo.clone(),
            hot_commit_limit: policy.hot_commit_limit,
            hot_duration: seconds_delta(policy.hot_duration.num_seconds()),
            locked: true,
        };

        {
            let mut repos = self.repos.lock();
            let state = repos.entry(policy.repo.clone()).or_default();
            if let Some(existing) = &state.policy
                && existing.locked
                && !existing.same_limits(&stored)
            {
                return Err(Error::conflict("policy", &policy.repo));
            }
            state.policy = Some(stored.clone());
        }

        self.enforce_retention(&policy.repo);
        Ok(stored)
    }

    /// # Errors
    /// `Validation` if the repository name is empty.
    pub fn get_policy(&self, repo: &str) -> Result<RetentionPolicy> {
        require_repo(repo)?;
        Ok(self
            .repos
            .lock()
            .get(repo)
            .and_then(|state| state.policy.clone())
            .unwrap_or_else(|| self.defaults.policy_for(repo)))
    }

    // === Internals ===

    fn load_content(&self, state: &RepoState, repo: &str, hash: &str) -> Result<String> {
        if let Some(content) = state.contents.get(hash) {
            return Ok(content.clone());
        }
        match state.commits.get(hash) {
            Some(commit) => self.archived_content(repo, commit),
            None => Err(Error::not_found("content", hash)),
        }
    }

    fn archived_content(&self, repo: &str, commit: &Commit) -> Result<String> {
        match &self.archive {
            Some(archive) if commit.archived => fetch_text(archive.as_ref(), repo, &commit.hash),
            _ => Err(Error::not_found("content", &commit.hash)),
        }
    }

    /// Move overflow content to the archive. Per-commit failures are logged
    /// and left for the next pass.
    ///
    /// Archive writes run without the store lock; the hot copy is dropped
    /// only after the archive holds the payload.
    fn enforce_retention(&self, repo: &str) {
        let Some(archive) = &self.archive else {
            return;
        };
        for (hash, content) in self.plan_retention(repo) {
            match archive.store(repo, &hash, content.as_bytes()) {
                Ok(()) => {
                    self.mark_archived(repo, &hash);
                    info!(repo, commit = %hash, "archived commit content");
                }
                Err(err) => warn!(repo, commit = %hash, error = %err, "failed to archive commit"),
            }
        }
    }

    /// Commits due for archival, paired with their hot content.
    fn plan_retention(&self, repo: &str) -> Vec<(String, String)> {
        let repos = self.repos.lock();
        let Some(state) = repos.get(repo) else {
            return Vec::new();
        };
        let policy = state
            .policy
            .clone()
            .unwrap_or_else(|| self.defaults.policy_for(repo));
        if !policy.is_enabled() {
            return Vec::new();
        }

        let entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter_map(|hash| state.commits.get(hash))
            .map(|commit| HistoryEntry {
                hash: commit.hash.clone(),
                timestamp: commit.timestamp,
                archived: commit.archived,
            })
            .collect();

        plan_archival(&entries, &policy, (self.clock)())
            .into_iter()
            .filter_map(|hash| {
                let content = state.contents.get(&hash)?.clone();
                Some((hash, content))
            })
            .collect()
    }

    fn mark_archived(&self, repo: &str, hash: &str) {
        let mut repos = self.repos.lock();
        if let Some(state) = repos.get_mut(repo) {
            state.contents.remove(hash);
            if let Some(commit) = state.commits.get_mut(hash) {
                commit.archived = true;
            }
        }
    }
}

impl CommitStore for MemoryStore {
    async fn put_blob_and_commit(&self, req: BlobWriteRequest) -> Result<BlobCommitResult> {
        self.put_blob_and_commit(&req)
    }

    async fn list_commits(&self, opts: ListCommitsOptions) -> Result<Vec<Commit>> {
        self.list_commits(&opts)
    }

    async fn get_commit(&self, repo: &str, hash: &str) -> Result<(Commit, String)> {
        self.get_commit(repo, hash)
    }

    async fn upsert_branch(&self, req: BranchRequest) -> Result<Branch> {
        self.upsert_branch(&req)
    }

    async fn list_branches(&self, repo: &str) -> Result<Vec<Branch>> {
        self.list_branches(repo)
    }

    async fn get_branch(&self, repo: &str, name: &str) -> Result<Branch> {
        self.get_branch(repo, name)
    }

    async fn create_tag(&self, req: TagRequest) -> Result<Tag> {
        self.create_tag(&req)
    }

    async fn list_tags(&self, repo: &str) -> Result<Vec<Tag>> {
        self.list_tags(repo)
    }

    async fn get_tag(&self, repo: &str, name: &str) -> Result<Tag> {
        self.get_tag(repo, name)
    }

    async fn set_policy(&self, policy: RetentionPolicy) -> Result<RetentionPolicy> {
        self.set_policy(&policy)
    }

    async fn get_policy(&self, repo: &str) -> Result<RetentionPolicy> {
        self.get_policy(repo)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::{OnceLock, Weak};

    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::archive::MemoryArchive;
    use crate::conformance;

    /// Clock starting at a fixed instant that advances by `step_ms` per call
    /// and can be pushed forward with the returned handle.
    fn stepping_clock(step_ms: i64) -> (Clock, Arc<AtomicI64>) {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let offset = Arc::new(AtomicI64::new(0));
        let handle = Arc::clone(&offset);
        let clock: Clock = Arc::new(move || {
            let ms = offset.fetch_add(step_ms, Ordering::SeqCst);
            base + TimeDelta::milliseconds(ms)
        });
        (clock, handle)
    }

    fn fixed_clock(at: DateTime<Utc>) -> Clock {
        Arc::new(move || at)
    }

    fn archived_store() -> (MemoryStore, Arc<MemoryArchive>) {
        let archive = Arc::new(MemoryArchive::new());
        let store = MemoryStore::new(Some(archive.clone()), RetentionDefaults::default());
        (store, archive)
    }

    fn write(repo: &str, content: &str) -> BlobWriteRequest {
        BlobWriteRequest {
            repo: repo.into(),
            content: content.into(),
            author_name: "Alice".into(),
            author_id: "alice@id".into(),
            ..BlobWriteRequest::default()
        }
    }

    #[tokio::test]
    async fn test_versioning_scenario() {
        let (store, _) = archived_store();
        conformance::versioning_scenario(&store, "analytics").await;
    }

    #[tokio::test]
    async fn test_author_conflict_leaves_no_trace() {
        let (store, _) = archived_store();
        conformance::author_conflict_leaves_no_trace(&store, "authors").await;
    }

    #[tokio::test]
    async fn test_history_ordering_and_limit() {
        let (store, _) = archived_store();
        conformance::history_ordering_and_limit(&store, "history").await;
    }

    #[tokio::test]
    async fn test_branch_and_tag_directory() {
        let (store, _) = archived_store();
        conformance::branch_and_tag_directory(&store, "directory").await;
    }

    #[tokio::test]
    async fn test_policy_is_write_once() {
        let (store, _) = archived_store();
        conformance::policy_is_write_once(&store, "policy").await;
    }

    #[tokio::test]
    async fn test_archived_content_stays_readable() {
        let (store, archive) = archived_store();
        conformance::archived_content_stays_readable(&store, "retention").await;
        assert_eq!(archive.len("retention"), 1);
    }

    #[tokio::test]
    async fn test_write_on_archived_head_conformance() {
        let (store, archive) = archived_store();
        conformance::write_on_archived_head(&store, "cold-head").await;
        assert_eq!(archive.len("cold-head"), 2);
    }

    #[tokio::test]
    async fn test_huge_duration_policy() {
        let (store, _) = archived_store();
        conformance::huge_duration_policy(&store, "far-future").await;
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (store, _) = archived_store();
        conformance::validation_errors(&store).await;
    }

    #[test]
    fn test_age_based_archival() {
        let (clock, offset) = stepping_clock(1);
        let archive = Arc::new(MemoryArchive::new());
        let store = MemoryStore::new(Some(archive.clone()), RetentionDefaults::default())
            .with_clock(clock);

        store
            .set_policy(&RetentionPolicy::new("aged", 0, TimeDelta::minutes(10)))
            .unwrap();
        let old = store.put_blob_and_commit(&write("aged", "old\n")).unwrap();

        offset.fetch_add(TimeDelta::minutes(30).num_milliseconds(), Ordering::SeqCst);
        let fresh = store.put_blob_and_commit(&write("aged", "fresh\n")).unwrap();

        let (meta, content) = store.get_commit("aged", &old.commit_hash).unwrap();
        assert!(meta.archived);
        assert_eq!(content, "old\n");
        assert!(!store.get_commit("aged", &fresh.commit_hash).unwrap().0.archived);
        assert_eq!(archive.len("aged"), 1);
    }

    #[test]
    fn test_write_on_archived_head_reads_archive() {
        let (clock, offset) = stepping_clock(1);
        let store = archived_store().0.with_clock(clock);

        store
            .set_policy(&RetentionPolicy::new("cold", 0, TimeDelta::seconds(60)))
            .unwrap();
        let first = store.put_blob_and_commit(&write("cold", "a\n")).unwrap();

        offset.fetch_add(TimeDelta::minutes(5).num_milliseconds(), Ordering::SeqCst);
        // Re-setting the policy re-runs retention, which archives the branch head.
        store
            .set_policy(&RetentionPolicy::new("cold", 0, TimeDelta::seconds(60)))
            .unwrap();
        assert!(store.get_commit("cold", &first.commit_hash).unwrap().0.archived);

        let second = store.put_blob_and_commit(&write("cold", "b\n")).unwrap();
        assert!(second.diff.contains("-a"));
        assert!(second.diff.contains("+b"));
    }

    #[test]
    fn test_default_policy_applies_without_explicit_policy() {
        let archive = Arc::new(MemoryArchive::new());
        let defaults = RetentionDefaults {
            hot_commit_limit: 2,
            hot_duration: TimeDelta::zero(),
        };
        let store = MemoryStore::new(Some(archive.clone()), defaults);

        for i in 0..4 {
            store
                .put_blob_and_commit(&write("defaults", &format!("v{i}\n")))
                .unwrap();
        }

        assert_eq!(archive.len("defaults"), 2);
        let policy = store.get_policy("defaults").unwrap();
        assert_eq!(policy.hot_commit_limit, 2);
        assert!(!policy.locked);
    }

    #[test]
    fn test_retention_without_archive_is_noop() {
        let store = MemoryStore::new(None, RetentionDefaults::default());
        store
            .set_policy(&RetentionPolicy::new("plain", 1, TimeDelta::zero()))
            .unwrap();
        let first = store.put_blob_and_commit(&write("plain", "1\n")).unwrap();
        store.put_blob_and_commit(&write("plain", "2\n")).unwrap();

        let (meta, content) = store.get_commit("plain", &first.commit_hash).unwrap();
        assert!(!meta.archived);
        assert_eq!(content, "1\n");
    }

    #[test]
    fn test_hash_collision_is_rejected() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let store = MemoryStore::new(None, RetentionDefaults::default()).with_clock(fixed_clock(at));

        let first = store.put_blob_and_commit(&write("clash", "one\n")).unwrap();
        store.put_blob_and_commit(&write("clash", "two\n")).unwrap();

        // Rewind the branch so the next write repeats parent, content and instant.
        store
            .upsert_branch(&BranchRequest {
                repo: "clash".into(),
                name: "main".into(),
                commit: first.commit_hash.clone(),
            })
            .unwrap();
        let err = store
            .put_blob_and_commit(&write("clash", "two\n"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get_branch("clash", "main").unwrap().commit, first.commit_hash);
    }

    #[test]
    fn test_concurrent_writers_keep_linear_history() {
        let store = MemoryStore::new(None, RetentionDefaults::default());

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..10 {
                        store
                            .put_blob_and_commit(&write("race", &format!("{worker}-{i}\n")))
                            .unwrap();
                    }
                });
            }
        });

        let commits = store
            .list_commits(&ListCommitsOptions {
                repo: "race".into(),
                ..ListCommitsOptions::default()
            })
            .unwrap();
        assert_eq!(commits.len(), 80);
        for pair in commits.windows(2) {
            assert_eq!(pair[1].parent, pair[0].hash);
        }
        assert_eq!(
            store.get_branch("race", "main").unwrap().commit,
            commits[79].hash
        );
    }

    #[test]
    fn test_repositories_are_independent() {
        let store = MemoryStore::new(None, RetentionDefaults::default());
        store.put_blob_and_commit(&write("one", "x\n")).unwrap();

        let mut bob = write("two", "y\n");
        bob.author_name = "Bob".into();
        store.put_blob_and_commit(&bob).unwrap();

        assert!(store.list_branches("three").unwrap().is_empty());
        assert!(store.get_branch("two", "main").is_ok());
    }

    #[test]
    fn test_huge_duration_policy_does_not_block_writes() {
        let (store, archive) = archived_store();
        let first = store.put_blob_and_commit(&write("far", "1\n")).unwrap();

        let policy = store
            .set_policy(&RetentionPolicy::new("far", 0, seconds_delta(10_000_000_000_000)))
            .unwrap();
        assert!(policy.locked);

        store.put_blob_and_commit(&write("far", "2\n")).unwrap();
        assert_eq!(archive.len("far"), 0);
        assert!(!store.get_commit("far", &first.commit_hash).unwrap().0.archived);
    }

    /// Archive that records whether the store lock was free during `store`.
    struct LockCheckingArchive {
        inner: MemoryArchive,
        store: OnceLock<Weak<MemoryStore>>,
        saw_free_lock: AtomicBool,
    }

    impl Archive for LockCheckingArchive {
        fn store(&self, repo: &str, hash: &str, data: &[u8]) -> Result<()> {
            if let Some(store) = self.store.get().and_then(Weak::upgrade) {
                let free = store.repos.try_lock().is_some();
                self.saw_free_lock.store(free, Ordering::SeqCst);
            }
            self.inner.store(repo, hash, data)
        }

        fn fetch(&self, repo: &str, hash: &str) -> Result<Vec<u8>> {
            self.inner.fetch(repo, hash)
        }

        fn remove(&self, repo: &str, hash: &str) -> Result<()> {
            self.inner.remove(repo, hash)
        }

        fn close(&self) -> Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn test_archive_writes_run_without_store_lock() {
        let archive = Arc::new(LockCheckingArchive {
            inner: MemoryArchive::new(),
            store: OnceLock::new(),
            saw_free_lock: AtomicBool::new(false),
        });
        let store = Arc::new(MemoryStore::new(
            Some(archive.clone()),
            RetentionDefaults::default(),
        ));
        archive.store.set(Arc::downgrade(&store)).unwrap();

        store
            .set_policy(&RetentionPolicy::new("busy", 1, TimeDelta::zero()))
            .unwrap();
        let first = store.put_blob_and_commit(&write("busy", "1\n")).unwrap();
        store.put_blob_and_commit(&write("busy", "2\n")).unwrap();

        assert_eq!(archive.inner.len("busy"), 1);
        assert!(archive.saw_free_lock.load(Ordering::SeqCst));
        let (meta, content) = store.get_commit("busy", &first.commit_hash).unwrap();
        assert!(meta.archived);
        assert_eq!(content, "1\n");
    }
}
