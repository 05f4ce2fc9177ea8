//! `CommitStore` on a KeyDB/Redis server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kvvs_core::archive::fetch_text;
use kvvs_core::diff::unified_diff;
use kvvs_core::hash::{commit_hash, content_hash};
use kvvs_core::retention::{HistoryEntry, plan_archival};
use kvvs_core::types::seconds_delta;
use kvvs_core::validate::{require_owned_commit, require_repo, require_repo_and_name};
use kvvs_core::{
    AUTO_COMMIT_MESSAGE, Archive, BlobCommitResult, BlobWriteRequest, Branch, BranchRequest,
    Clock, Commit, CommitStore, KeyDbConfig, ListCommitsOptions, PolicyRecord, RetentionDefaults,
    RetentionPolicy, Tag, TagRequest, system_clock,
};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::keys;
use crate::retry::RetryPolicy;

/// Networked [`CommitStore`].
///
/// Reads share one multiplexed connection. Every optimistic write attempt opens
/// its own connection, since WATCH state belongs to the connection.
pub struct KeyDbStore {
    client: Client,
    shared: MultiplexedConnection,
    archive: Option<Arc<dyn Archive>>,
    defaults: RetentionDefaults,
    clock: Clock,
    operation_timeout: Duration,
    retry: RetryPolicy,
}

impl KeyDbStore {
    /// Connect to the server described by `config` and verify it answers.
    ///
    /// # Errors
    /// Returns error if the URL is invalid, the server is unreachable, or the
    /// connection does not complete within the operation timeout.
    pub async fn connect(
        config: &KeyDbConfig,
        archive: Option<Arc<dyn Archive>>,
        defaults: RetentionDefaults,
    ) -> Result<Self> {
        let client = Client::open(config.connection_url())?;
        let operation_timeout = config.operation_timeout();

        let mut shared = deadline(operation_timeout, async {
            Ok(client.get_multiplexed_async_connection().await?)
        })
        .await?;
        deadline(operation_timeout, async {
            let _: String = redis::cmd("PING").query_async(&mut shared).await?;
            Ok(())
        })
        .await?;

        debug!(addr = %config.addr, database = config.database, "connected to keydb");
        Ok(Self {
            client,
            shared,
            archive,
            defaults,
            clock: system_clock(),
            operation_timeout,
            retry: RetryPolicy::new(config.max_commit_retries, config.retry_backoff()),
        })
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
    /// mismatch or hash collision, `RetriesExhausted` under sustained contention.
    pub async fn put_blob_and_commit(&self, req: &BlobWriteRequest) -> Result<BlobCommitResult> {
        req.validate()?;
        let branch = req.effective_branch();
        let watched = keys::branch(&req.repo, branch);

        let result = self
            .optimistic(&watched, |con| self.try_commit(con, req, branch))
            .await?;

        debug!(repo = %req.repo, branch = %result.branch, commit = %result.commit_hash, "committed");
        self.enforce_retention(&req.repo).await;
        Ok(result)
    }

    /// One read-compute-EXEC cycle. `None` means a watched key changed.
    async fn try_commit(
        &self,
        mut con: MultiplexedConnection,
        req: &BlobWriteRequest,
        branch: &str,
    ) -> Result<Option<BlobCommitResult>> {
        let repo = req.repo.as_str();
        let branch_key = keys::branch(repo, branch);
        let history_key = keys::history(repo);
        let author_key = keys::author(repo, &req.author_id);

        let _: () = redis::cmd("WATCH")
            .arg(&branch_key)
            .arg(&history_key)
            .arg(&author_key)
            .query_async(&mut con)
            .await?;

        let head: Option<Branch> = get_json(&mut con, &branch_key).await?;
        let parent = head.map(|b| b.commit).unwrap_or_default();
        let previous = if parent.is_empty() {
            String::new()
        } else {
            self.load_content(&mut con, repo, &parent).await?
        };

        let bound: Option<String> = con.get(&author_key).await?;
        if let Some(bound) = &bound
            && *bound != req.author_name
        {
            return Err(kvvs_core::Error::conflict("author", &req.author_id).into());
        }

        let now = (self.clock)();
        let diff = unified_diff(&previous, &req.content);
        let hash = commit_hash(repo, branch, &parent, &req.content, now);
        let commit_key = keys::commit(repo, &hash);
        let exists: bool = con.exists(&commit_key).await?;
        if exists {
            return Err(kvvs_core::Error::conflict("commit", hash).into());
        }

        let commit = Commit {
            repo: repo.to_owned(),
            branch: branch.to_owned(),
            hash: hash.clone(),
            parent,
            author_name: req.author_name.clone(),
            author_id: req.author_id.clone(),
            message: AUTO_COMMIT_MESSAGE.to_owned(),
            content_hash: content_hash(&req.content),
            timestamp: now,
            archived: false,
        };
        let pointer = Branch {
            repo: repo.to_owned(),
            name: branch.to_owned(),
            commit: hash.clone(),
            updated_at: now,
        };

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(&commit_key, serde_json::to_string(&commit)?)
            .ignore()
            .set(keys::content(repo, &hash), &req.content)
            .ignore()
            .set(&branch_key, serde_json::to_string(&pointer)?)
            .ignore()
            .sadd(keys::branch_set(repo), branch)
            .ignore()
            .zadd(&history_key, &hash, keys::history_score(now))
            .ignore();
        if bound.is_none() {
            pipe.set(&author_key, &req.author_name).ignore();
        }

        let committed: Option<()> = pipe.query_async(&mut con).await?;
        Ok(committed.map(|()| BlobCommitResult {
            commit_hash: hash,
            branch: branch.to_owned(),
            created_at: now,
            diff,
        }))
    }

    /// Run `attempt` on fresh connections until it commits, fails, or the
    /// retry ceiling is reached.
    async fn optimistic<T, F, Fut>(&self, key: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(MultiplexedConnection) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.retry
            .run(
                key,
                || self.deadline(async { Ok(self.client.get_multiplexed_async_connection().await?) }),
                |con| self.deadline(attempt(con)),
            )
            .await
    }

    // === History ===

    /// # Errors
    /// `Validation` for an empty repository name; index read failures.
    pub async fn list_commits(&self, opts: &ListCommitsOptions) -> Result<Vec<Commit>> {
        require_repo(&opts.repo)?;
        let mut con = self.shared.clone();
        let stop = isize::try_from(opts.limit).map_or(-1, |limit| limit - 1);
        let history_key = keys::history(&opts.repo);

        let hashes: Vec<String> = self
            .deadline(async {
                Ok(if opts.descending {
                    con.zrevrange(&history_key, 0, stop).await?
                } else {
                    con.zrange(&history_key, 0, stop).await?
                })
            })
            .await?;

        let commit_keys: Vec<String> = hashes.iter().map(|h| keys::commit(&opts.repo, h)).collect();
        self.deadline(get_many_json(&mut con, &commit_keys)).await
    }

    /// Metadata and content of one commit.
    ///
    /// # Errors
    /// `NotFound` if the commit is unknown or its content is in neither tier.
    pub async fn get_commit(&self, repo: &str, hash: &str) -> Result<(Commit, String)> {
        if repo.is_empty() || hash.is_empty() {
            return Err(kvvs_core::Error::validation("repo and hash are required").into());
        }
        let mut con = self.shared.clone();
        self.deadline(async {
            let commit_key = keys::commit(repo, hash);
            let mut commit: Commit = get_json(&mut con, &commit_key)
                .await?
                .ok_or_else(|| kvvs_core::Error::not_found("commit", hash))?;

            let hot: Option<String> = con.get(keys::content(repo, hash)).await?;
            if let Some(content) = hot {
                return Ok((commit, content));
            }
            // Archival may have flipped the flag between the two reads.
            if !commit.archived
                && let Some(fresh) = get_json::<Commit>(&mut con, &commit_key).await?
            {
                commit = fresh;
            }
            let content = self.archived_content(&commit).await?;
            Ok((commit, content))
        })
        .await
    }

    // === Branches ===

    /// Point a branch at an existing commit, last writer wins.
    ///
    /// # Errors
    /// `NotFound` if the commit does not exist in the repository.
    pub async fn upsert_branch(&self, req: &BranchRequest) -> Result<Branch> {
        req.validate()?;
        let mut con = self.shared.clone();
        self.deadline(async {
            self.require_commit(&mut con, &req.repo, &req.commit).await?;
            let branch = Branch {
                repo: req.repo.clone(),
                name: req.name.clone(),
                commit: req.commit.clone(),
                updated_at: (self.clock)(),
            };
            let _: () = redis::pipe()
                .atomic()
                .set(keys::branch(&req.repo, &req.name), serde_json::to_string(&branch)?)
                .ignore()
                .sadd(keys::branch_set(&req.repo), &req.name)
                .ignore()
                .query_async(&mut con)
                .await?;
            Ok(branch)
        })
        .await
    }

    /// # Errors
    /// `Validation` for an empty repository name.
    pub async fn list_branches(&self, repo: &str) -> Result<Vec<Branch>> {
        require_repo(repo)?;
        let mut con = self.shared.clone();
        self.deadline(async {
            let mut names: Vec<String> = con.smembers(keys::branch_set(repo)).await?;
            names.sort();
            let branch_keys: Vec<String> = names.iter().map(|n| keys::branch(repo, n)).collect();
            get_many_json(&mut con, &branch_keys).await
        })
        .await
    }

    /// # Errors
    /// `NotFound` if the branch does not exist.
    pub async fn get_branch(&self, repo: &str, name: &str) -> Result<Branch> {
        require_repo_and_name(repo, name)?;
        let mut con = self.shared.clone();
        let found: Option<Branch> = self
            .deadline(get_json(&mut con, &keys::branch(repo, name)))
            .await?;
        found.ok_or_else(|| Error::from(kvvs_core::Error::not_found("branch", name)))
    }

    // === Tags ===

    /// # Errors
    /// `NotFound` for an unknown commit, `Conflict` if the tag name is taken.
    pub async fn create_tag(&self, req: &TagRequest) -> Result<Tag> {
        req.validate()?;
        {
            let mut con = self.shared.clone();
            self.deadline(self.require_commit(&mut con, &req.repo, &req.commit))
                .await?;
        }

        let tag_key = keys::tag(&req.repo, &req.name);
        self.optimistic(&tag_key, |mut con| {
            let tag_key = tag_key.clone();
            async move {
                let _: () = redis::cmd("WATCH").arg(&tag_key).query_async(&mut con).await?;
                let taken: bool = con.exists(&tag_key).await?;
                if taken {
                    return Err(kvvs_core::Error::conflict("tag", &req.name).into());
                }

                let tag = Tag {
                    repo: req.repo.clone(),
                    name: req.name.clone(),
                    commit: req.commit.clone(),
                    note: req.note.clone(),
                    created_at: (self.clock)(),
                };
                let created: Option<()> = redis::pipe()
                    .atomic()
                    .set(&tag_key, serde_json::to_string(&tag)?)
                    .ignore()
                    .sadd(keys::tag_set(&req.repo), &req.name)
                    .ignore()
                    .query_async(&mut con)
                    .await?;
                Ok(created.map(|()| tag))
            }
        })
        .await
    }

    /// # Errors
    /// `Validation` for an empty repository name.
    pub async fn list_tags(&self, repo: &str) -> Result<Vec<Tag>> {
        require_repo(repo)?;
        let mut con = self.shared.clone();
        self.deadline(async {
            let mut names: Vec<String> = con.smembers(keys::tag_set(repo)).await?;
            names.sort();
            let tag_keys: Vec<String> = names.iter().map(|n| keys::tag(repo, n)).collect();
            get_many_json(&mut con, &tag_keys).await
        })
        .await
    }

    /// # Errors
    /// `NotFound` if the tag does not exist.
    pub async fn get_tag(&self, repo: &str, name: &str) -> Result<Tag> {
        require_repo_and_name(repo, name)?;
        let mut con = self.shared.clone();
        let found: Option<Tag> = self
            .deadline(get_json(&mut con, &keys::tag(repo, name)))
            .await?;
        found.ok_or_else(|| Error::from(kvvs_core::Error::not_found("tag", name)))
    }

    // === Retention policy ===

    /// Store and lock `policy`, then enforce it.
    ///
    /// # Errors
    /// `Validation` for negative limits, `Conflict` if a different policy is
    /// already locked.
    pub async fn set_policy(&self, policy: &RetentionPolicy) -> Result<RetentionPolicy> {
        policy.validate()?;
        let stored = RetentionPolicy {
            repo: policy.repo.clone(),
            hot_commit_limit: policy.hot_commit_limit,
            hot_duration: seconds_delta(policy.hot_duration.num_seconds()),
            locked: true,
        };
        let policy_key = keys::policy(&policy.repo);

        self.optimistic(&policy_key, |mut con| {
            let (policy_key, stored) = (policy_key.clone(), stored.clone());
            async move {
                let _: () = redis::cmd("WATCH").arg(&policy_key).query_async(&mut con).await?;
                let existing: Option<PolicyRecord> = get_json(&mut con, &policy_key).await?;
                if let Some(existing) = existing
                    && existing.locked
                    && !existing.to_policy(&stored.repo).same_limits(&stored)
                {
                    return Err(kvvs_core::Error::conflict("policy", &stored.repo).into());
                }

                let written: Option<()> = redis::pipe()
                    .atomic()
                    .set(&policy_key, serde_json::to_string(&stored.to_record())?)
                    .ignore()
                    .query_async(&mut con)
                    .await?;
                Ok(written)
            }
        })
        .await?;

        self.enforce_retention(&policy.repo).await;
        Ok(stored)
    }

    /// # Errors
    /// `Validation` for an empty repository name.
    pub async fn get_policy(&self, repo: &str) -> Result<RetentionPolicy> {
        require_repo(repo)?;
        let mut con = self.shared.clone();
        self.deadline(self.load_policy(&mut con, repo)).await
    }

    async fn load_policy(
        &self,
        con: &mut MultiplexedConnection,
        repo: &str,
    ) -> Result<RetentionPolicy> {
        let record: Option<PolicyRecord> = get_json(con, &keys::policy(repo)).await?;
        Ok(record.map_or_else(|| self.defaults.policy_for(repo), |r| r.to_policy(repo)))
    }

    // === Retention ===

    /// Move overflow content to the archive, logging instead of failing.
    ///
    /// Planning and each commit's archival get their own deadline, so a long
    /// backlog makes progress instead of timing out as a whole.
    async fn enforce_retention(&self, repo: &str) {
        let Some(archive) = &self.archive else {
            return;
        };
        let planned = match self.deadline(self.plan_retention(repo)).await {
            Ok(planned) => planned,
            Err(err) => {
                warn!(repo, error = %err, "retention pass failed");
                return;
            }
        };

        for hash in planned {
            let mut con = self.shared.clone();
            match self
                .deadline(self.archive_commit(&mut con, archive, repo, &hash))
                .await
            {
                Ok(()) => info!(repo, commit = %hash, "archived commit content"),
                Err(err) => warn!(repo, commit = %hash, error = %err, "failed to archive commit"),
            }
        }
    }

    /// Hashes due for archival under the repository's effective policy.
    async fn plan_retention(&self, repo: &str) -> Result<Vec<String>> {
        let mut con = self.shared.clone();
        let policy = self.load_policy(&mut con, repo).await?;
        if !policy.is_enabled() {
            return Ok(Vec::new());
        }

        let hashes: Vec<String> = con.zrange(keys::history(repo), 0, -1).await?;
        let commit_keys: Vec<String> = hashes.iter().map(|h| keys::commit(repo, h)).collect();
        let commits: Vec<Commit> = get_many_json(&mut con, &commit_keys).await?;
        let entries: Vec<HistoryEntry> = commits
            .into_iter()
            .map(|c| HistoryEntry {
                hash: c.hash,
                timestamp: c.timestamp,
                archived: c.archived,
            })
            .collect();

        Ok(plan_archival(&entries, &policy, (self.clock)()))
    }

    /// Copy content to the archive, then flip the flag and drop the hot copy
    /// in one transaction.
    async fn archive_commit(
        &self,
        con: &mut MultiplexedConnection,
        archive: &Arc<dyn Archive>,
        repo: &str,
        hash: &str,
    ) -> Result<()> {
        let commit_key = keys::commit(repo, hash);
        let content_key = keys::content(repo, hash);

        let mut commit: Commit = get_json(con, &commit_key)
            .await?
            .ok_or_else(|| kvvs_core::Error::not_found("commit", hash))?;
        if commit.archived {
            return Ok(());
        }
        let content: Option<String> = con.get(&content_key).await?;
        let content = content.ok_or_else(|| kvvs_core::Error::not_found("content", hash))?;

        let (archive, owner, key) = (Arc::clone(archive), repo.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || archive.store(&owner, &key, content.as_bytes()))
            .await??;

        commit.archived = true;
        let _: () = redis::pipe()
            .atomic()
            .set(&commit_key, serde_json::to_string(&commit)?)
            .ignore()
            .del(&content_key)
            .ignore()
            .query_async(con)
            .await?;
        Ok(())
    }

    // === Internals ===

    async fn load_content(
        &self,
        con: &mut MultiplexedConnection,
        repo: &str,
        hash: &str,
    ) -> Result<String> {
        let hot: Option<String> = con.get(keys::content(repo, hash)).await?;
        if let Some(content) = hot {
            return Ok(content);
        }
        let commit: Commit = get_json(con, &keys::commit(repo, hash))
            .await?
            .ok_or_else(|| kvvs_core::Error::not_found("content", hash))?;
        self.archived_content(&commit).await
    }

    async fn archived_content(&self, commit: &Commit) -> Result<String> {
        match &self.archive {
            Some(archive) if commit.archived => {
                let (archive, repo, hash) =
                    (Arc::clone(archive), commit.repo.clone(), commit.hash.clone());
                Ok(tokio::task::spawn_blocking(move || {
                    fetch_text(archive.as_ref(), &repo, &hash)
                })
                .await??)
            }
            _ => Err(kvvs_core::Error::not_found("content", &commit.hash).into()),
        }
    }

    async fn require_commit(
        &self,
        con: &mut MultiplexedConnection,
        repo: &str,
        hash: &str,
    ) -> Result<Commit> {
        let commit: Commit = get_json(con, &keys::commit(repo, hash))
            .await?
            .ok_or_else(|| kvvs_core::Error::not_found("commit", hash))?;
        require_owned_commit(repo, &commit)?;
        Ok(commit)
    }

    async fn deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        deadline(self.operation_timeout, fut).await
    }
}

async fn deadline<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(kvvs_core::Error::Timeout(limit).into()))
}

async fn get_json<T: DeserializeOwned>(
    con: &mut MultiplexedConnection,
    key: &str,
) -> Result<Option<T>> {
    let raw: Option<String> = con.get(key).await?;
    Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
}

/// Fetch and decode `record_keys` in order, skipping missing or undecodable records.
async fn get_many_json<T: DeserializeOwned>(
    con: &mut MultiplexedConnection,
    record_keys: &[String],
) -> Result<Vec<T>> {
    if record_keys.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<Option<String>> = redis::cmd("MGET").arg(record_keys).query_async(con).await?;
    Ok(record_keys
        .iter()
        .zip(raw)
        .filter_map(|(key, value)| {
            let value = value?;
            serde_json::from_str(&value)
                .inspect_err(|err| debug!(key = %key, error = %err, "skipping unreadable record"))
                .ok()
        })
        .collect())
}

impl CommitStore for KeyDbStore {
    async fn put_blob_and_commit(
        &self,
        req: BlobWriteRequest,
    ) -> kvvs_core::Result<BlobCommitResult> {
        Ok(self.put_blob_and_commit(&req).await?)
    }

    async fn list_commits(&self, opts: ListCommitsOptions) -> kvvs_core::Result<Vec<Commit>> {
        Ok(self.list_commits(&opts).await?)
    }

    async fn get_commit(&self, repo: &str, hash: &str) -> kvvs_core::Result<(Commit, String)> {
        Ok(self.get_commit(repo, hash).await?)
    }

    async fn upsert_branch(&self, req: BranchRequest) -> kvvs_core::Result<Branch> {
        Ok(self.upsert_branch(&req).await?)
    }

    async fn list_branches(&self, repo: &str) -> kvvs_core::Result<Vec<Branch>> {
        Ok(self.list_branches(repo).await?)
    }

    async fn get_branch(&self, repo: &str, name: &str) -> kvvs_core::Result<Branch> {
        Ok(self.get_branch(repo, name).await?)
    }

    async fn create_tag(&self, req: TagRequest) -> kvvs_core::Result<Tag> {
        Ok(self.create_tag(&req).await?)
    }

    async fn list_tags(&self, repo: &str) -> kvvs_core::Result<Vec<Tag>> {
        Ok(self.list_tags(repo).await?)
    }

    async fn get_tag(&self, repo: &str, name: &str) -> kvvs_core::Result<Tag> {
        Ok(self.get_tag(repo, name).await?)
    }

    async fn set_policy(&self, policy: RetentionPolicy) -> kvvs_core::Result<RetentionPolicy> {
        Ok(self.set_policy(&policy).await?)
    }

    async fn get_policy(&self, repo: &str) -> kvvs_core::Result<RetentionPolicy> {
        Ok(self.get_policy(repo).await?)
    }
}
