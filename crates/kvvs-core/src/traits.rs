//! Trait abstraction over commit store backends.
//!
//! This module defines the `CommitStore` trait implemented by the in-process
//! [`MemoryStore`](crate::MemoryStore) and by the networked store in
//! `kvvs-keydb`. Both must be observably identical; callers pick one at
//! startup and stay generic over the trait.

use std::future::Future;

use crate::Result;
use crate::types::{
    BlobCommitResult, BlobWriteRequest, Branch, BranchRequest, Commit, ListCommitsOptions,
    RetentionPolicy, Tag, TagRequest,
};

/// Versioned blob storage with branches, tags and retention.
///
/// Every operation is cancellable by dropping its future.
#[allow(clippy::missing_errors_doc)]
pub trait CommitStore: Send + Sync {
    // === Write path ===

    /// Commit `content` as the new head of the request's branch.
    ///
    /// Fails with `Conflict` if the author id is bound to another name in this
    /// repository, leaving no trace of the attempt. Triggers retention
    /// enforcement once the commit is visible.
    fn put_blob_and_commit(
        &self,
        req: BlobWriteRequest,
    ) -> impl Future<Output = Result<BlobCommitResult>> + Send;

    // === History ===

    /// Commits of a repository in creation order, or newest first.
    ///
    /// Entries whose metadata cannot be loaded are skipped.
    fn list_commits(
        &self,
        opts: ListCommitsOptions,
    ) -> impl Future<Output = Result<Vec<Commit>>> + Send;

    /// Commit metadata and content, reading archived content from the archive.
    fn get_commit(
        &self,
        repo: &str,
        hash: &str,
    ) -> impl Future<Output = Result<(Commit, String)>> + Send;

    // === Branches ===

    /// Point a branch at an existing commit of the same repository.
    fn upsert_branch(&self, req: BranchRequest) -> impl Future<Output = Result<Branch>> + Send;

    /// All branches of a repository, sorted by name.
    fn list_branches(&self, repo: &str) -> impl Future<Output = Result<Vec<Branch>>> + Send;

    /// One branch, `NotFound` if absent.
    fn get_branch(&self, repo: &str, name: &str) -> impl Future<Output = Result<Branch>> + Send;

    // === Tags ===

    /// Create a tag; `Conflict` if the name is taken.
    fn create_tag(&self, req: TagRequest) -> impl Future<Output = Result<Tag>> + Send;

    /// All tags of a repository, sorted by name.
    fn list_tags(&self, repo: &str) -> impl Future<Output = Result<Vec<Tag>>> + Send;

    /// One tag, `NotFound` if absent.
    fn get_tag(&self, repo: &str, name: &str) -> impl Future<Output = Result<Tag>> + Send;

    // === Retention policy ===

    /// Store and lock a policy, then enforce it.
    ///
    /// Re-setting identical limits succeeds; different limits fail `Conflict`.
    fn set_policy(
        &self,
        policy: RetentionPolicy,
    ) -> impl Future<Output = Result<RetentionPolicy>> + Send;

    /// The repository's policy, or the configured default bound to `repo`.
    fn get_policy(&self, repo: &str) -> impl Future<Output = Result<RetentionPolicy>> + Send;
}
