//! # kvvs-core
//!
//! Core library for kv-vs: the commit model, content hashing and diffs,
//! retention planning, archive backends, configuration, and the in-process
//! [`MemoryStore`]. The networked store lives in `kvvs-keydb` and implements
//! the same [`CommitStore`] trait.

pub mod archive;
pub mod clock;
pub mod config;
pub mod diff;
mod error;
pub mod hash;
mod memory_store;
pub mod retention;
mod traits;
pub mod types;
pub mod validate;

#[cfg(any(test, feature = "conformance"))]
pub mod conformance;

pub use archive::{Archive, MemoryArchive, SledArchive, open_archive};
pub use clock::{Clock, system_clock};
pub use config::{ArchiveBackend, Config, KeyDbConfig, RetentionConfig, StorageBackend};
pub use error::{Error, ErrorKind, Result};
pub use memory_store::MemoryStore;
pub use traits::CommitStore;
pub use types::{
    AUTO_COMMIT_MESSAGE, BlobCommitResult, BlobWriteRequest, Branch, BranchRequest, Commit,
    DEFAULT_BRANCH, ListCommitsOptions, PolicyRecord, RetentionDefaults, RetentionPolicy, Tag,
    TagRequest,
};
