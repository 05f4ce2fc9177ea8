//! Cold storage for content evicted from the hot tier.
//!
//! Payloads are addressed by `(repository, commit hash)`, the same address
//! the hot tier uses, so reads can fall back without translation.

mod embedded;
mod memory;

use std::sync::Arc;

pub use self::embedded::SledArchive;
pub use self::memory::MemoryArchive;

use crate::Result;
use crate::config::{ArchiveBackend, RetentionConfig};

/// Capability interface for archive storage.
///
/// Implementations must be safe to share between stores and tasks.
#[allow(clippy::missing_errors_doc)]
pub trait Archive: Send + Sync {
    /// Persist `data` under `repo`/`hash`, replacing any previous payload.
    ///
    /// Returns only once the payload is durable.
    fn store(&self, repo: &str, hash: &str, data: &[u8]) -> Result<()>;

    /// Read the payload for `repo`/`hash`, `NotFound` if absent.
    fn fetch(&self, repo: &str, hash: &str) -> Result<Vec<u8>>;

    /// Delete the payload for `repo`/`hash`; deleting an absent entry succeeds.
    fn remove(&self, repo: &str, hash: &str) -> Result<()>;

    /// Flush and release resources. Safe to call more than once.
    fn close(&self) -> Result<()>;
}

/// Open the archive selected by the retention configuration.
///
/// Returns `None` when archival is disabled.
///
/// # Errors
/// Returns error if the persistent archive cannot be opened.
pub fn open_archive(config: &RetentionConfig) -> Result<Option<Arc<dyn Archive>>> {
    Ok(match config.archive {
        ArchiveBackend::None => None,
        ArchiveBackend::Memory => Some(Arc::new(MemoryArchive::new())),
        ArchiveBackend::Sled => Some(Arc::new(SledArchive::open(&config.archive_path)?)),
    })
}

/// Fetch archived content for `repo`/`hash` as text.
///
/// # Errors
/// Returns `NotFound` if the archive holds no payload, or `Corrupt` if the
/// payload is not valid UTF-8.
pub fn fetch_text(archive: &dyn Archive, repo: &str, hash: &str) -> Result<String> {
    let bytes = archive.fetch(repo, hash)?;
    String::from_utf8(bytes).map_err(|e| crate::Error::Corrupt {
        resource: "archived content",
        key: hash.to_owned(),
        message: e.to_string(),
    })
}
