//! Map-backed archive for tests and ephemeral deployments.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::Archive;
use crate::{Error, Result};

/// In-memory archive keyed by repository, then commit hash.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    data: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads held for `repo`.
    #[must_use]
    pub fn len(&self, repo: &str) -> usize {
        self.data.read().get(repo).map_or(0, HashMap::len)
    }
}

impl Archive for MemoryArchive {
    fn store(&self, repo: &str, hash: &str, data: &[u8]) -> Result<()> {
        self.data
            .write()
            .entry(repo.to_owned())
            .or_default()
            .insert(hash.to_owned(), data.to_vec());
        Ok(())
    }

    fn fetch(&self, repo: &str, hash: &str) -> Result<Vec<u8>> {
        self.data
            .read()
            .get(repo)
            .and_then(|payloads| payloads.get(hash))
            .cloned()
            .ok_or_else(|| Error::not_found("archive", hash))
    }

    fn remove(&self, repo: &str, hash: &str) -> Result<()> {
        if let Some(payloads) = self.data.write().get_mut(repo) {
            payloads.remove(hash);
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_fetch_remove() {
        let archive = MemoryArchive::new();
        archive.store("repo", "h1", b"payload").unwrap();

        assert_eq!(archive.fetch("repo", "h1").unwrap(), b"payload");
        assert_eq!(archive.len("repo"), 1);

        archive.remove("repo", "h1").unwrap();
        assert!(archive.fetch("repo", "h1").unwrap_err().is_not_found());
        archive.remove("repo", "h1").unwrap();
    }

    #[test]
    fn test_repositories_are_isolated() {
        let archive = MemoryArchive::new();
        archive.store("a", "h", b"one").unwrap();

        assert!(archive.fetch("b", "h").unwrap_err().is_not_found());
        assert_eq!(archive.len("b"), 0);
    }
}
