//! Persistent archive on an embedded log-structured store.

use std::fs;
use std::path::Path;

use super::Archive;
use crate::{Error, Result};

/// Archive backed by a sled database, one tree per repository.
pub struct SledArchive {
    db: sled::Db,
}

impl SledArchive {
    const TREE_PREFIX: &'static str = "repos/";

    /// Open (or create) the archive at `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns error if the path is empty or the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::validation("archive path is required"));
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn tree(&self, repo: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(format!("{}{repo}", Self::TREE_PREFIX))?)
    }
}

impl Archive for SledArchive {
    fn store(&self, repo: &str, hash: &str, data: &[u8]) -> Result<()> {
        let tree = self.tree(repo)?;
        tree.insert(hash.as_bytes(), data)?;
        tree.flush()?;
        Ok(())
    }

    fn fetch(&self, repo: &str, hash: &str) -> Result<Vec<u8>> {
        let tree = self.tree(repo)?;
        tree.get(hash.as_bytes())?
            .map(|value| value.to_vec())
            .ok_or_else(|| Error::not_found("archive", hash))
    }

    fn remove(&self, repo: &str, hash: &str) -> Result<()> {
        self.tree(repo)?.remove(hash.as_bytes())?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_payload_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/archive.db");

        {
            let archive = SledArchive::open(&path).unwrap();
            archive.store("analytics", "abc", b"line one\n").unwrap();
            archive.close().unwrap();
            archive.close().unwrap();
        }

        let archive = SledArchive::open(&path).unwrap();
        assert_eq!(archive.fetch("analytics", "abc").unwrap(), b"line one\n");
    }

    #[test]
    fn test_missing_entries_are_not_found() {
        let temp = TempDir::new().unwrap();
        let archive = SledArchive::open(temp.path().join("archive.db")).unwrap();

        archive.store("a", "h", b"x").unwrap();
        assert!(archive.fetch("a", "other").unwrap_err().is_not_found());
        assert!(archive.fetch("b", "h").unwrap_err().is_not_found());

        archive.remove("a", "h").unwrap();
        assert!(archive.fetch("a", "h").unwrap_err().is_not_found());
        archive.remove("a", "h").unwrap();
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let err = SledArchive::open("").err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}
