//! Input checks shared by every backend.

use chrono::TimeDelta;

use crate::error::{Error, Result};
use crate::types::{BlobWriteRequest, BranchRequest, Commit, RetentionPolicy, TagRequest};

impl BlobWriteRequest {
    /// Reject writes missing a repository, content or author identity.
    ///
    /// # Errors
    /// Returns `Validation` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.repo.is_empty() {
            return Err(Error::validation("repository name is required"));
        }
        if self.content.is_empty() {
            return Err(Error::validation("content is required"));
        }
        if self.author_name.is_empty() || self.author_id.is_empty() {
            return Err(Error::validation("author name and id are required"));
        }
        Ok(())
    }
}

impl BranchRequest {
    /// # Errors
    /// Returns `Validation` if any field is empty.
    pub fn validate(&self) -> Result<()> {
        require_pointer_fields(&self.repo, &self.name, &self.commit)
    }
}

impl TagRequest {
    /// # Errors
    /// Returns `Validation` if the repository, name or commit is empty.
    pub fn validate(&self) -> Result<()> {
        require_pointer_fields(&self.repo, &self.name, &self.commit)
    }
}

impl RetentionPolicy {
    /// # Errors
    /// Returns `Validation` for an empty repository or negative limits.
    pub fn validate(&self) -> Result<()> {
        require_repo(&self.repo)?;
        if self.hot_commit_limit < 0 {
            return Err(Error::validation("hotCommitLimit must be >= 0"));
        }
        if self.hot_duration < TimeDelta::zero() {
            return Err(Error::validation("hotDuration must be >= 0"));
        }
        Ok(())
    }
}

/// # Errors
/// Returns `Validation` if `repo` is empty.
pub fn require_repo(repo: &str) -> Result<()> {
    if repo.is_empty() {
        return Err(Error::validation("repository name is required"));
    }
    Ok(())
}

/// # Errors
/// Returns `Validation` if `repo` or `name` is empty.
pub fn require_repo_and_name(repo: &str, name: &str) -> Result<()> {
    if repo.is_empty() || name.is_empty() {
        return Err(Error::validation("repo and name are required"));
    }
    Ok(())
}

/// Check that a pointer target belongs to the repository it is created in.
///
/// # Errors
/// Returns `Validation` if the commit was recorded under another repository.
pub fn require_owned_commit(repo: &str, commit: &Commit) -> Result<()> {
    if commit.repo != repo {
        return Err(Error::validation("commit does not belong to repository"));
    }
    Ok(())
}

fn require_pointer_fields(repo: &str, name: &str, commit: &str) -> Result<()> {
    if repo.is_empty() || name.is_empty() || commit.is_empty() {
        return Err(Error::validation("repo, name, and commit are required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn write(repo: &str, content: &str, name: &str, id: &str) -> BlobWriteRequest {
        BlobWriteRequest {
            repo: repo.into(),
            branch: String::new(),
            content: content.into(),
            author_name: name.into(),
            author_id: id.into(),
        }
    }

    #[test]
    fn test_blob_write_requires_every_field() {
        assert!(write("r", "c", "Alice", "alice@id").validate().is_ok());
        for bad in [
            write("", "c", "Alice", "alice@id"),
            write("r", "", "Alice", "alice@id"),
            write("r", "c", "", "alice@id"),
            write("r", "c", "Alice", ""),
        ] {
            assert_eq!(bad.validate().unwrap_err().kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_negative_limits_are_rejected() {
        let ok = RetentionPolicy::new("r", 0, TimeDelta::zero());
        assert!(ok.validate().is_ok());

        let count = RetentionPolicy::new("r", -1, TimeDelta::zero());
        assert_eq!(count.validate().unwrap_err().kind(), ErrorKind::Validation);

        let age = RetentionPolicy::new("r", 1, TimeDelta::seconds(-5));
        assert_eq!(age.validate().unwrap_err().kind(), ErrorKind::Validation);

        let unnamed = RetentionPolicy::new("", 1, TimeDelta::zero());
        assert_eq!(unnamed.validate().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_pointer_requests_require_fields() {
        let branch = BranchRequest {
            repo: "r".into(),
            name: String::new(),
            commit: "h".into(),
        };
        assert!(branch.validate().is_err());

        let tag = TagRequest {
            repo: "r".into(),
            name: "v1".into(),
            commit: "h".into(),
            note: String::new(),
        };
        assert!(tag.validate().is_ok());
    }
}
