//! Error types for kvvs-keydb.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to the key-value server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection or command failure reported by the client.
    #[error("keydb error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored record could not be encoded or decoded.
    #[error("failed to encode stored record: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking archive task panicked or was cancelled.
    #[error("archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Engine-level failure (validation, not found, conflict, deadline).
    #[error(transparent)]
    Core(#[from] kvvs_core::Error),
}

impl From<Error> for kvvs_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::Json(inner) => Self::Json(inner),
            other => Self::Backend(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use kvvs_core::ErrorKind;

    use super::*;

    #[test]
    fn test_core_errors_pass_through() {
        let err: kvvs_core::Error = Error::Core(kvvs_core::Error::conflict("tag", "v1")).into();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_client_errors_are_transient() {
        let redis = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        let err: kvvs_core::Error = Error::from(redis).into();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("connection reset"));
    }
}
