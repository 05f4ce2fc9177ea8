//! Error types for kvvs-core.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kvvs-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// A commit, branch, tag, content blob or archive entry is absent.
    #[error("{resource} {key} not found")]
    NotFound {
        /// Kind of record that was looked up.
        resource: &'static str,
        /// Key that was looked up.
        key: String,
    },

    /// The write would violate an identity, uniqueness or lock invariant.
    #[error("{resource} {key} conflicts with existing state")]
    Conflict {
        /// Kind of record in conflict.
        resource: &'static str,
        /// Key of the record in conflict.
        key: String,
    },

    /// The operation did not finish before its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Optimistic commit kept losing to concurrent writers.
    #[error("gave up on {key} after {attempts} conflicting attempts")]
    RetriesExhausted { key: String, attempts: u32 },

    /// Stored data could not be interpreted.
    #[error("corrupt {resource} {key}: {message}")]
    Corrupt {
        resource: &'static str,
        key: String,
        message: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Embedded archive database error.
    #[error("archive error: {0}")]
    Archive(#[from] sled::Error),

    /// Networked backend error.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification used by callers to map failures to outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; never retried.
    Validation,
    /// The requested record does not exist.
    NotFound,
    /// The request clashes with existing state.
    Conflict,
    /// Infrastructure failure; the caller may try again later.
    Transient,
}

impl Error {
    /// Build a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a [`Error::NotFound`].
    pub fn not_found(resource: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            key: key.into(),
        }
    }

    /// Build a [`Error::Conflict`].
    pub fn conflict(resource: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            resource,
            key: key.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Timeout(_)
            | Self::RetriesExhausted { .. }
            | Self::Corrupt { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Toml(_)
            | Self::Archive(_)
            | Self::Backend(_) => ErrorKind::Transient,
        }
    }

    /// Whether this is a [`Error::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }

    /// Whether this is a [`Error::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }
}
