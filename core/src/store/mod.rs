//! Remote file storage with optimistic concurrency.
//!
//! A [`RemoteFileStore`] reads and writes whole files by path. Every stored file has a
//! [`RevisionToken`]; overwriting a file requires the token from a prior read, and the store
//! rejects the write with [`StoreError::Conflict`] when the file has changed since. Both the
//! image commit and the document commit go through this one primitive.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::{Commit, MemoryStore};

mod memory;

/// Opaque marker for the stored version of a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(token: impl Into<String>) -> Self {
        RevisionToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RevisionToken {
    fn from(token: String) -> Self {
        RevisionToken(token)
    }
}

/// File content together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub revision: RevisionToken,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// The supplied revision is stale, or the file exists and no revision was supplied.
    #[error("Revision conflict on {path}: {message}")]
    Conflict {
        path: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Remote store unavailable: {0}")]
    Unavailable(#[source] Box<dyn StdError + Send + Sync>),

    #[error("Remote store error: status={status}, message={message}")]
    Api {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Unexpected response from remote store: {0}")]
    UnexpectedResponse(String),
}

impl StoreError {
    /// Raw error payload returned by the remote store, if there was one.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            StoreError::Conflict { details, .. } | StoreError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Get/put access to files in a remote, versioned store.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Reads the file at `path`.
    ///
    /// Returns [`StoreError::NotFound`] when nothing is stored there. Callers that are allowed
    /// to create the file should treat that as "no existing file".
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError>;

    /// Current revision of the file at `path`, or `None` when nothing is stored there.
    ///
    /// Stores that can look up a revision without transferring the content should override this.
    async fn revision(&self, path: &str) -> Result<Option<RevisionToken>, StoreError> {
        match self.read(path).await {
            Ok(file) => Ok(Some(file.revision)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes `content` to `path` as one new revision tagged with `message`.
    ///
    /// With `revision`, the write only succeeds if the file is still at that revision. Without
    /// it, the write creates the file and fails with [`StoreError::Conflict`] if one exists.
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, StoreError>;
}
