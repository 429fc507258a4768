use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{RemoteFile, RemoteFileStore, RevisionToken, StoreError};

/// A commit recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub path: String,
    pub message: String,
    pub revision: RevisionToken,
}

#[derive(Debug, Default)]
struct State {
    files: HashMap<String, RemoteFile>,
    history: Vec<Commit>,
    next_revision: u64,
}

impl State {
    fn next_revision(&mut self) -> RevisionToken {
        self.next_revision += 1;
        RevisionToken::new(format!("rev-{}", self.next_revision))
    }
}

/// In-process [`RemoteFileStore`] with the same conditional-write rules as the remote one.
///
/// Paths registered with [`MemoryStore::unavailable`] fail every read and write, which lets
/// callers exercise partial-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file without recording a commit.
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        let state = self.state.get_mut();
        let revision = state.next_revision();
        state.files.insert(
            path.to_string(),
            RemoteFile { content: content.into(), revision },
        );
        self
    }

    /// Makes every access to `path` fail as if the remote were unreachable.
    pub fn unavailable(mut self, path: &str) -> Self {
        self.unavailable.insert(path.to_string());
        self
    }

    pub async fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(path).map(|f| f.content.clone())
    }

    pub async fn revision(&self, path: &str) -> Option<RevisionToken> {
        self.state.lock().await.files.get(path).map(|f| f.revision.clone())
    }

    /// Commits in the order they were made.
    pub async fn commits(&self) -> Vec<Commit> {
        self.state.lock().await.history.clone()
    }

    fn check_available(&self, path: &str) -> Result<(), StoreError> {
        if self.unavailable.contains(path) {
            return Err(StoreError::Unavailable(
                format!("path '{}' is marked unavailable", path).into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteFileStore for MemoryStore {
    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError> {
        self.check_available(path)?;
        let state = self.state.lock().await;
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { path: path.to_string() })
    }

    #[instrument(skip(self, content), fields(bytes = content.len(), revision = ?revision))]
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, StoreError> {
        self.check_available(path)?;
        let mut state = self.state.lock().await;

        let current = state.files.get(path).map(|f| f.revision.clone());
        match (current.as_ref(), revision) {
            (Some(current), Some(expected)) if current != expected => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: format!("{} does not match {}", expected, current),
                    details: None,
                });
            }
            (Some(_), None) => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: "file exists and no revision was supplied".to_string(),
                    details: None,
                });
            }
            (None, Some(expected)) => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: format!("file does not exist, cannot update revision {}", expected),
                    details: None,
                });
            }
            _ => {}
        }

        let revision = state.next_revision();
        state.files.insert(
            path.to_string(),
            RemoteFile { content: content.to_vec(), revision: revision.clone() },
        );
        state.history.push(Commit {
            path: path.to_string(),
            message: message.to_string(),
            revision: revision.clone(),
        });
        debug!(%revision, "Committed file");
        Ok(revision)
    }
}
