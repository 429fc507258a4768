use serde::Serialize;
use thiserror::Error;

use crate::document::DocumentError;
use crate::store::StoreError;

/// Terminal failure of an upsert. None of these are retried internally.
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("Required field missing: {0}")]
    MissingField(&'static str),

    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Failed to upload image '{path}': {source}")]
    ImageUpload {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to fetch document '{path}': {source}")]
    DocumentFetch {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Document '{path}' could not be parsed: {source}")]
    MalformedDocument {
        path: String,
        #[source]
        source: DocumentError,
    },

    #[error("No entry '{key}' in category '{category}' to update")]
    NotFound { category: String, key: String },

    /// The document changed after it was read. The whole operation must be resubmitted.
    #[error("Document '{path}' was modified concurrently: {source}")]
    DocumentConflict {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to commit document '{path}': {source}")]
    DocumentCommit {
        path: String,
        #[source]
        source: StoreError,
    },
}

/// Distinguishable failure kinds, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    MissingField,
    ConfigMissing,
    ImageUploadError,
    DocumentFetchError,
    MalformedDocument,
    NotFound,
    DocumentConflict,
    DocumentCommitError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingField => "MissingField",
            FailureKind::ConfigMissing => "ConfigMissing",
            FailureKind::ImageUploadError => "ImageUploadError",
            FailureKind::DocumentFetchError => "DocumentFetchError",
            FailureKind::MalformedDocument => "MalformedDocument",
            FailureKind::NotFound => "NotFound",
            FailureKind::DocumentConflict => "DocumentConflict",
            FailureKind::DocumentCommitError => "DocumentCommitError",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UpsertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            UpsertError::MissingField(_) => FailureKind::MissingField,
            UpsertError::ConfigMissing(_) => FailureKind::ConfigMissing,
            UpsertError::ImageUpload { .. } => FailureKind::ImageUploadError,
            UpsertError::DocumentFetch { .. } => FailureKind::DocumentFetchError,
            UpsertError::MalformedDocument { .. } => FailureKind::MalformedDocument,
            UpsertError::NotFound { .. } => FailureKind::NotFound,
            UpsertError::DocumentConflict { .. } => FailureKind::DocumentConflict,
            UpsertError::DocumentCommit { .. } => FailureKind::DocumentCommitError,
        }
    }

    /// Raw payload from the remote store, when the failure came from there.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            UpsertError::ImageUpload { source, .. }
            | UpsertError::DocumentFetch { source, .. }
            | UpsertError::DocumentConflict { source, .. }
            | UpsertError::DocumentCommit { source, .. } => source.details(),
            _ => None,
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
            details: self.details().cloned(),
        }
    }
}

/// Serializable description of a failed upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Result of an upsert as seen by the request layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

impl From<Result<(), UpsertError>> for Outcome {
    fn from(result: Result<(), UpsertError>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::Failure(e.to_failure()),
        }
    }
}
