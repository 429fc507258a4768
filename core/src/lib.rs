//! Answerbook core: the answers document, the merge engine, the remote store seam and the
//! upsert flow that ties them together.

pub mod document;
pub mod merge;
pub mod store;
pub mod upsert;

pub use document::{Category, Document, DocumentError, Entry};
pub use store::{MemoryStore, RemoteFile, RemoteFileStore, RevisionToken, StoreError};
pub use upsert::{
    Failure, FailureKind, ImageUpload, Outcome, Stage, UpsertError, UpsertMode, UpsertRequest,
    UpsertSettings, Upserter,
};
