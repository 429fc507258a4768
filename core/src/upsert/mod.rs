//! The create/update flow for answer entries.
//!
//! An upsert runs strictly forward through these stages:
//!
//! 1. **Init**: required fields are checked; nothing remote has happened yet.
//! 2. **ImageUploaded** (only with an image): the image path is probed for an existing revision,
//!    then written, conditioned on that revision if one was found.
//! 3. **DocumentFetched**: the document is read; a missing or blank file counts as empty.
//! 4. **DocumentMerged**: the entry is placed into an in-memory copy.
//! 5. **DocumentCommitted**: the copy is written back, conditioned on the revision from step 3.
//!
//! Any failure ends the operation. Nothing is undone: if the image was committed and the
//! document commit then fails, the image stays in the store unreferenced. A conflict on the
//! document is reported as [`UpsertError::DocumentConflict`] and never retried here, because
//! retrying would re-upload the image blindly.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::document::{self, Document, Entry};
use crate::merge;
use crate::store::{RemoteFileStore, RevisionToken, StoreError};

pub use self::error::{Failure, FailureKind, Outcome, UpsertError};

mod error;

pub const DEFAULT_DOCUMENT_PATH: &str = "correctAnswers.json";
pub const DEFAULT_IMAGE_DIR: &str = "imgs";

/// Whether an upsert may create an entry that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Create or overwrite. An image is required.
    Create,
    /// Replace an existing entry. The image is optional; without one the previous image is kept.
    Update,
}

impl UpsertMode {
    pub fn allows_create(&self) -> bool {
        matches!(self, UpsertMode::Create)
    }

    pub fn requires_image(&self) -> bool {
        matches!(self, UpsertMode::Create)
    }
}

impl fmt::Display for UpsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertMode::Create => f.write_str("create"),
            UpsertMode::Update => f.write_str("update"),
        }
    }
}

/// Stages of an upsert, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    ImageUploaded,
    DocumentFetched,
    DocumentMerged,
    DocumentCommitted,
    Done,
}

/// Image bytes and the filename they were submitted under.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A decoded submission. All fields are single strings by the time they get here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertRequest {
    pub category: String,
    pub key: String,
    pub name: String,
    pub desc: String,
    pub image: Option<ImageUpload>,
}

impl UpsertRequest {
    /// Checks required fields for `mode`.
    pub fn validate(&self, mode: UpsertMode) -> Result<(), UpsertError> {
        let required = [
            ("category", &self.category),
            ("key", &self.key),
            ("name", &self.name),
            ("desc", &self.desc),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(UpsertError::MissingField(field));
            }
        }
        match &self.image {
            None if mode.requires_image() => Err(UpsertError::MissingField("image")),
            Some(image) if !is_plain_filename(&image.filename) => {
                Err(UpsertError::MissingField("image filename"))
            }
            _ => Ok(()),
        }
    }
}

/// A single, non-blank path component that names a file.
fn is_plain_filename(filename: &str) -> bool {
    let trimmed = filename.trim();
    !trimmed.is_empty() && trimmed != "." && trimmed != ".." && !trimmed.contains(['/', '\\'])
}

/// Where the document and images live in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertSettings {
    pub document_path: String,
    pub image_dir: String,
}

impl Default for UpsertSettings {
    fn default() -> Self {
        UpsertSettings {
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
        }
    }
}

/// Runs upserts against a [`RemoteFileStore`].
///
/// Holds no per-request state; concurrent upserts are only coordinated by the store's
/// conditional writes.
#[derive(Clone)]
pub struct Upserter {
    store: Arc<dyn RemoteFileStore>,
    settings: UpsertSettings,
}

impl fmt::Debug for Upserter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upserter").field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl Upserter {
    pub fn new(store: Arc<dyn RemoteFileStore>) -> Self {
        Self::with_settings(store, UpsertSettings::default())
    }

    pub fn with_settings(store: Arc<dyn RemoteFileStore>, settings: UpsertSettings) -> Self {
        Upserter { store, settings }
    }

    pub fn settings(&self) -> &UpsertSettings {
        &self.settings
    }

    pub async fn create(&self, request: UpsertRequest) -> Result<(), UpsertError> {
        self.upsert(UpsertMode::Create, request).await
    }

    pub async fn update(&self, request: UpsertRequest) -> Result<(), UpsertError> {
        self.upsert(UpsertMode::Update, request).await
    }

    #[instrument(
        skip(self, request),
        fields(category = %request.category, key = %request.key, has_image = request.image.is_some())
    )]
    pub async fn upsert(&self, mode: UpsertMode, request: UpsertRequest) -> Result<(), UpsertError> {
        let mut stage = Stage::Init;
        let result = self.run(mode, request, &mut stage).await;
        match &result {
            Ok(()) => {
                stage = Stage::Done;
                info!(%mode, ?stage, "Upsert completed")
            }
            Err(e) => warn!(%mode, ?stage, kind = %e.kind(), error = %e, "Upsert failed"),
        }
        result
    }

    async fn run(&self, mode: UpsertMode, request: UpsertRequest, stage: &mut Stage) -> Result<(), UpsertError> {
        request.validate(mode)?;

        let UpsertRequest { category, key, name, desc, image } = request;

        let new_image = match image {
            Some(image) => {
                self.upload_image(mode, &key, &image).await?;
                *stage = Stage::ImageUploaded;
                Some(image.filename)
            }
            None => None,
        };

        let (document, revision) = self.fetch_document().await?;
        *stage = Stage::DocumentFetched;

        let entry = match (document.entry(&category, &key), new_image) {
            (_, Some(filename)) if mode.allows_create() || document.contains(&category, &key) => {
                Entry::new(name, desc, &self.settings.image_dir, &filename)
            }
            (Some(previous), None) => Entry::keeping_image(name, desc, &previous),
            // Only reachable in update mode; create always carries an image.
            _ => {
                return Err(UpsertError::NotFound { category, key });
            }
        };

        let document = merge::apply(document, &category, &key, entry);
        *stage = Stage::DocumentMerged;

        let message = match mode {
            UpsertMode::Create => format!("Update {} with new word {}", self.settings.document_path, key),
            UpsertMode::Update => format!("Update word {} in category {}", key, category),
        };
        self.commit_document(&document, &message, revision.as_ref()).await?;
        *stage = Stage::DocumentCommitted;
        Ok(())
    }

    /// Writes the image, reusing the revision of any file already at its path.
    #[instrument(skip(self, image), fields(filename = %image.filename, bytes = image.bytes.len()))]
    async fn upload_image(&self, mode: UpsertMode, key: &str, image: &ImageUpload) -> Result<RevisionToken, UpsertError> {
        let path = document::image_path(&self.settings.image_dir, &image.filename);

        let existing = match self.store.revision(&path).await {
            Ok(existing) => existing,
            Err(source) => return Err(UpsertError::ImageUpload { path, source }),
        };
        debug!(%path, existing = ?existing, "Probed image path");

        let message = match mode {
            UpsertMode::Create => format!("Add image for {}", key),
            UpsertMode::Update => format!("Update image for word {}", key),
        };

        match self.store.write(&path, &image.bytes, &message, existing.as_ref()).await {
            Ok(revision) => {
                info!(%path, %revision, "Image committed");
                Ok(revision)
            }
            Err(source) => Err(UpsertError::ImageUpload { path, source }),
        }
    }

    /// Reads and parses the document, with the revision it was read at.
    ///
    /// A document that does not exist yet is returned as empty with no revision, so the
    /// following write creates it.
    #[instrument(skip(self), fields(path = %self.settings.document_path))]
    pub async fn fetch_document(&self) -> Result<(Document, Option<RevisionToken>), UpsertError> {
        let path = &self.settings.document_path;
        let file = match self.store.read(path).await {
            Ok(file) => file,
            Err(StoreError::NotFound { .. }) => {
                debug!("Document does not exist yet, starting from empty");
                return Ok((Document::new(), None));
            }
            Err(source) => {
                return Err(UpsertError::DocumentFetch { path: path.clone(), source });
            }
        };

        let document = Document::parse(&file.content).map_err(|source| UpsertError::MalformedDocument {
            path: path.clone(),
            source,
        })?;
        debug!(revision = %file.revision, entries = document.entry_count(), "Fetched document");
        Ok((document, Some(file.revision)))
    }

    async fn commit_document(
        &self,
        document: &Document,
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, UpsertError> {
        let path = &self.settings.document_path;
        let content = document.to_pretty_json().map_err(|source| UpsertError::MalformedDocument {
            path: path.clone(),
            source,
        })?;

        match self.store.write(path, content.as_bytes(), message, revision).await {
            Ok(revision) => {
                info!(%path, %revision, "Document committed");
                Ok(revision)
            }
            Err(source) if source.is_conflict() => {
                Err(UpsertError::DocumentConflict { path: path.clone(), source })
            }
            Err(source) => Err(UpsertError::DocumentCommit { path: path.clone(), source }),
        }
    }
}
