use std::net::SocketAddr;
use std::path::PathBuf;

use answerbook_core::UpsertSettings;
use answerbook_core::upsert::{DEFAULT_DOCUMENT_PATH, DEFAULT_IMAGE_DIR};
use clap::{Args, Parser, Subcommand};

use crate::server::DEFAULT_MAX_UPLOAD;

/// Answerbook: keep an answers document and its images in a GitHub repository.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path of the answers document inside the repository.
    #[arg(long, global = true, env = "ANSWERBOOK_DOCUMENT", default_value = DEFAULT_DOCUMENT_PATH)]
    pub document: String,

    /// Directory for uploaded images inside the repository.
    #[arg(long, global = true, env = "ANSWERBOOK_IMAGE_DIR", default_value = DEFAULT_IMAGE_DIR)]
    pub image_dir: String,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    pub fn settings(&self) -> UpsertSettings {
        UpsertSettings {
            document_path: self.document.clone(),
            image_dir: self.image_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the create-word and update-word endpoints.
    Serve(ServeArgs),
    /// Create or overwrite an entry. An image is required.
    Create(EntryArgs),
    /// Update an existing entry, optionally replacing its image.
    Update(EntryArgs),
    /// Print the document, one category or one entry.
    Show(ShowArgs),
}

// --- Argument Structs for each Subcommand ---

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "ANSWERBOOK_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD)]
    pub max_upload: usize,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    /// Category the entry belongs to.
    #[arg(long, short)]
    pub category: String,

    /// Entry key within the category.
    #[arg(long, short)]
    pub key: String,

    /// Display name.
    #[arg(long, short)]
    pub name: String,

    /// Description.
    #[arg(long, short)]
    pub desc: String,

    /// Local image file to upload. Its file name is used in the repository.
    #[arg(long, short)]
    pub image: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Category to show. Shows the whole document if omitted.
    pub category: Option<String>,

    /// Entry key within the category.
    #[arg(requires = "category")]
    pub key: Option<String>,
}
