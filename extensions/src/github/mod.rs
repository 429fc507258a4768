//! [`RemoteFileStore`](answerbook_core::store::RemoteFileStore) backed by the GitHub repository
//! contents API.

pub mod client;
pub mod error;
pub mod helpers;
mod shared;

pub use client::{ContentsFile, GitHubContentsClient};
pub use error::{GitHubError, GitHubErrorResponse};
pub use shared::{
    API_URL_ENV_VAR, BRANCH_ENV_VAR, GitHubConfig, OWNER_ENV_VAR, REPO_ENV_VAR, TOKEN_ENV_VAR,
};
