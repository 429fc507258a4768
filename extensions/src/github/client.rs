use answerbook_core::store::{RemoteFile, RemoteFileStore, RevisionToken, StoreError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, error, info, instrument};

use super::error::{GitHubError, map_response_error};
use super::helpers::{ContentsResponse, PutContentsRequest, PutContentsResponse, decode_content};
use super::shared::{GitHubConfig, SharedGitHubClient};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// A file read through the contents API.
#[derive(Debug, Clone)]
pub struct ContentsFile {
    pub content: Vec<u8>,
    pub sha: String,
}

/// Client for the repository contents API of one GitHub repository.
///
/// Only two operations are used: get a file by path and put a file by path. Together they give
/// the conditional write needed by [`RemoteFileStore`]: a put carrying the blob SHA from a
/// previous get fails with 409 if the file changed in between.
#[derive(Debug, Clone)]
pub struct GitHubContentsClient {
    shared_client: SharedGitHubClient,
}

impl GitHubContentsClient {
    pub fn new(config: GitHubConfig) -> Result<Self, GitHubError> {
        Self::new_with_options(config, None)
    }

    /// Creates a client, optionally reusing an existing `reqwest::Client`.
    pub fn new_with_options(config: GitHubConfig, client_override: Option<Client>) -> Result<Self, GitHubError> {
        let shared_client = SharedGitHubClient::new(config, client_override)?;
        Ok(GitHubContentsClient { shared_client })
    }

    /// Creates a client configured from the environment (see [`GitHubConfig::from_env`]).
    pub fn from_env() -> Result<Self, GitHubError> {
        Self::new(GitHubConfig::from_env()?)
    }

    pub fn config(&self) -> &GitHubConfig {
        self.shared_client.config()
    }

    /// Fetches a file and decodes its content.
    #[instrument(skip(self))]
    pub async fn get_file(&self, path: &str) -> Result<ContentsFile, GitHubError> {
        let parsed = self.get_contents(path).await?;

        if parsed.encoding.as_deref() == Some("none") {
            return Err(GitHubError::UnexpectedResponse(format!(
                "'{}' is too large to be read through the contents API ({} bytes)",
                path,
                parsed.size.unwrap_or_default()
            )));
        }

        let content = decode_content(&parsed.content).map_err(|source| GitHubError::Base64Decode {
            path: path.to_string(),
            source,
        })?;
        debug!(target: "github_api::contents", sha = %parsed.sha, bytes = content.len(), "File fetched");

        Ok(ContentsFile { content, sha: parsed.sha })
    }

    /// Looks up the blob SHA of a file without decoding its content. `None` if there is no file.
    ///
    /// Works for files of any size; above 1 MB the API omits the content but still reports the SHA.
    #[instrument(skip(self))]
    pub async fn get_sha(&self, path: &str) -> Result<Option<String>, GitHubError> {
        match self.get_contents(path).await {
            Ok(parsed) => {
                debug!(target: "github_api::contents", sha = %parsed.sha, "Found existing file");
                Ok(Some(parsed.sha))
            }
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_contents(&self, path: &str) -> Result<ContentsResponse, GitHubError> {
        let mut url = self.shared_client.contents_url(path)?;
        if let Some(branch) = &self.config().branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        debug!(target: "github_api::contents", url = %url, "Fetching file");

        let response = self
            .shared_client
            .http_client()
            .get(url)
            .header(AUTHORIZATION, self.shared_client.bearer())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await
            .map_err(|e| {
                error!(target: "github_api::contents", error = %e, "GET request failed");
                GitHubError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = map_response_error(response).await;
            debug!(target: "github_api::contents", %status, error = %err, "GET returned error status");
            return Err(err);
        }

        let body = response.text().await?;
        let parsed: ContentsResponse = serde_json::from_str(&body).map_err(|source| {
            error!(target: "github_api::contents", error = %source, "Failed to deserialize contents response");
            GitHubError::ResponseParsing { context: format!("GET {}", path), source }
        })?;

        if let Some(kind) = parsed.kind.as_deref().filter(|k| *k != "file") {
            return Err(GitHubError::UnexpectedResponse(format!("'{}' is a {}, not a file", path, kind)));
        }
        Ok(parsed)
    }

    /// Creates or replaces a file with one commit. `sha` must be the current blob SHA when the
    /// file exists.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutContentsResponse, GitHubError> {
        let url = self.shared_client.contents_url(path)?;
        let mut request = PutContentsRequest::new(message, content);
        request.sha = sha;
        request.branch = self.config().branch.as_deref();

        debug!(target: "github_api::contents", url = %url, "Putting file");

        let response = self
            .shared_client
            .http_client()
            .put(url)
            .header(AUTHORIZATION, self.shared_client.bearer())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(target: "github_api::contents", error = %e, "PUT request failed");
                GitHubError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = map_response_error(response).await;
            error!(target: "github_api::contents", %status, error = %err, "PUT returned error status");
            return Err(err);
        }

        let body = response.text().await?;
        let parsed: PutContentsResponse = serde_json::from_str(&body).map_err(|source| {
            error!(target: "github_api::contents", error = %source, "Failed to deserialize put response");
            GitHubError::ResponseParsing { context: format!("PUT {}", path), source }
        })?;
        info!(
            target: "github_api::contents",
            commit = parsed.commit.as_ref().map(|c| c.sha.as_str()).unwrap_or("?"),
            "File committed"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl RemoteFileStore for GitHubContentsClient {
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError> {
        let file = self.get_file(path).await.map_err(|e| e.into_store_error(path))?;
        Ok(RemoteFile {
            content: file.content,
            revision: RevisionToken::new(file.sha),
        })
    }

    async fn revision(&self, path: &str) -> Result<Option<RevisionToken>, StoreError> {
        let sha = self.get_sha(path).await.map_err(|e| e.into_store_error(path))?;
        Ok(sha.map(RevisionToken::new))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, StoreError> {
        let response = self
            .put_file(path, content, message, revision.map(|r| r.as_str()))
            .await
            .map_err(|e| e.into_store_error(path))?;

        response
            .content
            .map(|c| RevisionToken::new(c.sha))
            .ok_or_else(|| StoreError::UnexpectedResponse(format!("PUT {} returned no content sha", path)))
    }
}
