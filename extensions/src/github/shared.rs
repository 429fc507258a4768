use std::env;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, trace};
use url::Url;

use super::error::GitHubError;

const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("answerbook/", env!("CARGO_PKG_VERSION"));

pub const OWNER_ENV_VAR: &str = "REPO_OWNER";
pub const REPO_ENV_VAR: &str = "REPO_NAME";
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
pub const API_URL_ENV_VAR: &str = "GITHUB_API_URL";
pub const BRANCH_ENV_VAR: &str = "GITHUB_BRANCH";

/// Configuration for the GitHub contents client.
#[derive(Clone, Debug)]
pub struct GitHubConfig {
    /// Account or organization owning the repository.
    pub(crate) owner: String,
    pub(crate) repo: String,
    /// Access token sent as a bearer credential.
    pub(crate) token: SecretString,
    pub(crate) base_url: Url,
    /// Branch to read from and commit to. The repository default when `None`.
    pub(crate) branch: Option<String>,
    /// Timeout for HTTP requests. Defaults to 30 seconds.
    pub(crate) timeout: Duration,
}

impl GitHubConfig {
    /// Creates a new configuration.
    ///
    /// # Errors
    /// Returns `GitHubError::InvalidConfiguration` if any of the values is empty.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, GitHubError> {
        let owner = owner.into();
        let repo = repo.into();
        let token = token.into();
        if owner.is_empty() || repo.is_empty() || token.is_empty() {
            return Err(GitHubError::InvalidConfiguration(
                "Owner, repository and token cannot be empty".to_string(),
            ));
        }

        let base_url = Url::parse(DEFAULT_GITHUB_API_BASE_URL).map_err(|e| {
            GitHubError::InvalidConfiguration(format!(
                "Internal error: Failed to parse default base URL: {}",
                e
            ))
        })?;

        Ok(Self {
            owner,
            repo,
            token: token.into(),
            base_url,
            branch: None,
            timeout: Duration::from_secs(30),
        })
    }

    /// Reads `REPO_OWNER`, `REPO_NAME` and `GITHUB_TOKEN`, plus the optional `GITHUB_API_URL`
    /// and `GITHUB_BRANCH`.
    ///
    /// # Errors
    /// Returns `GitHubError::MissingEnvVar` naming the first required variable that is unset
    /// or empty.
    pub fn from_env() -> Result<Self, GitHubError> {
        let owner = required_var(OWNER_ENV_VAR)?;
        let repo = required_var(REPO_ENV_VAR)?;
        let token = required_var(TOKEN_ENV_VAR)?;

        let mut config = Self::new(owner, repo, token)?;
        if let Some(url) = optional_var(API_URL_ENV_VAR) {
            config = config.base_url(&url)?;
        }
        if let Some(branch) = optional_var(BRANCH_ENV_VAR) {
            config = config.branch(branch);
        }
        Ok(config)
    }

    /// Allows setting a custom base URL, e.g. for GitHub Enterprise.
    pub fn base_url(mut self, url: &str) -> Result<Self, GitHubError> {
        self.base_url = Url::parse(url).map_err(|e| {
            GitHubError::InvalidConfiguration(format!("Invalid base URL '{}': {}", url, e))
        })?;
        if self.base_url.cannot_be_a_base() {
            return Err(GitHubError::InvalidConfiguration(format!(
                "Base URL '{}' cannot be used as a base",
                url
            )));
        }
        Ok(self)
    }

    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

fn required_var(name: &'static str) -> Result<String, GitHubError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(GitHubError::MissingEnvVar(name)),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// HTTP client plus configuration, shared by the contents operations.
#[derive(Clone, Debug)]
pub(crate) struct SharedGitHubClient {
    config: GitHubConfig,
    http_client: Client,
}

impl SharedGitHubClient {
    /// Builds a default reqwest client if one is not provided.
    #[instrument(name = "shared_github_client_new", skip(config, client_override))]
    pub(crate) fn new(config: GitHubConfig, client_override: Option<Client>) -> Result<Self, GitHubError> {
        let client = match client_override {
            Some(client) => {
                debug!("Using provided HTTP client.");
                client
            }
            None => {
                debug!(timeout = ?config.timeout, "Building default HTTP client.");
                Client::builder()
                    .timeout(config.timeout)
                    .user_agent(USER_AGENT)
                    .build()
                    .map_err(|e| {
                        GitHubError::InvalidConfiguration(format!(
                            "Failed to build default HTTP client: {}",
                            e
                        ))
                    })?
            }
        };

        debug!(base_url = %config.base_url, owner = %config.owner, repo = %config.repo, "Shared GitHub client initialized.");

        Ok(Self { config, http_client: client })
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub(crate) fn config(&self) -> &GitHubConfig {
        &self.config
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.config.token.expose_secret())
    }

    /// Builds `<base>/repos/<owner>/<repo>/contents/<path>`, percent-encoding each segment.
    pub(crate) fn contents_url(&self, path: &str) -> Result<Url, GitHubError> {
        let mut url = self.config.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| {
                GitHubError::InvalidConfiguration("Base URL cannot be a 'cannot-be-a-base' URL.".to_string())
            })?
            .pop_if_empty()
            .extend(["repos", self.config.owner.as_str(), self.config.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));

        trace!(built_url = %url, "Built GitHub contents URL");
        Ok(url)
    }
}
