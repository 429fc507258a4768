use answerbook_core::store::StoreError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

// ============== GitHub API Error Structures ==============

/// Error body returned by the GitHub REST API.
#[derive(Deserialize, Debug, Clone)]
pub struct GitHubErrorResponse {
    pub message: String,
    pub documentation_url: Option<String>,
    pub status: Option<String>,
}

// ============== Internal GitHub Client Error Enum ==============

/// Every failure inside the GitHub client. Converted into [`StoreError`] at the
/// [`RemoteFileStore`](answerbook_core::store::RemoteFileStore) boundary.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Error during network communication (sending request, reading response).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Error parsing a *successful* response body.
    #[error("Failed to parse successful response body ({context}): {source}")]
    ResponseParsing {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Non-success status code from the API.
    #[error("GitHub API error: status={status}, message='{}'", api_message(.detail, .body_text))]
    ApiError {
        status: StatusCode,
        /// Parsed error body, if it had the usual shape.
        detail: Option<GitHubErrorResponse>,
        /// Raw response body text.
        body_text: String,
    },

    #[error("Failed to decode base64 content of '{path}': {source}")]
    Base64Decode {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Environment variable {0} is not set")]
    MissingEnvVar(&'static str),

    /// The API answered successfully with something other than a file.
    #[error("Unexpected response format or data: {0}")]
    UnexpectedResponse(String),
}

fn api_message<'a>(detail: &'a Option<GitHubErrorResponse>, body_text: &'a str) -> &'a str {
    detail.as_ref().map(|d| d.message.as_str()).unwrap_or(body_text)
}

impl GitHubError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GitHubError::ApiError { status, .. } => Some(*status),
            GitHubError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Maps this error onto the store contract for an operation on `path`.
    ///
    /// 404 becomes `NotFound`. 409 (stale sha) and 422 complaining about the sha (file exists,
    /// none supplied) become `Conflict`. Network failures become `Unavailable`.
    pub fn into_store_error(self, path: &str) -> StoreError {
        match self {
            GitHubError::ApiError { status, detail, body_text } => {
                let message = detail
                    .as_ref()
                    .map(|d| d.message.clone())
                    .unwrap_or_else(|| body_text.clone());
                let details = serde_json::from_str::<serde_json::Value>(&body_text)
                    .ok()
                    .or_else(|| (!body_text.is_empty()).then(|| serde_json::Value::String(body_text.clone())));

                match status {
                    StatusCode::NOT_FOUND => StoreError::NotFound { path: path.to_string() },
                    StatusCode::CONFLICT => StoreError::Conflict {
                        path: path.to_string(),
                        message,
                        details,
                    },
                    StatusCode::UNPROCESSABLE_ENTITY if message.to_ascii_lowercase().contains("sha") => {
                        StoreError::Conflict {
                            path: path.to_string(),
                            message,
                            details,
                        }
                    }
                    _ => StoreError::Api {
                        status: status.as_u16(),
                        message,
                        details,
                    },
                }
            }
            GitHubError::Network(source) => StoreError::Unavailable(Box::new(source)),
            other => StoreError::UnexpectedResponse(other.to_string()),
        }
    }
}

// ============== Shared Error Mapping Logic ==============

/// Turns a non-success `reqwest::Response` into `GitHubError::ApiError`.
///
/// The body is parsed as a `GitHubErrorResponse` when possible; otherwise the raw text is kept
/// with no parsed detail. Returns `GitHubError::Network` if the body cannot be read at all.
pub(crate) async fn map_response_error(response: reqwest::Response) -> GitHubError {
    let status = response.status();
    debug_assert!(!status.is_success(), "map_response_error called with success status");

    match response.text().await {
        Ok(body_text) => match serde_json::from_str::<GitHubErrorResponse>(&body_text) {
            Ok(parsed_error) => GitHubError::ApiError {
                status,
                detail: Some(parsed_error),
                body_text,
            },
            Err(parse_err) => {
                warn!(
                    status = %status,
                    error = %parse_err,
                    body = %body_text,
                    "Failed to parse GitHub error response JSON, returning raw body."
                );
                GitHubError::ApiError {
                    status,
                    detail: None,
                    body_text,
                }
            }
        },
        Err(e) => {
            warn!(status = %status, error = %e, "Failed to read GitHub error response body text.");
            GitHubError::Network(e)
        }
    }
}
