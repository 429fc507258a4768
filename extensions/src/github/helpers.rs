use base64::{Engine, engine::general_purpose::STANDARD as Base64Standard};
use serde::{Deserialize, Serialize};

// --- Request Structures ---

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct PutContentsRequest<'a> {
    /// Commit message.
    pub message: &'a str,
    /// New file content, base64 encoded.
    pub content: String,
    /// Blob SHA of the file being replaced. Required when the file exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
}

impl<'a> PutContentsRequest<'a> {
    pub fn new(message: &'a str, content: &[u8]) -> Self {
        PutContentsRequest {
            message,
            content: Base64Standard.encode(content),
            sha: None,
            branch: None,
        }
    }
}

// --- Response Structures ---

/// A file as returned by `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsResponse {
    /// Blob SHA; used as the revision for conditional writes.
    pub sha: String,
    pub path: Option<String>,
    /// `"file"`, `"dir"`, `"symlink"` or `"submodule"`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<u64>,
    /// Base64 content, wrapped at 60 columns. Empty for files over 1 MB.
    #[serde(default)]
    pub content: String,
    /// `"base64"` normally, `"none"` when the file is too large to inline.
    pub encoding: Option<String>,
}

/// Response of a successful contents PUT.
#[derive(Debug, Clone, Deserialize)]
pub struct PutContentsResponse {
    pub content: Option<ContentInfo>,
    pub commit: Option<CommitInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentInfo {
    pub sha: String,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: Option<String>,
}

/// Decodes base64 that may contain line breaks, as GitHub wraps inline content.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Base64Standard.decode(compact)
}
