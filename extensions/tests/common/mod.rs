#![allow(dead_code)]

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::{Value, json};

pub const TEST_TOKEN: &str = "test-token";

/// Files above this size come back without inline content, as on github.com.
pub const INLINE_CONTENT_LIMIT: usize = 1024 * 1024;

// Helper function to get an environment variable or skip test
pub fn get_api_key_or_skip(var_name: &str, test_name: &str) -> Option<String> {
    dotenv::dotenv().ok(); // Load .env file if present

    match env::var(var_name) {
        Ok(key) if !key.is_empty() => Some(key),
        _ => {
            println!("Skipping integration test {} - {} environment variable not set.", test_name, var_name);
            None // Signal to skip
        }
    }
}

/// A commit recorded by the fake server.
#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub path: String,
    pub message: String,
    pub branch: Option<String>,
}

#[derive(Default)]
pub struct FakeRepo {
    files: HashMap<String, (Vec<u8>, String)>,
    commits: Vec<FakeCommit>,
    reads: Vec<(String, Option<String>)>,
    next_sha: u64,
}

impl FakeRepo {
    fn mint_sha(&mut self) -> String {
        self.next_sha += 1;
        format!("{:040x}", self.next_sha)
    }
}

type Shared = Arc<Mutex<FakeRepo>>;

/// In-process stand-in for the GitHub contents API of `octo/answers`.
pub struct FakeGitHub {
    pub base_url: String,
    repo: Shared,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let repo: Shared = Arc::default();
        let app = Router::new()
            .route("/repos/{owner}/{repo}/contents/{*path}", get(get_contents).put(put_contents))
            .layer(DefaultBodyLimit::disable())
            .with_state(repo.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake server failed");
        });

        FakeGitHub {
            base_url: format!("http://{}", addr),
            repo,
        }
    }

    pub fn seed(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let mut repo = self.repo.lock().unwrap();
        let sha = repo.mint_sha();
        repo.files.insert(path.to_string(), (content.into(), sha.clone()));
        sha
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.repo.lock().unwrap().files.get(path).map(|(c, _)| c.clone())
    }

    pub fn sha(&self, path: &str) -> Option<String> {
        self.repo.lock().unwrap().files.get(path).map(|(_, s)| s.clone())
    }

    pub fn commits(&self) -> Vec<FakeCommit> {
        self.repo.lock().unwrap().commits.clone()
    }

    /// Every GET as `(path, ref)`.
    pub fn reads(&self) -> Vec<(String, Option<String>)> {
        self.repo.lock().unwrap().reads.clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TEST_TOKEN))
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "message": message,
            "documentation_url": "https://docs.github.com/rest/repos/contents",
            "status": status.as_u16().to_string(),
        })),
    )
}

async fn get_contents(
    State(repo): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    let mut repo = repo.lock().unwrap();
    repo.reads.push((path.clone(), query.get("ref").cloned()));

    let Some((content, sha)) = repo.files.get(&path) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };

    if content.len() > INLINE_CONTENT_LIMIT {
        return (
            StatusCode::OK,
            Json(json!({
                "type": "file",
                "encoding": "none",
                "size": content.len(),
                "name": path.rsplit('/').next(),
                "path": path,
                "content": "",
                "sha": sha,
            })),
        );
    }

    // GitHub wraps inline base64 at 60 columns.
    let encoded = STANDARD.encode(content);
    let wrapped: Vec<&str> = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "type": "file",
            "encoding": "base64",
            "size": content.len(),
            "name": path.rsplit('/').next(),
            "path": path,
            "content": format!("{}\n", wrapped.join("\n")),
            "sha": sha,
        })),
    )
}

#[derive(Deserialize)]
struct PutBody {
    message: String,
    content: String,
    sha: Option<String>,
    branch: Option<String>,
}

async fn put_contents(
    State(repo): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<PutBody>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    let Ok(content) = STANDARD.decode(&body.content) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid request.\n\ncontent is not valid Base64");
    };

    let mut repo = repo.lock().unwrap();
    let current = repo.files.get(&path).map(|(_, sha)| sha.clone());
    match (current.as_deref(), body.sha.as_deref()) {
        (Some(_), None) => {
            return error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid request.\n\n\"sha\" wasn't supplied.");
        }
        (Some(current), Some(given)) if current != given => {
            return error(StatusCode::CONFLICT, &format!("{} does not match {}", path, given));
        }
        (None, Some(given)) => {
            return error(StatusCode::CONFLICT, &format!("{} does not match {}", path, given));
        }
        _ => {}
    }

    let status = if current.is_some() { StatusCode::OK } else { StatusCode::CREATED };
    let sha = repo.mint_sha();
    let commit_sha = repo.mint_sha();
    repo.files.insert(path.clone(), (content, sha.clone()));
    repo.commits.push(FakeCommit {
        path: path.clone(),
        message: body.message.clone(),
        branch: body.branch,
    });

    (
        status,
        Json(json!({
            "content": {"sha": sha, "path": path},
            "commit": {"sha": commit_sha, "message": body.message},
        })),
    )
}
