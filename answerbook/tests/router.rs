use std::sync::Arc;

use answerbook::{AppContext, server};
use answerbook_core::{MemoryStore, RemoteFileStore, UpsertSettings};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "answerbook-test-boundary";
const DOC: &str = "correctAnswers.json";

fn app(store: Arc<MemoryStore>) -> Router {
    let cx = AppContext::new(UpsertSettings::default(), Ok(store as Arc<dyn RemoteFileStore>));
    server::router(Arc::new(cx), server::DEFAULT_MAX_UPLOAD)
}

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn form_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(header::ORIGIN, "https://quiz.example.com")
        .body(Body::from(body))
        .unwrap()
}

const CAT_FIELDS: [(&str, &str); 4] = [("category", "animals"), ("key", "cat"), ("name", "Cat"), ("desc", "A feline")];

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, allow_origin, body)
}

#[tokio::test]
async fn create_word_commits_entry() {
    let store = Arc::new(MemoryStore::new());

    let body = multipart_body(&CAT_FIELDS, Some(("cat.png", &b"png bytes"[..])));
    let (status, allow_origin, body) = send(app(store.clone()), form_request("/api/create-word", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(allow_origin.as_deref(), Some("*"));

    let doc: Value = serde_json::from_slice(&store.contents(DOC).await.unwrap()).unwrap();
    assert_eq!(
        doc,
        json!({"animals": {"cat": {"name": "Cat", "img": "cat.png", "imgUrl": "./imgs/cat.png", "desc": "A feline"}}})
    );
    assert_eq!(store.contents("imgs/cat.png").await.unwrap(), b"png bytes");
}

#[tokio::test]
async fn create_word_without_image_is_bad_request() {
    let store = Arc::new(MemoryStore::new());

    let (status, _, body) =
        send(app(store.clone()), form_request("/api/create-word", multipart_body(&CAT_FIELDS, None))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MissingField");
    assert!(store.commits().await.is_empty());
}

#[tokio::test]
async fn update_word_keeps_image_and_joins_repeated_fields() {
    let existing = json!({"animals": {"cat": {"name": "Cat", "img": "cat.png", "imgUrl": "./imgs/cat.png", "desc": "A feline"}}});
    let store = Arc::new(MemoryStore::new().with_file(DOC, existing.to_string()));

    let fields = [("category", "animals"), ("key", "cat"), ("name", "Cat"), ("desc", "Likes "), ("desc", "naps")];
    let (status, _, body) =
        send(app(store.clone()), form_request("/api/update-word", multipart_body(&fields, None))).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let doc: Value = serde_json::from_slice(&store.contents(DOC).await.unwrap()).unwrap();
    assert_eq!(doc["animals"]["cat"]["desc"], "Likes naps");
    assert_eq!(doc["animals"]["cat"]["img"], "cat.png");
}

#[tokio::test]
async fn update_word_for_missing_entry_is_not_found() {
    let store = Arc::new(MemoryStore::new().with_file(DOC, "{}"));

    let (status, _, body) =
        send(app(store.clone()), form_request("/api/update-word", multipart_body(&CAT_FIELDS, None))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
    assert_eq!(store.contents(DOC).await.unwrap(), b"{}");
}

#[tokio::test]
async fn malformed_document_is_server_error() {
    let store = Arc::new(MemoryStore::new().with_file(DOC, "[1, 2"));

    let (status, _, body) =
        send(app(store), form_request("/api/update-word", multipart_body(&CAT_FIELDS, None))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "MalformedDocument");
}

#[tokio::test]
async fn unconfigured_store_is_config_missing() {
    let cx = AppContext::new(UpsertSettings::default(), Err(anyhow::anyhow!("Environment variable GITHUB_TOKEN is not set")));
    let app = server::router(Arc::new(cx), server::DEFAULT_MAX_UPLOAD);

    let (status, _, body) = send(app, form_request("/api/update-word", multipart_body(&CAT_FIELDS, None))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "ConfigMissing");
    assert!(body["error"].as_str().unwrap().contains("GITHUB_TOKEN"));
}

#[tokio::test]
async fn missing_field_is_reported_before_missing_config() {
    let cx = AppContext::new(UpsertSettings::default(), Err(anyhow::anyhow!("Environment variable GITHUB_TOKEN is not set")));
    let app = server::router(Arc::new(cx), server::DEFAULT_MAX_UPLOAD);

    let (status, _, body) = send(app, form_request("/api/create-word", multipart_body(&CAT_FIELDS, None))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Required field missing: image", "kind": "MissingField"}));
}

#[tokio::test]
async fn dot_filename_is_bad_request() {
    let store = Arc::new(MemoryStore::new());

    let body = multipart_body(&CAT_FIELDS, Some(("..", &b"png bytes"[..])));
    let (status, _, body) = send(app(store.clone()), form_request("/api/create-word", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MissingField");
    assert!(store.commits().await.is_empty());
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    let request = Request::builder().method(Method::GET).uri("/api/create-word").body(Body::empty()).unwrap();

    let (status, _, body) = send(app(Arc::new(MemoryStore::new())), request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn preflight_is_ok_with_cors_headers() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/update-word")
        .header(header::ORIGIN, "https://quiz.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app(Arc::new(MemoryStore::new())).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("OPTIONS"));
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/create-word")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"category": "animals"}"#))
        .unwrap();

    let (status, _, body) = send(app(Arc::new(MemoryStore::new())), request).await;

    assert!(status.is_client_error());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let cx = AppContext::new(UpsertSettings::default(), Ok(store.clone() as Arc<dyn RemoteFileStore>));
    let app = server::router(Arc::new(cx), 1024);

    let big = vec![0u8; 8 * 1024];
    let (status, _, _) =
        send(app, form_request("/api/create-word", multipart_body(&CAT_FIELDS, Some(("cat.png", big.as_slice()))))).await;

    assert!(status.is_client_error());
    assert!(store.commits().await.is_empty());
}
