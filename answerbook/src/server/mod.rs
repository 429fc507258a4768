//! HTTP surface: `POST /api/create-word` and `POST /api/update-word`.

use std::net::SocketAddr;
use std::sync::Arc;

use answerbook_core::{Outcome, UpsertMode};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{Method, StatusCode, header},
    response::Response,
    routing::{MethodRouter, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Instrument, info, instrument};

use crate::AppContext;

pub mod multipart;
pub mod response;

pub use response::ApiError;

pub const DEFAULT_MAX_UPLOAD: usize = 10 * 1024 * 1024;

pub fn router(cx: Arc<AppContext>, max_upload: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/create-word", word_route(UpsertMode::Create))
        .route("/api/update-word", word_route(UpsertMode::Update))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(cx)
}

fn word_route(mode: UpsertMode) -> MethodRouter<Arc<AppContext>> {
    let handler = move |state: State<Arc<AppContext>>, form: Result<Multipart, MultipartRejection>| {
        upsert_word(mode, state, form)
    };
    post(handler).options(preflight).fallback(method_not_allowed)
}

#[instrument(skip_all, fields(%mode))]
async fn upsert_word(
    mode: UpsertMode,
    State(cx): State<Arc<AppContext>>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request = multipart::read_request(form?).await?;
    // Client mistakes are reported before server configuration problems.
    request.validate(mode)?;
    let upserter = cx.upserter()?;

    // Spawned so a client disconnect cannot cancel a commit halfway.
    let task = tokio::spawn(async move { upserter.upsert(mode, request).await }.in_current_span());
    let outcome = Outcome::from(task.await?);
    Ok(response::outcome_response(outcome))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(cx: Arc<AppContext>, addr: SocketAddr, max_upload: usize) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(cx, max_upload))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
