//! HTTP surface of the worker.
//!
//! - `POST /__worker/message`: control commands, one reply each
//! - `GET /__worker/status`: registration and lifecycle state
//! - `POST /__worker/push` / `POST /__worker/notificationclick`
//! - everything else is an intercepted page request

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use url::Url;

use patchnotes_core::http::{Request, Response as CachedResponse};
use patchnotes_core::message::{MESSAGE_PATH, NOTIFICATION_CLICK_PATH, PUSH_PATH, STATUS_PATH};
use patchnotes_core::{Error, WorkerCommand, WorkerReply, WorkerStatus};

use crate::error::ApiError;
use crate::worker::Worker;
use crate::worker::messages::WorkerHandle;
use crate::worker::notify::{Notification, NotificationClick, Notifier, PushMessage};

/// Largest request body forwarded to the origin.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers never copied onto a proxied response.
const HOP_BY_HOP: &[&str] = &["connection", "keep-alive", "transfer-encoding", "upgrade", "content-length"];

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub worker: Worker,
    pub handle: WorkerHandle,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(worker: Worker, handle: WorkerHandle, notifier: Arc<dyn Notifier>) -> Self {
        Self { worker, handle, notifier }
    }
}

/// Build the worker's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(MESSAGE_PATH, post(message))
        .route(STATUS_PATH, get(status))
        .route(PUSH_PATH, post(push))
        .route(NOTIFICATION_CLICK_PATH, post(notification_click))
        .fallback(intercept)
        .with_state(state)
}

async fn message(State(state): State<AppState>, body: Bytes) -> Result<Json<WorkerReply>, ApiError> {
    let command: WorkerCommand =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("unknown message: {e}")))?;
    let reply = state.handle.send(command).await?;
    Ok(Json(reply))
}

async fn status(State(state): State<AppState>) -> Json<WorkerStatus> {
    Json(state.worker.status().await)
}

async fn push(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    if body.is_empty() {
        tracing::debug!("push without data, nothing to show");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let message: PushMessage =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid push payload: {e}")))?;
    tracing::info!(?message, "push received");

    let notification = Notification::from_push(message);
    state.notifier.show(&notification).await?;
    Ok(Json(notification).into_response())
}

async fn notification_click(Json(click): Json<NotificationClick>) -> Json<serde_json::Value> {
    let open = click.target();
    if let Some(url) = &open {
        tracing::info!(%url, "opening client window");
    }
    Json(json!({ "open": open }))
}

async fn intercept(State(state): State<AppState>, request: axum::extract::Request) -> Result<Response, ApiError> {
    let request = into_request(state.worker.origin(), request).await?;
    let response = state.worker.handle_fetch(request).await?;
    into_http(response)
}

/// Rebuild an incoming request as an absolute request against the origin.
///
/// Targets that resolve to another origin, in absolute form or as `//host`,
/// are refused. The worker only ever contacts its own origin.
async fn into_request(origin: &Url, request: axum::extract::Request) -> Result<Request, ApiError> {
    let (parts, body) = request.into_parts();

    let url = if parts.uri.scheme().is_some() {
        Url::parse(&parts.uri.to_string())
    } else {
        let target = parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        origin.join(target)
    }
    .map_err(|e| Error::InvalidUrl(e.to_string()))?;

    if url.origin() != origin.origin() {
        let allowed = origin.origin().ascii_serialization();
        return Err(ApiError::BadRequest(format!("request target outside {allowed}")));
    }

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect();

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;

    Ok(Request { method: parts.method.to_string(), url, headers, body })
}

fn into_http(response: CachedResponse) -> Result<Response, ApiError> {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(response.body))
        .map_err(|e| ApiError::Core(Error::Fetch(format!("unusable upstream response: {e}"))))
}
