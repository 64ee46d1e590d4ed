//! Read-only HTTP surface over the frame index.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `GET` | `/heatmap/frames?duration=&type=` | Frames in the past N minutes |
//! | `GET` | `/heatmap/{frame_type}/{timestamp}` | One frame's PNG bytes |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use heatmap_core::{DurationSelector, Frame, FrameRef, FrameType, now_unix_secs};
use heatmap_store::{FrameIndex, StoreError};

pub struct AppState {
    index: Mutex<FrameIndex>,
}

impl AppState {
    /// The index should be its own connection, not the scheduler's.
    pub fn new(index: FrameIndex) -> Self {
        Self {
            index: Mutex::new(index),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotIndexed { frame_type: FrameType, timestamp: i64 },
    FileMissing { frame_type: FrameType, timestamp: i64 },
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotIndexed {
                frame_type,
                timestamp,
            } => (
                StatusCode::NOT_FOUND,
                "not_indexed",
                format!("no {frame_type} frame at {timestamp}"),
            ),
            ApiError::FileMissing {
                frame_type,
                timestamp,
            } => (
                StatusCode::GONE,
                "file_missing",
                format!("{frame_type} frame at {timestamp} is indexed but its image is gone"),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("request failed: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "reason": reason,
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/heatmap/frames", get(list_frames))
        .route("/heatmap/{frame_type}/{timestamp}", get(get_frame))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct FramesQuery {
    /// Minutes: 30, 60, 360 or 1440.
    pub duration: Option<String>,
    /// Defaults to `rolling`.
    #[serde(rename = "type")]
    pub frame_type: Option<String>,
}

async fn list_frames(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FramesQuery>,
) -> Result<Json<Vec<FrameRef>>, ApiError> {
    let duration = query
        .duration
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("missing `duration` parameter".to_string()))?
        .parse::<DurationSelector>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let frame_type = match query.frame_type.as_deref() {
        Some(raw) => parse_frame_type(raw)?,
        None => FrameType::Rolling,
    };

    let index = state.index.lock().await;
    let frames = index.frames_for_duration(duration, frame_type, now_unix_secs())?;
    Ok(Json(frames))
}

async fn get_frame(
    State(state): State<Arc<AppState>>,
    Path((frame_type, timestamp)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let frame_type = parse_frame_type(&frame_type)?;
    let timestamp = parse_timestamp(&timestamp)?;

    // Only the lookup holds the index; the file read runs unlocked.
    let frame = state
        .index
        .lock()
        .await
        .exact_lookup(frame_type, timestamp)?
        .ok_or(ApiError::NotIndexed {
            frame_type,
            timestamp,
        })?;

    let bytes = read_frame(&frame).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

/// Image bytes of an indexed frame. A vanished file is `FileMissing`.
async fn read_frame(frame: &Frame) -> Result<Vec<u8>, ApiError> {
    match tokio::fs::read(&frame.file_path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "{} frame at {} is indexed but missing on disk: {}",
                frame.frame_type,
                frame.captured_at,
                frame.file_path.display()
            );
            Err(ApiError::FileMissing {
                frame_type: frame.frame_type,
                timestamp: frame.captured_at,
            })
        }
        Err(e) => Err(ApiError::Internal(format!(
            "failed to read {}: {e}",
            frame.file_path.display()
        ))),
    }
}

fn parse_frame_type(raw: &str) -> Result<FrameType, ApiError> {
    raw.parse().map_err(|e: heatmap_core::CoreError| ApiError::BadRequest(e.to_string()))
}

/// Accepts `1771675200` or `1771675200.png`.
fn parse_timestamp(raw: &str) -> Result<i64, ApiError> {
    let digits = raw.strip_suffix(".png").unwrap_or(raw);
    digits
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp: {raw}")))
}
