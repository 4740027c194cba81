use crate::api::rest::{ApiResult, AppState};
use crate::db::models::camera_models::{Camera, NewCamera};
use crate::db::repositories::cameras::CamerasRepository;
use crate::error::Error;
use crate::services::cameras::{CameraService, CameraStats, CameraStatus};
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request for switching the primary camera's connection state
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub connect: bool,
}

/// Response for a toggle operation
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub message: String,
    pub status: CameraStatus,
}

/// Response for camera deletion
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Create camera controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_camera_status))
        .route("/toggle", post(toggle_camera_status))
        .route("/list", get(get_all_cameras))
        .route("/stats", get(get_camera_stats))
        .route("/add", post(add_camera))
        .route("/update", put(update_camera))
        .route("/:id", get(get_camera_by_id).delete(delete_camera))
}

fn camera_service(state: &AppState) -> CameraService {
    CameraService::new(CamerasRepository::new(Arc::clone(&state.db_pool)))
}

/// Status of the primary camera for the dashboard panel
async fn get_camera_status(State(state): State<AppState>) -> ApiResult<Json<CameraStatus>> {
    let service = camera_service(&state);
    let status = service.status().await?;

    Ok(Json(status))
}

/// Flip the primary camera's connected flag
async fn toggle_camera_status(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let service = camera_service(&state);
    let status = service.toggle(request.connect).await?;

    let message = if request.connect {
        "Camera connected"
    } else {
        "Camera disconnected"
    };

    Ok(Json(ToggleResponse {
        success: true,
        message: message.to_string(),
        status,
    }))
}

async fn get_all_cameras(State(state): State<AppState>) -> ApiResult<Json<Vec<Camera>>> {
    let service = camera_service(&state);
    let cameras = service.list().await?;

    Ok(Json(cameras))
}

/// Fleet totals for the camera panel
async fn get_camera_stats(State(state): State<AppState>) -> ApiResult<Json<CameraStats>> {
    let service = camera_service(&state);
    let stats = service.stats().await?;

    Ok(Json(stats))
}

async fn get_camera_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Camera>> {
    let service = camera_service(&state);

    match service.get_by_id(id).await? {
        Some(camera) => Ok(Json(camera)),
        None => Err(Error::NotFound(format!("Camera not found: {}", id)).into()),
    }
}

async fn add_camera(
    State(state): State<AppState>,
    Json(camera): Json<NewCamera>,
) -> ApiResult<Json<Camera>> {
    let service = camera_service(&state);
    let stored = service.add(&camera).await?;

    Ok(Json(stored))
}

async fn update_camera(
    State(state): State<AppState>,
    Json(camera): Json<Camera>,
) -> ApiResult<Json<Camera>> {
    let service = camera_service(&state);
    let updated = service.update(&camera).await?;

    Ok(Json(updated))
}

async fn delete_camera(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    let service = camera_service(&state);
    service.delete(id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "Camera deleted".to_string(),
    }))
}
