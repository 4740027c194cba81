use crate::api::rest::{ApiResult, AppState};
use crate::db::models::violation_models::ViolationRecord;
use crate::db::repositories::violations::ViolationsRepository;
use crate::services::violations::ViolationService;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{delete, post, put};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

/// Response for record mutations
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
}

/// Create violation controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_violation_record))
        .route("/update", put(update_violation_record))
        .route("/:id", delete(delete_violation_record))
        .route("/notify", post(notify_violation_detected))
}

fn violation_service(state: &AppState) -> ViolationService {
    ViolationService::new(
        ViolationsRepository::new(Arc::clone(&state.db_pool)),
        Arc::clone(&state.hub),
    )
}

/// Store a record reported through the management UI
async fn add_violation_record(
    State(state): State<AppState>,
    Json(record): Json<ViolationRecord>,
) -> ApiResult<Json<ViolationRecord>> {
    let service = violation_service(&state);
    let stored = service.add(&record).await?;

    Ok(Json(stored))
}

async fn update_violation_record(
    State(state): State<AppState>,
    Json(record): Json<ViolationRecord>,
) -> ApiResult<Json<ViolationRecord>> {
    let service = violation_service(&state);
    let updated = service.update(&record).await?;

    Ok(Json(updated))
}

async fn delete_violation_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MutationResponse>> {
    let service = violation_service(&state);
    service.delete(id).await?;

    Ok(Json(MutationResponse {
        success: true,
        message: "Record deleted".to_string(),
    }))
}

/// Detection report from the capture device. Only broadcast to monitoring
/// clients; the device already persisted the record out-of-band, and the
/// response is success even when no client is connected.
async fn notify_violation_detected(
    State(state): State<AppState>,
    Json(record): Json<ViolationRecord>,
) -> Json<MutationResponse> {
    let service = violation_service(&state);
    service.notify(&record).await;

    Json(MutationResponse {
        success: true,
        message: "Notification broadcast".to_string(),
    })
}
