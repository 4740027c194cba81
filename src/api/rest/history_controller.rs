use crate::api::rest::{ApiResult, AppState};
use crate::db::models::violation_models::{PageResult, ViolationQuery, ViolationRecord};
use crate::db::repositories::cameras::CamerasRepository;
use crate::db::repositories::violations::ViolationsRepository;
use crate::error::Error;
use crate::services::statistics::{Statistics, StatisticsService};
use crate::services::violations::ViolationService;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Create history controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/list", get(get_violation_list))
        .route("/stats", get(get_violation_stats))
        .route("/detail/:id", get(get_violation_detail))
        .route("/export", post(export_violation_records))
}

fn violation_service(state: &AppState) -> ViolationService {
    ViolationService::new(
        ViolationsRepository::new(Arc::clone(&state.db_pool)),
        Arc::clone(&state.hub),
    )
}

fn statistics_service(state: &AppState) -> StatisticsService {
    StatisticsService::new(
        ViolationsRepository::new(Arc::clone(&state.db_pool)),
        CamerasRepository::new(Arc::clone(&state.db_pool)),
    )
}

/// Paginated violation records for the history page
async fn get_violation_list(
    State(state): State<AppState>,
    Query(query): Query<ViolationQuery>,
) -> ApiResult<Json<PageResult<ViolationRecord>>> {
    let service = violation_service(&state);
    let page = service.query_page(&query).await?;

    Ok(Json(page))
}

/// Headline counters for the history page
async fn get_violation_stats(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    let service = statistics_service(&state);
    let stats = service.statistics().await?;

    Ok(Json(stats))
}

/// Single record detail
async fn get_violation_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ViolationRecord>> {
    let service = violation_service(&state);

    match service.get_by_id(id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(Error::NotFound(format!("Violation record not found: {}", id)).into()),
    }
}

/// Export the filtered record set as a CSV attachment. Filters come in the
/// request body; pagination fields are ignored for export.
async fn export_violation_records(
    State(state): State<AppState>,
    Json(query): Json<ViolationQuery>,
) -> ApiResult<Response> {
    let service = violation_service(&state);
    let export = service.export_csv(&query).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];

    Ok((StatusCode::OK, headers, export.data).into_response())
}
