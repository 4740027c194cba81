use crate::api::rest::{ApiResult, AppState};
use crate::db::models::violation_models::ViolationRecord;
use crate::db::repositories::cameras::CamerasRepository;
use crate::db::repositories::violations::ViolationsRepository;
use crate::services::statistics::{AllStats, Overview, Statistics, StatisticsService};
use crate::services::violations::ViolationService;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

/// One row of the index page changelog
#[derive(Debug, Clone, Serialize)]
pub struct SystemUpdate {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub time: String,
}

/// Create the index page router
pub fn index_router() -> Router<AppState> {
    Router::new()
        .route("/statistics", get(get_index_statistics))
        .route("/latest/:limit", get(get_latest_records))
        .route("/updates", get(get_system_updates))
}

/// Create the data page router
pub fn data_router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(get_overview_stats))
        .route("/all", get(get_all_stats))
}

fn statistics_service(state: &AppState) -> StatisticsService {
    StatisticsService::new(
        ViolationsRepository::new(Arc::clone(&state.db_pool)),
        CamerasRepository::new(Arc::clone(&state.db_pool)),
    )
}

fn violation_service(state: &AppState) -> ViolationService {
    ViolationService::new(
        ViolationsRepository::new(Arc::clone(&state.db_pool)),
        Arc::clone(&state.hub),
    )
}

/// Headline counters for the index page
async fn get_index_statistics(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    let service = statistics_service(&state);
    let stats = service.statistics().await?;

    Ok(Json(stats))
}

/// Newest records for the index page ticker
async fn get_latest_records(
    State(state): State<AppState>,
    Path(limit): Path<i64>,
) -> ApiResult<Json<Vec<ViolationRecord>>> {
    let service = violation_service(&state);
    let records = service.latest(limit).await?;

    Ok(Json(records))
}

/// Static changelog shown on the index page
async fn get_system_updates() -> Json<Vec<SystemUpdate>> {
    Json(system_updates())
}

/// Overview block for the data page
async fn get_overview_stats(State(state): State<AppState>) -> ApiResult<Json<Overview>> {
    let service = statistics_service(&state);
    let overview = service.overview().await?;

    Ok(Json(overview))
}

/// Everything the data page charts need in one response
async fn get_all_stats(State(state): State<AppState>) -> ApiResult<Json<AllStats>> {
    let service = statistics_service(&state);
    let stats = service.all_stats().await?;

    Ok(Json(stats))
}

fn system_updates() -> Vec<SystemUpdate> {
    vec![
        SystemUpdate {
            kind: "update".to_string(),
            title: "System upgraded to v2.1.0".to_string(),
            time: "2 hours ago".to_string(),
        },
        SystemUpdate {
            kind: "feature".to_string(),
            title: "Added new violation type detection".to_string(),
            time: "1 day ago".to_string(),
        },
        SystemUpdate {
            kind: "notice".to_string(),
            title: "Scheduled maintenance notice".to_string(),
            time: "2 days ago".to_string(),
        },
        SystemUpdate {
            kind: "optimize".to_string(),
            title: "Performance optimization update".to_string(),
            time: "3 days ago".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changelog_rows_use_the_type_key() {
        let updates = system_updates();
        assert_eq!(updates.len(), 4);

        let json = serde_json::to_value(&updates[0]).unwrap();
        assert_eq!(json["type"], "update");
        assert!(json.get("kind").is_none());
    }
}
