use crate::alerts::AlertHub;
use crate::api::alerts_ws;
use crate::config::ApiConfig;
use crate::error::Error;
use anyhow::Result;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use log::info;
use serde::Serialize;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::path::{Path as FilePath, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub mod camera_controller;
pub mod dashboard_controller;
pub mod history_controller;
pub mod violation_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<PgPool>,
    pub hub: Arc<AlertHub>,
    pub images_dir: PathBuf,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidQuery(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            Error::NotFound(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            },
            Error::CapacityExceeded(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            },
            Error::Config(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            _ => ApiError {
                message: err.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            },
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return (*err).clone().into();
        }

        ApiError {
            message: err.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

pub struct RestApi {
    config: ApiConfig,
    db_pool: Arc<PgPool>,
    hub: Arc<AlertHub>,
    images_dir: PathBuf,
}

impl RestApi {
    pub fn new(
        config: &ApiConfig,
        db_pool: Arc<PgPool>,
        hub: Arc<AlertHub>,
        images_dir: PathBuf,
    ) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            db_pool,
            hub,
            images_dir,
        })
    }

    pub async fn run(&self) -> Result<()> {
        let state = AppState {
            db_pool: Arc::clone(&self.db_pool),
            hub: Arc::clone(&self.hub),
            images_dir: self.images_dir.clone(),
        };

        // Create a CORS layer that allows all origins and preflight requests
        use std::time::Duration;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(false)
            .max_age(Duration::from_secs(3600));

        // Build the API router with routes
        let app = Router::new()
            // History page: paginated records, stats, CSV export
            .nest("/api/history", history_controller::create_router())
            // Dashboard: latest records, overview, aggregate charts
            .nest("/api/index", dashboard_controller::index_router())
            .nest("/api/data", dashboard_controller::data_router())
            // Violation record CRUD plus the detector report endpoint
            .nest("/api/violation", violation_controller::create_router())
            // Camera status and fleet management
            .nest("/api/camera", camera_controller::create_router())
            // Live alert stream for monitoring clients
            .route("/api/alerts/ws", get(alerts_ws::ws_handler))
            // Capture image intake from the detector
            .route("/api/images/upload", post(upload_image))
            .route("/api/images/status", get(image_server_status))
            .with_state(state)
            // Serve stored capture images to the dashboard
            .nest_service("/assets/images", ServeDir::new(&self.images_dir))
            // Apply CORS middleware to all routes
            .layer(cors);

        // Build the server address
        let addr = self.config.address.clone() + ":" + &self.config.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        // Log that we're starting
        info!("API server listening on {}", addr);

        // Create a listener and start the server
        let listener = TcpListener::bind(addr).await?;

        // Start serving (using axum's Server method)
        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}

/// Response for a stored capture image
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub filename: String,
    pub path: String,
}

/// Status of the image intake endpoint
#[derive(Debug, Serialize)]
pub struct ImageServerStatus {
    pub status: String,
    pub message: String,
    pub time: String,
}

/// Receive a violation capture image from the detector (multipart field
/// "file") and store it where the dashboard can fetch it
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        message: format!("Invalid multipart request: {}", e),
        status: StatusCode::BAD_REQUEST.as_u16(),
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = match field.file_name().map(sanitize_filename) {
            Some(name) if !name.is_empty() => name,
            _ => format!(
                "capture_{}.jpg",
                Local::now().naive_local().format("%Y%m%d_%H%M%S")
            ),
        };

        let data = field.bytes().await.map_err(|e| ApiError {
            message: format!("Failed to read image data: {}", e),
            status: StatusCode::BAD_REQUEST.as_u16(),
        })?;
        if data.is_empty() {
            return Err(ApiError {
                message: "Uploaded image is empty".to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            });
        }

        tokio::fs::create_dir_all(&state.images_dir)
            .await
            .map_err(|e| ApiError::from(Error::Io(format!("Failed to create images dir: {}", e))))?;
        let target = state.images_dir.join(&filename);
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| ApiError::from(Error::Io(format!("Failed to store image: {}", e))))?;

        info!("Stored capture image {} ({} bytes)", filename, data.len());

        return Ok(Json(UploadResponse {
            status: "success".to_string(),
            message: "Image uploaded".to_string(),
            path: format!("/assets/images/{}", filename),
            filename,
        }));
    }

    Err(ApiError {
        message: "Missing multipart field: file".to_string(),
        status: StatusCode::BAD_REQUEST.as_u16(),
    })
}

async fn image_server_status() -> Json<ImageServerStatus> {
    Json(ImageServerStatus {
        status: "running".to_string(),
        message: "Image intake endpoint is running".to_string(),
        time: Local::now()
            .naive_local()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    })
}

/// Strip any directory components from a client-supplied filename
fn sanitize_filename(name: &str) -> String {
    FilePath::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_lose_directory_components() {
        assert_eq!(sanitize_filename("capture_1.jpg"), "capture_1.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("/tmp/x/cap.jpg"), "cap.jpg");
    }

    #[test]
    fn api_error_maps_the_taxonomy_to_status_codes() {
        let bad = ApiError::from(Error::InvalidQuery("bad page".to_string()));
        assert_eq!(bad.status, 400);

        let missing = ApiError::from(Error::NotFound("no record".to_string()));
        assert_eq!(missing.status, 404);

        let full = ApiError::from(Error::CapacityExceeded("registry full".to_string()));
        assert_eq!(full.status, 503);

        let db = ApiError::from(Error::Database("connection refused".to_string()));
        assert_eq!(db.status, 500);
    }

    #[test]
    fn anyhow_wrapped_errors_keep_their_status() {
        let err = anyhow::Error::from(Error::NotFound("no record".to_string()));
        let api: ApiError = err.into();
        assert_eq!(api.status, 404);

        let plain = anyhow::anyhow!("something else");
        let api: ApiError = plain.into();
        assert_eq!(api.status, 500);
    }
}
