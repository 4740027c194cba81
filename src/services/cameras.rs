use crate::db::models::camera_models::{Camera, NewCamera};
use crate::db::models::local_time;
use crate::db::repositories::cameras::CamerasRepository;
use crate::error::Error;
use anyhow::Result;
use chrono::Local;
use serde::Serialize;

const DEFAULT_SERIAL: &str = "CAM-001";
const DEFAULT_INTERFACE: &str = "USB";

/// Device details shown on the dashboard's camera panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub serial: String,
    pub interface_type: String,
    pub last_updated: String,
}

/// Connection state of the primary camera
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    pub connected: bool,
    pub connection_status: String,
    pub camera_info: CameraInfo,
    /// Path the dashboard player binds. Reserved for a future streaming
    /// endpoint; this process does not serve it. Present only while the
    /// camera is connected.
    pub stream_url: Option<String>,
}

/// Camera fleet counters
#[derive(Debug, Clone, Serialize)]
pub struct CameraStats {
    pub total: i64,
    pub online: i64,
    pub offline: i64,
}

/// Camera projections for the dashboard plus fleet CRUD
#[derive(Clone)]
pub struct CameraService {
    repo: CamerasRepository,
}

impl CameraService {
    pub fn new(repo: CamerasRepository) -> Self {
        Self { repo }
    }

    /// Status of the primary camera (the first registered one). When no
    /// camera is registered yet the dashboard still gets a disconnected
    /// default device rather than an error.
    pub async fn status(&self) -> Result<CameraStatus> {
        match self.repo.get_first().await? {
            Some(camera) => Ok(status_of(&camera)),
            None => Ok(placeholder_status()),
        }
    }

    /// Flip the primary camera's connected flag, registering the default
    /// device first if the table is empty. Returns the refreshed status.
    pub async fn toggle(&self, connect: bool) -> Result<CameraStatus> {
        let camera = match self.repo.get_first().await? {
            Some(camera) => camera,
            None => {
                self.repo
                    .insert(DEFAULT_SERIAL, DEFAULT_INTERFACE, false)
                    .await?
            }
        };

        self.repo.set_connected(camera.id, connect).await?;
        self.status().await
    }

    pub async fn list(&self) -> Result<Vec<Camera>> {
        self.repo.get_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Camera>> {
        self.repo.get_by_id(id).await
    }

    pub async fn add(&self, camera: &NewCamera) -> Result<Camera> {
        self.repo
            .insert(&camera.serial, &camera.interface_type, camera.connected)
            .await
    }

    pub async fn update(&self, camera: &Camera) -> Result<Camera> {
        match self
            .repo
            .update(
                camera.id,
                &camera.serial,
                &camera.interface_type,
                camera.connected,
            )
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(Error::NotFound(format!("Camera not found: {}", camera.id)).into()),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Camera not found: {}", id)).into())
        }
    }

    /// Fleet totals for the camera panel
    pub async fn stats(&self) -> Result<CameraStats> {
        Ok(CameraStats {
            total: self.repo.count_total().await?,
            online: self.repo.count_by_connected(true).await?,
            offline: self.repo.count_by_connected(false).await?,
        })
    }
}

fn status_of(camera: &Camera) -> CameraStatus {
    let stream_url = camera
        .connected
        .then(|| format!("/api/camera/stream/{}", camera.id));

    CameraStatus {
        connected: camera.connected,
        connection_status: if camera.connected {
            "Connected".to_string()
        } else {
            "Disconnected".to_string()
        },
        camera_info: CameraInfo {
            serial: camera.serial.clone(),
            interface_type: camera.interface_type.clone(),
            last_updated: camera.last_updated.format(local_time::FORMAT).to_string(),
        },
        stream_url,
    }
}

/// Status shown before any camera has been registered
fn placeholder_status() -> CameraStatus {
    CameraStatus {
        connected: false,
        connection_status: "Disconnected".to_string(),
        camera_info: CameraInfo {
            serial: DEFAULT_SERIAL.to_string(),
            interface_type: DEFAULT_INTERFACE.to_string(),
            last_updated: Local::now()
                .naive_local()
                .format(local_time::FORMAT)
                .to_string(),
        },
        stream_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn camera(connected: bool) -> Camera {
        Camera {
            id: 3,
            serial: "CAM-003".to_string(),
            interface_type: "RTSP".to_string(),
            connected,
            last_updated: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn connected_camera_gets_a_stream_url() {
        let status = status_of(&camera(true));
        assert!(status.connected);
        assert_eq!(status.connection_status, "Connected");
        assert_eq!(status.stream_url.as_deref(), Some("/api/camera/stream/3"));
        assert_eq!(status.camera_info.last_updated, "2025-06-01 08:30:00");
    }

    #[test]
    fn disconnected_camera_has_no_stream_url() {
        let status = status_of(&camera(false));
        assert!(!status.connected);
        assert_eq!(status.connection_status, "Disconnected");
        assert!(status.stream_url.is_none());
    }

    #[test]
    fn placeholder_is_the_default_disconnected_device() {
        let status = placeholder_status();
        assert!(!status.connected);
        assert_eq!(status.camera_info.serial, DEFAULT_SERIAL);
        assert_eq!(status.camera_info.interface_type, DEFAULT_INTERFACE);
        assert!(status.stream_url.is_none());
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_value(status_of(&camera(true))).unwrap();
        assert_eq!(json["connectionStatus"], "Connected");
        assert_eq!(json["cameraInfo"]["interfaceType"], "RTSP");
        assert_eq!(json["streamUrl"], "/api/camera/stream/3");
    }
}
