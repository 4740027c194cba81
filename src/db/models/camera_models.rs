use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::local_time;

/// Camera model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub id: i64,
    /// Device serial, e.g. "CAM-001"
    pub serial: String,
    /// Physical hookup reported by the device (USB, RTSP, ...)
    pub interface_type: String,
    pub connected: bool,
    #[serde(with = "local_time")]
    pub last_updated: NaiveDateTime,
}

/// Payload for registering a camera
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCamera {
    pub serial: String,
    pub interface_type: String,
    #[serde(default)]
    pub connected: bool,
}
