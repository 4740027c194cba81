use crate::db::models::local_time_option;
use crate::db::models::violation_models::ViolationRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Alert pushed to every connected monitoring client when a new violation
/// is reported. Mirrors the record fields plus a display message the
/// frontend shows as a toast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub id: Option<i64>,
    pub camera_id: i64,
    pub location: String,
    /// Detection confidence as a fraction in [0, 1]
    pub confidence: f64,
    pub image_path: Option<String>,
    #[serde(with = "local_time_option", default)]
    pub upload_time: Option<NaiveDateTime>,
    pub message: String,
}

impl AlertPayload {
    /// Build the payload for a freshly reported record. The display message
    /// scales confidence to a percentage; the `confidence` field itself stays
    /// a raw fraction.
    pub fn from_record(record: &ViolationRecord) -> Self {
        let message = format!(
            "Camera {} detected a violation at {}, confidence {:.1}%",
            record.camera_id,
            record.location,
            record.confidence * 100.0
        );

        Self {
            id: record.id,
            camera_id: record.camera_id,
            location: record.location.clone(),
            confidence: record.confidence,
            image_path: record.image_path.clone(),
            upload_time: record.upload_time,
            message,
        }
    }
}
