use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::local_time_option;

/// A single violation detection reported by a camera. Immutable once stored;
/// `id` is absent on records that have not been persisted yet (live alerts).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub camera_id: i64,
    /// Capture image file name; null when the device failed to upload one
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(with = "local_time_option", default)]
    pub upload_time: Option<NaiveDateTime>,
    /// Detection confidence as a fraction in [0, 1]
    pub confidence: f64,
    pub location: String,
}

/// History page filters. `page_num` and `page_size` are 1-based and must be
/// at least 1; the remaining filters combine conjunctively.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationQuery {
    #[serde(default = "default_page_num")]
    pub page_num: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Substring match on location
    #[serde(default)]
    pub location: Option<String>,
    /// Inclusive lower bound, "YYYY-MM-DD"
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive upper bound, "YYYY-MM-DD"
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub camera_id: Option<i64>,
}

fn default_page_num() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

impl Default for ViolationQuery {
    fn default() -> Self {
        Self {
            page_num: default_page_num(),
            page_size: default_page_size(),
            location: None,
            start_date: None,
            end_date: None,
            camera_id: None,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub records: Vec<T>,
    /// Total matching rows under the same filters, across all pages
    pub total: i64,
    /// The page that was requested
    pub current: i64,
    pub page_size: i64,
}

/// Weekly trend bucket for the dashboard chart
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    /// Label such as "Week 23"
    pub week: String,
    pub violation_count: i64,
    /// Label such as "06-02 ~ 06-08"
    pub date_range: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_notify_payload_deserializes() {
        let body = r#"{
            "id": null,
            "cameraId": 1,
            "location": "North Gate",
            "confidence": 0.87,
            "imagePath": "violation_20250601_083000.jpg",
            "uploadTime": "2025-06-01 08:30:00"
        }"#;

        let record: ViolationRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.camera_id, 1);
        assert_eq!(record.confidence, 0.87);
        assert_eq!(
            record.image_path.as_deref(),
            Some("violation_20250601_083000.jpg")
        );
        assert!(record.upload_time.is_some());
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let record = ViolationRecord {
            id: Some(7),
            camera_id: 1,
            image_path: None,
            upload_time: None,
            confidence: 0.9,
            location: "East Lot".to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["cameraId"], 1);
        assert_eq!(json["imagePath"], serde_json::Value::Null);
        assert_eq!(json["uploadTime"], serde_json::Value::Null);
        assert!(json.get("camera_id").is_none());
    }

    #[test]
    fn query_defaults_to_first_page_of_ten() {
        let query: ViolationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page_num, 1);
        assert_eq!(query.page_size, 10);
        assert!(query.location.is_none());
    }
}
