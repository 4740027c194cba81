pub mod camera_models;
pub mod violation_models;

/// Serde helpers for the dashboard's local timestamp format
/// ("YYYY-MM-DD HH:MM:SS", no timezone). Capture devices report times in
/// this format and the frontend renders it verbatim.
pub mod local_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Same format for optional timestamps; detectors may omit the time entirely.
pub mod local_time_option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::local_time::FORMAT;

    pub fn serialize<S>(dt: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) => NaiveDateTime::parse_from_str(&s, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Stamp {
        #[serde(with = "super::local_time")]
        at: NaiveDateTime,
        #[serde(with = "super::local_time_option", default)]
        maybe: Option<NaiveDateTime>,
    }

    #[test]
    fn timestamps_use_dashboard_format() {
        let stamp: Stamp =
            serde_json::from_str(r#"{"at":"2025-06-01 08:30:00","maybe":null}"#).unwrap();
        assert_eq!(stamp.at.to_string(), "2025-06-01 08:30:00");
        assert!(stamp.maybe.is_none());

        let json = serde_json::to_string(&stamp).unwrap();
        assert!(json.contains("\"2025-06-01 08:30:00\""));
    }

    #[test]
    fn missing_optional_timestamp_is_accepted() {
        let stamp: Stamp = serde_json::from_str(r#"{"at":"2025-06-01 08:30:00"}"#).unwrap();
        assert!(stamp.maybe.is_none());
    }

    #[test]
    fn rfc3339_input_is_rejected() {
        let parsed: Result<Stamp, _> =
            serde_json::from_str(r#"{"at":"2025-06-01T08:30:00Z"}"#);
        assert!(parsed.is_err());
    }
}
