use crate::alerts::{AlertHub, AlertPayload};
use crate::db::models::local_time;
use crate::db::models::violation_models::{PageResult, ViolationQuery, ViolationRecord};
use crate::db::repositories::violations::{DateBounds, ViolationsRepository};
use crate::error::Error;
use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};
use log::info;
use std::sync::Arc;

/// A rendered CSV export ready to stream to the client
pub struct CsvExport {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Violation record queries, CRUD pass-through and live alert fan-in
#[derive(Clone)]
pub struct ViolationService {
    repo: ViolationsRepository,
    hub: Arc<AlertHub>,
}

impl ViolationService {
    pub fn new(repo: ViolationsRepository, hub: Arc<AlertHub>) -> Self {
        Self { repo, hub }
    }

    /// One page of records under the query's filters plus the total count
    /// over the same filters
    pub async fn query_page(&self, query: &ViolationQuery) -> Result<PageResult<ViolationRecord>> {
        let offset = page_offset(query.page_num, query.page_size)?;
        let bounds = parse_bounds(query)?;

        let records = self
            .repo
            .select_page(query, &bounds, offset, query.page_size)
            .await?;
        let total = self.repo.count(query, &bounds).await?;

        Ok(PageResult {
            records,
            total,
            current: query.page_num,
            page_size: query.page_size,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ViolationRecord>> {
        self.repo.get_by_id(id).await
    }

    /// Newest records for the dashboard ticker
    pub async fn latest(&self, limit: i64) -> Result<Vec<ViolationRecord>> {
        if limit < 1 {
            return Err(Error::InvalidQuery(format!("Limit must be positive, got {}", limit)).into());
        }
        self.repo.latest(limit).await
    }

    /// Persist a record reported through the management API
    pub async fn add(&self, record: &ViolationRecord) -> Result<ViolationRecord> {
        validate_confidence(record.confidence)?;
        let stored = self.repo.insert(record).await?;
        info!(
            "Stored violation record {:?} from camera {}",
            stored.id, stored.camera_id
        );
        Ok(stored)
    }

    pub async fn update(&self, record: &ViolationRecord) -> Result<ViolationRecord> {
        let id = match record.id {
            Some(id) => id,
            None => {
                return Err(
                    Error::InvalidQuery("Record id is required for update".to_string()).into(),
                )
            }
        };
        validate_confidence(record.confidence)?;

        match self.repo.update(id, record).await? {
            Some(updated) => Ok(updated),
            None => Err(Error::NotFound(format!("Violation record not found: {}", id)).into()),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Violation record not found: {}", id)).into())
        }
    }

    /// Export every record matching the filters. Pagination fields on the
    /// query are ignored; the export always covers the full filtered set.
    pub async fn export_csv(&self, query: &ViolationQuery) -> Result<CsvExport> {
        let bounds = parse_bounds(query)?;
        let records = self.repo.select_all(query, &bounds).await?;

        info!("Exporting {} violation records to CSV", records.len());

        Ok(CsvExport {
            filename: export_filename(&Local::now().naive_local()),
            data: render_csv(&records),
        })
    }

    /// Fan a detection report out to every monitoring client. Fire and
    /// forget: the detector path never fails here and nothing is persisted
    /// (the capture device already stored the record out-of-band).
    pub async fn notify(&self, record: &ViolationRecord) {
        let payload = AlertPayload::from_record(record);
        self.hub.broadcast(&payload).await;
        info!(
            "Violation alert broadcast for camera {} at {}",
            record.camera_id, record.location
        );
    }
}

/// Validate pagination input and convert it to a zero-based offset.
/// Non-positive values are rejected rather than clamped.
fn page_offset(page_num: i64, page_size: i64) -> Result<i64> {
    if page_num < 1 || page_size < 1 {
        return Err(Error::InvalidQuery(format!(
            "Page number and size must be positive, got pageNum={} pageSize={}",
            page_num, page_size
        ))
        .into());
    }
    Ok((page_num - 1) * page_size)
}

fn parse_bounds(query: &ViolationQuery) -> Result<DateBounds> {
    Ok(DateBounds {
        start: parse_date(query.start_date.as_deref())?,
        end: parse_date(query.end_date.as_deref())?,
    })
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::InvalidQuery(format!("Invalid date: {}", s)).into()),
        None => Ok(None),
    }
}

fn validate_confidence(confidence: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(Error::InvalidQuery(format!(
            "Confidence must be within [0, 1], got {}",
            confidence
        ))
        .into());
    }
    Ok(())
}

fn export_filename(stamp: &NaiveDateTime) -> String {
    format!("violation_records_{}.csv", stamp.format("%Y%m%d_%H%M%S"))
}

/// Render records as UTF-8 CSV. Absent fields become empty cells;
/// confidence stays a decimal fraction and timestamps use the dashboard
/// format.
fn render_csv(records: &[ViolationRecord]) -> Vec<u8> {
    let mut csv = String::from("id,cameraId,imagePath,uploadTime,confidence,location\n");

    for record in records {
        let id = record.id.map(|v| v.to_string()).unwrap_or_default();
        let image_path = record.image_path.as_deref().unwrap_or_default();
        let upload_time = record
            .upload_time
            .map(|t| t.format(local_time::FORMAT).to_string())
            .unwrap_or_default();

        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            id, record.camera_id, image_path, upload_time, record.confidence, record.location
        ));
    }

    csv.into_bytes()
}
