use crate::db::models::violation_models::WeeklyTrend;
use crate::db::repositories::cameras::CamerasRepository;
use crate::db::repositories::violations::{DistributionRow, ViolationsRepository, WeeklyCountRow};
use anyhow::Result;
use chrono::{Datelike, Duration};
use serde::Serialize;

/// Headline counters for the history page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_records: i64,
    pub today_records: i64,
    pub avg_confidence: f64,
    pub total_cameras: i64,
    pub online_cameras: i64,
    pub offline_cameras: i64,
}

/// Dashboard overview block with week/month growth rates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_violations: i64,
    pub week_violation_count: i64,
    pub avg_confidence: f64,
    pub camera_total: i64,
    pub camera_online: i64,
    pub camera_offline: i64,
    pub week_compare_rate: f64,
    pub month_compare_rate: f64,
}

/// One slice of the violation-type pie chart
#[derive(Debug, Clone, Serialize)]
pub struct TypeBucket {
    #[serde(rename = "type")]
    pub category: String,
    pub count: i64,
    pub percentage: f64,
}

/// One slice of the location distribution chart
#[derive(Debug, Clone, Serialize)]
pub struct LocationBucket {
    pub location: String,
    pub count: i64,
    pub percentage: f64,
}

/// Everything the dashboard loads in one request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStats {
    pub overview: Overview,
    pub weekly_trend: Vec<WeeklyTrend>,
    pub violation_type: Vec<TypeBucket>,
    pub location_distribution: Vec<LocationBucket>,
}

/// Aggregates store counters into display-ready statistics. Stateless;
/// every call re-derives from current storage, so readings may trail
/// concurrent inserts by one dashboard refresh.
#[derive(Clone)]
pub struct StatisticsService {
    violations: ViolationsRepository,
    cameras: CamerasRepository,
}

impl StatisticsService {
    pub fn new(violations: ViolationsRepository, cameras: CamerasRepository) -> Self {
        Self {
            violations,
            cameras,
        }
    }

    /// Headline counters for the history page
    pub async fn statistics(&self) -> Result<Statistics> {
        let total_records = self.violations.count_all().await?;
        let today_records = self.violations.count_today().await?;
        let avg_confidence = display_confidence(self.violations.average_confidence().await?);
        let total_cameras = self.cameras.count_total().await?;
        let online_cameras = self.cameras.count_by_connected(true).await?;
        let offline_cameras = self.cameras.count_by_connected(false).await?;

        Ok(Statistics {
            total_records,
            today_records,
            avg_confidence,
            total_cameras,
            online_cameras,
            offline_cameras,
        })
    }

    /// Dashboard overview block
    pub async fn overview(&self) -> Result<Overview> {
        let total_violations = self.violations.count_all().await?;
        let week_violation_count = self.violations.count_this_week().await?;
        let last_week_count = self.violations.count_last_week().await?;
        let this_month_count = self.violations.count_this_month().await?;
        let last_month_count = self.violations.count_last_month().await?;
        let avg_confidence = display_confidence(self.violations.average_confidence().await?);

        let camera_total = self.cameras.count_total().await?;
        let camera_online = self.cameras.count_by_connected(true).await?;
        let camera_offline = self.cameras.count_by_connected(false).await?;

        Ok(Overview {
            total_violations,
            week_violation_count,
            avg_confidence,
            camera_total,
            camera_online,
            camera_offline,
            week_compare_rate: compare_rate(week_violation_count, last_week_count),
            month_compare_rate: compare_rate(this_month_count, last_month_count),
        })
    }

    /// Violations per week over the trailing eight weeks, oldest first
    pub async fn weekly_trend(&self) -> Result<Vec<WeeklyTrend>> {
        let rows = self.violations.weekly_counts().await?;
        Ok(trend_from_rows(rows))
    }

    /// Violation counts by coarse category derived from location text
    pub async fn type_distribution(&self) -> Result<Vec<TypeBucket>> {
        let rows = self.violations.type_distribution().await?;
        Ok(type_buckets(rows))
    }

    /// Violation counts by exact location, busiest first
    pub async fn location_distribution(&self) -> Result<Vec<LocationBucket>> {
        let rows = self.violations.location_distribution().await?;
        Ok(location_buckets(rows))
    }

    /// Everything the dashboard loads in one request
    pub async fn all_stats(&self) -> Result<AllStats> {
        Ok(AllStats {
            overview: self.overview().await?,
            weekly_trend: self.weekly_trend().await?,
            violation_type: self.type_distribution().await?,
            location_distribution: self.location_distribution().await?,
        })
    }
}

/// Period-over-period growth rate as a signed percentage. Growth from a
/// zero baseline saturates at a flat 100 instead of going unbounded; a
/// drop to zero reports -100.
pub fn compare_rate(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current == 0 { 0.0 } else { 100.0 };
    }
    if current == 0 {
        return -100.0;
    }
    (current - previous) as f64 / previous as f64 * 100.0
}

/// Displayed average confidence. An empty store has no average; the
/// dashboard shows zero rather than an absent field.
fn display_confidence(avg: Option<f64>) -> f64 {
    avg.unwrap_or(0.0)
}

fn trend_from_rows(rows: Vec<WeeklyCountRow>) -> Vec<WeeklyTrend> {
    rows.into_iter()
        .map(|row| {
            let start = row.week_start.date();
            let end = start + Duration::days(6);
            WeeklyTrend {
                week: format!("Week {}", start.iso_week().week()),
                violation_count: row.violation_count,
                date_range: format!("{} ~ {}", start.format("%m-%d"), end.format("%m-%d")),
            }
        })
        .collect()
}

fn type_buckets(rows: Vec<DistributionRow>) -> Vec<TypeBucket> {
    let total: i64 = rows.iter().map(|row| row.count).sum();
    rows.into_iter()
        .map(|row| TypeBucket {
            percentage: share_of(row.count, total),
            category: row.bucket,
            count: row.count,
        })
        .collect()
}

fn location_buckets(rows: Vec<DistributionRow>) -> Vec<LocationBucket> {
    let total: i64 = rows.iter().map(|row| row.count).sum();
    rows.into_iter()
        .map(|row| LocationBucket {
            percentage: share_of(row.count, total),
            location: row.bucket,
            count: row.count,
        })
        .collect()
}

fn share_of(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[test]
    fn compare_rate_matches_growth_policy() {
        // Zero baseline saturates instead of dividing by zero
        assert_eq!(compare_rate(0, 0), 0.0);
        assert_eq!(compare_rate(5, 0), 100.0);
        // Dropping to zero is a full decline
        assert_eq!(compare_rate(0, 5), -100.0);
        // Otherwise a plain signed percentage
        assert_eq!(compare_rate(150, 100), 50.0);
        assert_eq!(compare_rate(50, 100), -50.0);
        assert_eq!(compare_rate(100, 100), 0.0);
    }

    #[test]
    fn empty_store_average_displays_as_zero() {
        // No rows means the store reports no average at all
        assert_eq!(display_confidence(None), 0.0);
        assert_eq!(display_confidence(Some(0.87)), 0.87);
    }

    #[test]
    fn trend_rows_get_week_and_range_labels() {
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let trend = trend_from_rows(vec![WeeklyCountRow {
            week_start: monday,
            violation_count: 7,
        }]);

        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].week, "Week 23");
        assert_eq!(trend[0].violation_count, 7);
        assert_eq!(trend[0].date_range, "06-02 ~ 06-08");
    }

    #[test]
    fn bucket_percentages_sum_from_counts() {
        let buckets = type_buckets(vec![
            DistributionRow {
                bucket: "Gate Area".to_string(),
                count: 60,
            },
            DistributionRow {
                bucket: "Other".to_string(),
                count: 40,
            },
        ]);

        assert_eq!(buckets[0].percentage, 60.0);
        assert_eq!(buckets[1].percentage, 40.0);
    }

    #[test]
    fn empty_distribution_yields_no_buckets() {
        assert!(location_buckets(Vec::new()).is_empty());
    }

    #[test]
    fn type_bucket_serializes_with_type_key() {
        let json = serde_json::to_value(&TypeBucket {
            category: "Gate Area".to_string(),
            count: 3,
            percentage: 75.0,
        })
        .unwrap();

        assert_eq!(json["type"], "Gate Area");
        assert!(json.get("category").is_none());
    }

    // End-to-end check against a live database. Set TEST_DATABASE to a
    // Postgres URL to run.
    #[tokio::test]
    async fn test_statistics_against_database() -> Result<()> {
        let url = match std::env::var("TEST_DATABASE") {
            Ok(url) => url,
            Err(_) => {
                println!("Skipping database test. Set TEST_DATABASE to a Postgres URL to run.");
                return Ok(());
            }
        };

        let pool = Arc::new(sqlx::postgres::PgPool::connect(&url).await?);
        crate::db::migrations::run_migrations(&pool, std::path::Path::new("src/db/migrations/sql"))
            .await?;

        let service = StatisticsService::new(
            ViolationsRepository::new(Arc::clone(&pool)),
            CamerasRepository::new(Arc::clone(&pool)),
        );

        // Whatever the store holds, the counters assemble without error and
        // the displayed average is never absent
        let stats = service.statistics().await?;
        assert!(stats.total_records >= 0);
        assert!(stats.avg_confidence >= 0.0);
        assert_eq!(
            stats.total_cameras,
            stats.online_cameras + stats.offline_cameras
        );

        let overview = service.overview().await?;
        assert!(overview.avg_confidence >= 0.0);
        assert_eq!(
            overview.camera_total,
            overview.camera_online + overview.camera_offline
        );

        Ok(())
    }
}
