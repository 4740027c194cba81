use crate::db::models::violation_models::{ViolationQuery, ViolationRecord};
use crate::error::Error;
use anyhow::Result;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use std::sync::Arc;

const RECORD_COLUMNS: &str = "id, camera_id, image_path, upload_time, confidence, location";

/// One week of the dashboard trend, straight from the store
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeeklyCountRow {
    pub week_start: NaiveDateTime,
    pub violation_count: i64,
}

/// One grouped bucket of the type/location distribution queries
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DistributionRow {
    pub bucket: String,
    pub count: i64,
}

/// Violation records repository
#[derive(Clone)]
pub struct ViolationsRepository {
    pool: Arc<PgPool>,
}

impl ViolationsRepository {
    /// Create a new violations repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Insert a new violation record; upload_time falls back to the server
    /// clock when the device did not report one
    pub async fn insert(&self, record: &ViolationRecord) -> Result<ViolationRecord> {
        let result = sqlx::query_as::<_, ViolationRecord>(&format!(
            r#"
            INSERT INTO violation_records (camera_id, image_path, upload_time, confidence, location)
            VALUES ($1, $2, COALESCE($3, LOCALTIMESTAMP), $4, $5)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(record.camera_id)
        .bind(&record.image_path)
        .bind(record.upload_time)
        .bind(record.confidence)
        .bind(&record.location)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to insert violation record: {}", e)))?;

        Ok(result)
    }

    /// Get record by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<ViolationRecord>> {
        let result = sqlx::query_as::<_, ViolationRecord>(&format!(
            r#"
            SELECT {}
            FROM violation_records
            WHERE id = $1
            "#,
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get violation record by ID: {}", e)))?;

        Ok(result)
    }

    /// Update an existing record
    pub async fn update(&self, id: i64, record: &ViolationRecord) -> Result<Option<ViolationRecord>> {
        let result = sqlx::query_as::<_, ViolationRecord>(&format!(
            r#"
            UPDATE violation_records
            SET camera_id = $2, image_path = $3, upload_time = COALESCE($4, upload_time),
                confidence = $5, location = $6
            WHERE id = $1
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(record.camera_id)
        .bind(&record.image_path)
        .bind(record.upload_time)
        .bind(record.confidence)
        .bind(&record.location)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to update violation record: {}", e)))?;

        Ok(result)
    }

    /// Delete a record
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM violation_records WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to delete violation record: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    /// Select one page of records matching the query's filters, newest first.
    /// Pagination bounds are validated by the caller.
    pub async fn select_page(
        &self,
        query: &ViolationQuery,
        dates: &DateBounds,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ViolationRecord>> {
        let (sql, args) = filtered_select(query, dates);
        let (sql, args) = push_page(sql, args, offset, limit);

        let mut db_query = sqlx::query_as::<_, ViolationRecord>(&sql);
        for arg in args {
            db_query = arg.apply_to_query(db_query);
        }

        let result = db_query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to query violation records: {}", e)))?;

        Ok(result)
    }

    /// Select all records matching the query's filters, newest first (export path)
    pub async fn select_all(
        &self,
        query: &ViolationQuery,
        dates: &DateBounds,
    ) -> Result<Vec<ViolationRecord>> {
        let (mut sql, args) = filtered_select(query, dates);

        sql.push_str(" ORDER BY upload_time DESC, id DESC");

        let mut db_query = sqlx::query_as::<_, ViolationRecord>(&sql);
        for arg in args {
            db_query = arg.apply_to_query(db_query);
        }

        let result = db_query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to query violation records: {}", e)))?;

        Ok(result)
    }

    /// Count records matching the same filters as select_page
    pub async fn count(&self, query: &ViolationQuery, dates: &DateBounds) -> Result<i64> {
        let (sql, args) = filtered_count(query, dates);

        let mut db_query = sqlx::query_scalar::<_, i64>(&sql);
        for arg in args {
            db_query = arg.apply_to_scalar(db_query);
        }

        let count = db_query
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to count violation records: {}", e)))?;

        Ok(count)
    }

    /// Get the newest records
    pub async fn latest(&self, limit: i64) -> Result<Vec<ViolationRecord>> {
        let result = sqlx::query_as::<_, ViolationRecord>(&format!(
            r#"
            SELECT {}
            FROM violation_records
            ORDER BY upload_time DESC, id DESC
            LIMIT $1
            "#,
            RECORD_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get latest violation records: {}", e)))?;

        Ok(result)
    }

    /// Count all records
    pub async fn count_all(&self) -> Result<i64> {
        self.scalar_count("SELECT COUNT(*) FROM violation_records")
            .await
    }

    /// Count today's records (server-local calendar day)
    pub async fn count_today(&self) -> Result<i64> {
        self.scalar_count(
            "SELECT COUNT(*) FROM violation_records WHERE upload_time::date = CURRENT_DATE",
        )
        .await
    }

    /// Count records in the current ISO week
    pub async fn count_this_week(&self) -> Result<i64> {
        self.scalar_count(
            "SELECT COUNT(*) FROM violation_records \
             WHERE date_trunc('week', upload_time) = date_trunc('week', LOCALTIMESTAMP)",
        )
        .await
    }

    /// Count records in the previous ISO week
    pub async fn count_last_week(&self) -> Result<i64> {
        self.scalar_count(
            "SELECT COUNT(*) FROM violation_records \
             WHERE date_trunc('week', upload_time) = date_trunc('week', LOCALTIMESTAMP) - INTERVAL '1 week'",
        )
        .await
    }

    /// Count records in the current calendar month
    pub async fn count_this_month(&self) -> Result<i64> {
        self.scalar_count(
            "SELECT COUNT(*) FROM violation_records \
             WHERE date_trunc('month', upload_time) = date_trunc('month', LOCALTIMESTAMP)",
        )
        .await
    }

    /// Count records in the previous calendar month
    pub async fn count_last_month(&self) -> Result<i64> {
        self.scalar_count(
            "SELECT COUNT(*) FROM violation_records \
             WHERE date_trunc('month', upload_time) = date_trunc('month', LOCALTIMESTAMP) - INTERVAL '1 month'",
        )
        .await
    }

    /// Average confidence across all records; None when the table is empty
    pub async fn average_confidence(&self) -> Result<Option<f64>> {
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(confidence) FROM violation_records")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to average confidence: {}", e)))?;

        Ok(avg)
    }

    /// Per-week counts for the trailing eight ISO weeks, zero-filled so the
    /// dashboard chart never has gaps. Oldest week first.
    pub async fn weekly_counts(&self) -> Result<Vec<WeeklyCountRow>> {
        let result = sqlx::query_as::<_, WeeklyCountRow>(
            r#"
            SELECT w.week_start AS week_start, COALESCE(c.cnt, 0)::BIGINT AS violation_count
            FROM generate_series(
                date_trunc('week', LOCALTIMESTAMP) - INTERVAL '7 weeks',
                date_trunc('week', LOCALTIMESTAMP),
                INTERVAL '1 week'
            ) AS w(week_start)
            LEFT JOIN (
                SELECT date_trunc('week', upload_time) AS wk, COUNT(*) AS cnt
                FROM violation_records
                GROUP BY 1
            ) c ON c.wk = w.week_start
            ORDER BY w.week_start
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get weekly trend: {}", e)))?;

        Ok(result)
    }

    /// Violation counts bucketed into coarse categories derived from the
    /// location text. Records carry no explicit type column.
    pub async fn type_distribution(&self) -> Result<Vec<DistributionRow>> {
        let result = sqlx::query_as::<_, DistributionRow>(
            r#"
            SELECT CASE
                       WHEN location ILIKE '%gate%' OR location ILIKE '%entrance%' THEN 'Gate Area'
                       WHEN location ILIKE '%lot%' OR location ILIKE '%parking%' THEN 'Parking Lot'
                       WHEN location ILIKE '%walk%' OR location ILIKE '%path%' THEN 'Walkway'
                       WHEN location ILIKE '%road%' OR location ILIKE '%street%' THEN 'Roadside'
                       ELSE 'Other'
                   END AS bucket,
                   COUNT(*)::BIGINT AS count
            FROM violation_records
            GROUP BY 1
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get type distribution: {}", e)))?;

        Ok(result)
    }

    /// Violation counts grouped by exact location, busiest first
    pub async fn location_distribution(&self) -> Result<Vec<DistributionRow>> {
        let result = sqlx::query_as::<_, DistributionRow>(
            r#"
            SELECT location AS bucket, COUNT(*)::BIGINT AS count
            FROM violation_records
            GROUP BY location
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get location distribution: {}", e)))?;

        Ok(result)
    }

    async fn scalar_count(&self, sql: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(sql)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to count violation records: {}", e)))?;

        Ok(count)
    }
}

/// Parsed date-range bounds accompanying a ViolationQuery; both inclusive
#[derive(Debug, Clone, Default)]
pub struct DateBounds {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Build the filtered SELECT shared by the page and export queries
fn filtered_select(query: &ViolationQuery, dates: &DateBounds) -> (String, Vec<QueryArg>) {
    let sql = format!(
        "SELECT {} FROM violation_records WHERE 1=1",
        RECORD_COLUMNS
    );
    push_filters(sql, query, dates)
}

/// Build the COUNT query over the same filter set
fn filtered_count(query: &ViolationQuery, dates: &DateBounds) -> (String, Vec<QueryArg>) {
    let sql = String::from("SELECT COUNT(*) FROM violation_records WHERE 1=1");
    push_filters(sql, query, dates)
}

/// Append ordering and bound LIMIT/OFFSET after the filter arguments
fn push_page(
    mut sql: String,
    mut args: Vec<QueryArg>,
    offset: i64,
    limit: i64,
) -> (String, Vec<QueryArg>) {
    sql.push_str(" ORDER BY upload_time DESC, id DESC");
    sql.push_str(&format!(
        " LIMIT ${} OFFSET ${}",
        args.len() + 1,
        args.len() + 2
    ));
    args.push(QueryArg::I64(limit));
    args.push(QueryArg::I64(offset));
    (sql, args)
}

fn push_filters(
    mut sql: String,
    query: &ViolationQuery,
    dates: &DateBounds,
) -> (String, Vec<QueryArg>) {
    let mut args: Vec<QueryArg> = Vec::new();
    let mut param_index = 1;

    if let Some(location) = &query.location {
        sql.push_str(&format!(" AND location ILIKE ${}", param_index));
        args.push(QueryArg::String(format!("%{}%", location)));
        param_index += 1;
    }

    if let Some(start) = dates.start {
        sql.push_str(&format!(" AND upload_time >= ${}", param_index));
        args.push(QueryArg::Date(start));
        param_index += 1;
    }

    if let Some(end) = dates.end {
        // Inclusive end date: anything before the following midnight
        sql.push_str(&format!(
            " AND upload_time < ${} + INTERVAL '1 day'",
            param_index
        ));
        args.push(QueryArg::Date(end));
        param_index += 1;
    }

    if let Some(camera_id) = query.camera_id {
        sql.push_str(&format!(" AND camera_id = ${}", param_index));
        args.push(QueryArg::I64(camera_id));
    }

    (sql, args)
}

/// Helper enum for dynamic query parameters
enum QueryArg {
    I64(i64),
    Date(NaiveDate),
    String(String),
}

impl QueryArg {
    // Apply this argument to a query_as builder
    fn apply_to_query<'a, T>(
        self,
        builder: sqlx::query::QueryAs<'a, sqlx::Postgres, T, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::QueryAs<'a, sqlx::Postgres, T, sqlx::postgres::PgArguments> {
        match self {
            QueryArg::I64(i) => builder.bind(i),
            QueryArg::Date(d) => builder.bind(d),
            QueryArg::String(s) => builder.bind(s),
        }
    }

    // Apply this argument to a query_scalar builder
    fn apply_to_scalar<'a, T>(
        self,
        builder: sqlx::query::QueryScalar<'a, sqlx::Postgres, T, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::QueryScalar<'a, sqlx::Postgres, T, sqlx::postgres::PgArguments> {
        match self {
            QueryArg::I64(i) => builder.bind(i),
            QueryArg::Date(d) => builder.bind(d),
            QueryArg::String(s) => builder.bind(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_with(
        location: Option<&str>,
        camera_id: Option<i64>,
    ) -> ViolationQuery {
        ViolationQuery {
            location: location.map(str::to_string),
            camera_id,
            ..ViolationQuery::default()
        }
    }

    #[test]
    fn no_filters_yields_bare_where_clause() {
        let (sql, args) = filtered_count(&query_with(None, None), &DateBounds::default());
        assert_eq!(sql, "SELECT COUNT(*) FROM violation_records WHERE 1=1");
        assert!(args.is_empty());
    }

    #[test]
    fn filters_are_conjunctive_and_numbered_in_order() {
        let dates = DateBounds {
            start: NaiveDate::from_ymd_opt(2025, 6, 1),
            end: NaiveDate::from_ymd_opt(2025, 6, 30),
        };
        let (sql, args) = filtered_count(&query_with(Some("Gate"), Some(3)), &dates);

        assert!(sql.contains("AND location ILIKE $1"));
        assert!(sql.contains("AND upload_time >= $2"));
        assert!(sql.contains("AND upload_time < $3 + INTERVAL '1 day'"));
        assert!(sql.contains("AND camera_id = $4"));
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn location_filter_is_wrapped_for_substring_match() {
        let (_, args) = filtered_count(&query_with(Some("North"), None), &DateBounds::default());
        match &args[0] {
            QueryArg::String(s) => assert_eq!(s, "%North%"),
            _ => panic!("expected string argument"),
        }
    }

    #[test]
    fn pagination_is_bound_after_the_filter_arguments() {
        let dates = DateBounds {
            start: NaiveDate::from_ymd_opt(2025, 6, 1),
            end: None,
        };
        let (sql, args) = filtered_select(&query_with(Some("Gate"), None), &dates);
        let (sql, args) = push_page(sql, args, 20, 10);

        assert!(sql.ends_with("ORDER BY upload_time DESC, id DESC LIMIT $3 OFFSET $4"));
        assert_eq!(args.len(), 4);
        match (&args[2], &args[3]) {
            (QueryArg::I64(limit), QueryArg::I64(offset)) => {
                assert_eq!(*limit, 10);
                assert_eq!(*offset, 20);
            }
            _ => panic!("expected integer arguments"),
        }
    }

    #[test]
    fn select_and_count_share_the_same_filters() {
        let query = query_with(Some("Lot"), Some(9));
        let dates = DateBounds {
            start: NaiveDate::from_ymd_opt(2025, 1, 1),
            end: None,
        };
        let (select_sql, select_args) = filtered_select(&query, &dates);
        let (count_sql, count_args) = filtered_count(&query, &dates);

        let select_where = select_sql.split("WHERE").nth(1);
        let count_where = count_sql.split("WHERE").nth(1);
        assert_eq!(select_where, count_where);
        assert_eq!(select_args.len(), count_args.len());
    }
}
