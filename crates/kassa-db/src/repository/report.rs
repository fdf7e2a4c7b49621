//! # Report Repository
//!
//! Read side for back-office reports: the Z-reports frozen at shift close
//! and receipts over a date range for analytics.

use chrono::{DateTime, Utc};
use kassa_core::report::ZReport;
use kassa_core::Receipt;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Stored Z-reports, newest first. Bounds are inclusive on `endTime`.
    pub async fn z_reports(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> DbResult<Vec<ZReport>> {
        let rows: Vec<Json<ZReport>> = sqlx::query_scalar(
            r#"
            SELECT report FROM z_reports
            WHERE (?1 IS NULL OR end_time >= ?1)
              AND (?2 IS NULL OR end_time <= ?2)
            ORDER BY end_time DESC
            LIMIT ?3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(report)| report).collect())
    }

    /// Receipts issued in a range, newest first.
    pub async fn receipts_between(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> DbResult<Vec<Receipt>> {
        let receipts = sqlx::query_as::<_, Receipt>(
            r#"
            SELECT * FROM receipts
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            ORDER BY receipt_number DESC
            LIMIT ?3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{database, open_shift};
    use chrono::Duration;
    use kassa_core::shift::{CloseShiftRequest, ShiftManager};

    #[tokio::test]
    async fn test_z_reports_respect_range() {
        let db = database().await;
        let manager = ShiftManager::default();
        let shift = open_shift(&db, 100).await;
        let (_, report) = db
            .shifts()
            .close(&manager, &shift.id, CloseShiftRequest::default(), 10)
            .await
            .unwrap();

        let before = report.end_time - Duration::hours(1);
        let after = report.end_time + Duration::hours(1);

        assert_eq!(db.reports().z_reports(Some(before), Some(after), 10).await.unwrap().len(), 1);
        assert!(db.reports().z_reports(Some(after), None, 10).await.unwrap().is_empty());
        assert!(db.reports().z_reports(None, Some(before), 10).await.unwrap().is_empty());
        assert!(db.reports().receipts_between(Some(before), Some(after), 10).await.unwrap().is_empty());
    }
}
