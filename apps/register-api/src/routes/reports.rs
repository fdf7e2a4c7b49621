//! Back-office reports: stored Z-reports and receipts for analytics.

use axum::extract::{Query, State};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use kassa_core::report::ZReport;
use kassa_core::Receipt;
use serde::{Deserialize, Serialize};

use super::clamp_limit;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ReportType {
    #[serde(rename = "z-reports")]
    ZReports,
    #[serde(rename = "analytics")]
    Analytics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsQuery {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportData {
    ZReports(Vec<ZReport>),
    Analytics { receipts: Vec<Receipt> },
}

/// GET /reports?type=z-reports|analytics&startDate&endDate&limit
///
/// Dates are RFC 3339 timestamps or plain `YYYY-MM-DD` days; a plain
/// `endDate` includes the whole day.
pub async fn reports(State(state): State<AppState>, Query(query): Query<ReportsQuery>) -> ApiResult<ReportData> {
    let start = query
        .start_date
        .as_deref()
        .map(|raw| parse_bound(raw, Bound::Start))
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(|raw| parse_bound(raw, Bound::End))
        .transpose()?;

    let data = match query.report_type {
        ReportType::ZReports => {
            let reports = state
                .db
                .reports()
                .z_reports(start, end, clamp_limit(query.limit, 30))
                .await?;
            ReportData::ZReports(reports)
        }
        ReportType::Analytics => {
            let receipts = state
                .db
                .reports()
                .receipts_between(start, end, clamp_limit(query.limit, 200))
                .await?;
            ReportData::Analytics { receipts }
        }
    };

    Ok(ApiResponse::ok(data))
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::validation(format!("invalid date '{raw}'")))?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(day.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bound_accepts_days_and_timestamps() {
        let start = parse_bound("2024-03-01", Bound::Start).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let end = parse_bound("2024-03-01", Bound::End).unwrap();
        assert!(end > start);
        assert_eq!(end.date_naive(), start.date_naive());

        let at = parse_bound("2024-03-01T10:00:00+02:00", Bound::Start).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-01T08:00:00+00:00");

        assert!(parse_bound("yesterday", Bound::Start).is_err());
    }
}
