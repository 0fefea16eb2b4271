//! Error report repository, backing the admin monitoring endpoints.

use crate::db::errors::Result;
use crate::db::models::error_reports::{ErrorReportCreateDBRequest, ErrorReportDBResponse, ReportSeverity};
use crate::types::ErrorReportId;
use sqlx::PgConnection;

const REPORT_COLUMNS: &str = "id, reporter, severity, message, context, resolved, created_at, resolved_at";

/// Filter for listing error reports.
#[derive(Debug, Clone)]
pub struct ErrorReportFilter {
    pub resolved: Option<bool>,
    pub severity: Option<ReportSeverity>,
    pub skip: i64,
    pub limit: i64,
}

pub struct ErrorReports<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ErrorReports<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &ErrorReportCreateDBRequest) -> Result<ErrorReportDBResponse> {
        let report = sqlx::query_as::<_, ErrorReportDBResponse>(&format!(
            "INSERT INTO error_reports (reporter, severity, message, context)
             VALUES ($1, $2, $3, $4)
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(request.reporter)
        .bind(request.severity)
        .bind(&request.message)
        .bind(&request.context)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(report)
    }

    pub async fn list(&mut self, filter: &ErrorReportFilter) -> Result<Vec<ErrorReportDBResponse>> {
        let reports = sqlx::query_as::<_, ErrorReportDBResponse>(&format!(
            "SELECT {REPORT_COLUMNS} FROM error_reports
             WHERE ($1::boolean IS NULL OR resolved = $1)
               AND ($2::text IS NULL OR severity = $2)
             ORDER BY created_at DESC, id DESC
             OFFSET $3 LIMIT $4"
        ))
        .bind(filter.resolved)
        .bind(filter.severity)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(reports)
    }

    pub async fn count(&mut self, filter: &ErrorReportFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM error_reports
             WHERE ($1::boolean IS NULL OR resolved = $1)
               AND ($2::text IS NULL OR severity = $2)",
        )
        .bind(filter.resolved)
        .bind(filter.severity)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    pub async fn resolve(&mut self, id: ErrorReportId) -> Result<Option<ErrorReportDBResponse>> {
        let report = sqlx::query_as::<_, ErrorReportDBResponse>(&format!(
            "UPDATE error_reports
             SET resolved = TRUE, resolved_at = NOW()
             WHERE id = $1
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(report)
    }
}
