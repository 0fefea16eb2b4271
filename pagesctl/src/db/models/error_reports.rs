//! Database models for client error reports.

use crate::types::{ErrorReportId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Database request for filing an error report
#[derive(Debug, Clone)]
pub struct ErrorReportCreateDBRequest {
    pub reporter: Option<UserId>,
    pub severity: ReportSeverity,
    pub message: String,
    pub context: Option<String>,
}

/// Database response for an error report
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ErrorReportDBResponse {
    pub id: ErrorReportId,
    pub reporter: Option<UserId>,
    pub severity: ReportSeverity,
    pub message: String,
    pub context: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
