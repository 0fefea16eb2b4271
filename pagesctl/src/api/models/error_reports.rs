//! API request/response models for error monitoring.

use crate::api::models::pagination::Pagination;
use crate::db::models::error_reports::{ErrorReportDBResponse, ReportSeverity};
use crate::types::{ErrorReportId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request body for `POST /api/errors`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ErrorReportCreate {
    pub severity: ReportSeverity,
    pub message: String,
    /// Free-form context (page, stack trace, request id)
    pub context: Option<String>,
}

/// Query parameters for `GET /api/admin/errors`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListErrorReportsQuery {
    pub resolved: Option<bool>,
    pub severity: Option<ReportSeverity>,
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorReportResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ErrorReportId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub reporter: Option<UserId>,
    pub severity: ReportSeverity,
    pub message: String,
    pub context: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<ErrorReportDBResponse> for ErrorReportResponse {
    fn from(db: ErrorReportDBResponse) -> Self {
        Self {
            id: db.id,
            reporter: db.reporter,
            severity: db.severity,
            message: db.message,
            context: db.context,
            resolved: db.resolved,
            created_at: db.created_at,
            resolved_at: db.resolved_at,
        }
    }
}
