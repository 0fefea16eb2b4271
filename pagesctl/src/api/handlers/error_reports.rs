//! HTTP handlers for error monitoring: client intake plus the admin panel.

use crate::{
    AppState,
    api::models::{
        error_reports::{ErrorReportCreate, ErrorReportResponse, ListErrorReportsQuery},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::permissions,
    db::{
        handlers::{ErrorReports, error_reports::ErrorReportFilter},
        models::error_reports::ErrorReportCreateDBRequest,
    },
    errors::{Error, Result},
    types::ErrorReportId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

/// File a client error report
#[utoipa::path(
    post,
    path = "/errors",
    tag = "errors",
    summary = "Report a client error",
    request_body = ErrorReportCreate,
    responses(
        (status = 201, description = "Report filed", body = ErrorReportResponse),
        (status = 400, description = "Bad request - empty message"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn report_error(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ErrorReportCreate>,
) -> Result<(StatusCode, Json<ErrorReportResponse>)> {
    if request.message.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "message must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ErrorReports::new(&mut conn);

    let report = repo
        .create(&ErrorReportCreateDBRequest {
            reporter: Some(current_user.id),
            severity: request.severity,
            message: request.message,
            context: request.context,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ErrorReportResponse::from(report))))
}

/// List error reports (admin only)
#[utoipa::path(
    get,
    path = "/admin/errors",
    tag = "errors",
    summary = "List error reports",
    params(ListErrorReportsQuery),
    responses(
        (status = 200, description = "Paginated error reports", body = PaginatedResponse<ErrorReportResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin required"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_error_reports(
    State(state): State<AppState>,
    Query(query): Query<ListErrorReportsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<ErrorReportResponse>>> {
    permissions::require_admin(&current_user)?;

    let skip = query.pagination.skip();
    let limit = query.pagination.limit();
    let filter = ErrorReportFilter {
        resolved: query.resolved,
        severity: query.severity,
        skip,
        limit,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ErrorReports::new(&mut conn);

    let reports = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        reports.into_iter().map(ErrorReportResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Resolve an error report (admin only)
#[utoipa::path(
    patch,
    path = "/admin/errors/{id}",
    tag = "errors",
    summary = "Resolve an error report",
    params(("id" = String, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report resolved", body = ErrorReportResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin required"),
        (status = 404, description = "Report not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn resolve_error_report(
    State(state): State<AppState>,
    Path(id): Path<ErrorReportId>,
    current_user: CurrentUser,
) -> Result<Json<ErrorReportResponse>> {
    permissions::require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ErrorReports::new(&mut conn);

    let report = repo.resolve(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Error report".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(ErrorReportResponse::from(report)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::SubscriptionTier;
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    // Test: any authenticated user can file a report; only admins can list
    #[sqlx::test]
    #[test_log::test]
    async fn test_report_and_admin_list(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;
        let admin = create_test_user(&pool, SubscriptionTier::Admin, false, true).await;

        let response = app
            .post("/api/errors")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&json!({"severity": "error", "message": "dashboard crashed", "context": "stack trace here"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        app.get("/api/admin/errors")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .assert_status_forbidden();

        let body: serde_json::Value = app
            .get("/api/admin/errors")
            .add_header(PROXY_AUTH_HEADER, &admin.email)
            .await
            .json();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["data"][0]["message"], "dashboard crashed");
        assert_eq!(body["data"][0]["resolved"], false);
    }

    // Test: resolving marks the report and filters respect it
    #[sqlx::test]
    #[test_log::test]
    async fn test_resolve_flow(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;
        let admin = create_test_user(&pool, SubscriptionTier::Admin, false, true).await;

        let created: serde_json::Value = app
            .post("/api/errors")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&json!({"severity": "critical", "message": "generation hangs"}))
            .await
            .json();
        let id = created["id"].as_str().unwrap();

        let resolved: serde_json::Value = app
            .patch(&format!("/api/admin/errors/{id}"))
            .add_header(PROXY_AUTH_HEADER, &admin.email)
            .await
            .json();
        assert_eq!(resolved["resolved"], true);
        assert!(resolved["resolved_at"].is_string());

        let unresolved: serde_json::Value = app
            .get("/api/admin/errors?resolved=false")
            .add_header(PROXY_AUTH_HEADER, &admin.email)
            .await
            .json();
        assert_eq!(unresolved["total_count"], 0);
    }

    // Test: empty messages are rejected
    #[sqlx::test]
    #[test_log::test]
    async fn test_empty_message_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;

        app.post("/api/errors")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&json!({"severity": "info", "message": "   "}))
            .await
            .assert_status_bad_request();
    }
}
