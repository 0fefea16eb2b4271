//! HTTP handlers for usage analytics.

use crate::{
    AppState,
    api::models::{
        analytics::{UsageQuery, UsageResponse},
        users::CurrentUser,
    },
    auth::permissions,
    db::handlers::GenerationLogs,
    errors::{Error, Result},
    types::{Operation, Resource},
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Duration, Utc};

/// Usage aggregates from the generation log
#[utoipa::path(
    get,
    path = "/analytics/usage",
    tag = "analytics",
    summary = "Usage analytics",
    description = "Totals, per-operation, and per-day aggregates from the generation log. Admins may pass user_id to inspect another user.",
    params(UsageQuery),
    responses(
        (status = 200, description = "Usage aggregates", body = UsageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - user_id filter requires admin"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
    current_user: CurrentUser,
) -> Result<Json<UsageResponse>> {
    let user_id = match query.user_id {
        Some(requested) if requested != current_user.id => {
            permissions::require(&current_user, Resource::Analytics, Operation::ReadAll)?;
            requested
        }
        _ => current_user.id,
    };

    let since = query.days.map(|days| Utc::now() - Duration::days(days.max(0)));

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = GenerationLogs::new(&mut conn);

    let totals = repo.totals_for_user(user_id, since).await?;
    let by_operation = repo.aggregate_by_operation(user_id, since).await?;
    let by_day = repo.aggregate_by_day(user_id, since).await?;

    Ok(Json(UsageResponse {
        user_id,
        totals: totals.into(),
        by_operation: by_operation.into_iter().map(Into::into).collect(),
        by_day: by_day.into_iter().map(Into::into).collect(),
    }))
}
