//! HTTP handlers for the credit system.

use crate::{
    AppState,
    api::models::{
        credits::{BalanceResponse, CreditGrantRequest, CreditGrantResponse},
        users::CurrentUser,
    },
    auth::permissions,
    db::handlers::Profiles,
    errors::{Error, Result},
    types::{Operation, Resource},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;

/// Current balance and usage counters
#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credits",
    summary = "Get the current balance",
    responses(
        (status = 200, description = "Balance and cumulative usage", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_balance(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<BalanceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);

    let profile = repo.get(current_user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "Profile".to_string(),
        id: current_user.id.to_string(),
    })?;

    Ok(Json(BalanceResponse::from(profile)))
}

/// Grant credits to a user (admin only)
#[utoipa::path(
    post,
    path = "/credits/grants",
    tag = "credits",
    summary = "Grant credits",
    description = "Add credits to a user's balance (admin only)",
    request_body = CreditGrantRequest,
    responses(
        (status = 201, description = "Credits granted", body = CreditGrantResponse),
        (status = 400, description = "Bad request - amount must be positive"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin required"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn grant_credits(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CreditGrantRequest>,
) -> Result<(StatusCode, Json<CreditGrantResponse>)> {
    permissions::require(&current_user, Resource::Credits, Operation::CreateAll)?;

    if request.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Amount must be greater than zero".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);

    if repo.get(request.user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: request.user_id.to_string(),
        });
    }

    let new_balance = repo.credit(request.user_id, request.amount).await?;

    tracing::info!(
        user = %crate::types::abbrev_uuid(&request.user_id),
        amount = %request.amount,
        description = request.description.as_deref().unwrap_or(""),
        "credits granted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreditGrantResponse {
            user_id: request.user_id,
            amount: request.amount,
            new_balance,
        }),
    ))
}
