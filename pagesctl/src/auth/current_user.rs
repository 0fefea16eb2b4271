use crate::db::errors::DbError;
use crate::{
    AppState,
    api::models::users::{CurrentUser, SubscriptionTier},
    auth::session,
    db::{
        handlers::{ApiKeys, Profiles, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::{debug, instrument, trace};

/// Extract user from an API key in the Authorization header if present.
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid API key found and user authenticated
/// - Some(Err(error)): Bearer token present but invalid
#[instrument(skip(parts, db))]
async fn try_api_key_auth(parts: &Parts, db: &PgPool) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    // Not a Bearer token: let other auth methods have a go
    let api_key = auth_str.strip_prefix("Bearer ")?;

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    let mut keys_repo = ApiKeys::new(&mut conn);
    match keys_repo.authenticate(api_key).await {
        Ok(Some(user)) => Some(Ok(CurrentUser::from(user))),
        Ok(None) => Some(Err(Error::Unauthenticated {
            message: Some("Invalid API key".to_string()),
        })),
        Err(e) => Some(Err(Error::Database(e))),
    }
}

/// Extract user from the JWT session cookie if present and valid.
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header present but malformed
#[instrument(skip(parts, config))]
fn try_jwt_session_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name == cookie_name
        {
            // Expired/invalid tokens are expected; keep scanning rather than
            // propagate them as errors.
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                Err(_) => continue,
            }
        }
    }
    None
}

/// Extract user from the trusted proxy header if present and valid.
/// Returns:
/// - None: No proxy header present
/// - Some(Ok(user)): Valid proxy header found and user authenticated
/// - Some(Err(error)): Proxy header present but user lookup/creation failed
#[instrument(skip(parts, state))]
async fn try_proxy_header_auth(parts: &Parts, state: &AppState) -> Option<Result<CurrentUser>> {
    let config = &state.config;
    let user_email = parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())?;

    let mut tx = match state.db.begin().await {
        Ok(tx) => tx,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    let mut user_repo = Users::new(&mut tx);
    let user_result = match user_repo.get_with_profile_by_email(user_email).await {
        Ok(Some(user)) => Some(CurrentUser::from(user)),
        Ok(None) => {
            if config.auth.proxy_header.auto_create_users {
                let create_request = UserCreateDBRequest {
                    email: user_email.to_string(),
                    display_name: None,
                    is_admin: false,
                    auth_source: "proxy-header".to_string(),
                    password_hash: None,
                };

                let new_user = match user_repo.create(&create_request).await {
                    Ok(user) => user,
                    Err(e) => return Some(Err(Error::Database(e))),
                };

                let mut profiles_repo = Profiles::new(&mut tx);
                let profile = match profiles_repo
                    .create_default(new_user.id, SubscriptionTier::Free, config.credits.initial_balance)
                    .await
                {
                    Ok(profile) => profile,
                    Err(e) => return Some(Err(Error::Database(e))),
                };

                Some(CurrentUser {
                    id: new_user.id,
                    email: new_user.email,
                    display_name: new_user.display_name,
                    is_admin: new_user.is_admin,
                    subscription_tier: profile.subscription_tier,
                    is_creator: profile.is_creator,
                })
            } else {
                None
            }
        }
        Err(e) => return Some(Err(Error::Database(e))),
    };

    match tx.commit().await {
        Ok(_) => {}
        Err(e) => return Some(Err(DbError::from(e).into())),
    }
    user_result.map(Ok)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the auth method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means credentials were present but invalid
        //
        // Try all methods and return the first success; fail only when every
        // method was absent or failed.

        match try_api_key_auth(parts, &state.db).await {
            Some(Ok(user)) => {
                debug!("Found API key authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("API key authentication failed: {:?}", e);
            }
            None => {
                trace!("No API key authentication attempted");
            }
        }

        if state.config.auth.native.enabled {
            match try_jwt_session_auth(parts, &state.config) {
                Some(Ok(user)) => {
                    debug!("Found JWT session authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("JWT session authentication failed: {:?}", e);
                }
                None => {
                    trace!("No JWT session authentication attempted");
                }
            }
        }

        if state.config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, state).await {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("Proxy header authentication failed: {:?}", e);
                }
                None => {
                    trace!("No proxy header authentication attempted");
                }
            }
        }

        Err(Error::Unauthenticated { message: None })
    }
}
