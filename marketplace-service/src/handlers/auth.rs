use crate::dtos::auth::{LoginRequest, RegisterRequest, SessionResponse};
use crate::models::User;
use crate::policy::Principal;
use crate::services::password::{hash_password, verify_password};
use crate::services::session::SessionClaims;
use crate::startup::AppState;
use crate::utils::validation::ValidatedJson;
use axum::{extract::State, Extension};
use axum_extra::extract::cookie::CookieJar;
use secrecy::Secret;
use service_core::error::AppError;
use service_core::response::ApiResponse;

/// Seller self-signup. Starts a session straight away.
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(CookieJar, ApiResponse<SessionResponse>), AppError> {
    let password = Secret::new(req.password);
    let password_hash = hash_password(&password)?;
    let user = User::new_seller(req.email, req.name, password_hash);

    state.store.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, "Seller registered");

    let (token, _) = state.sessions.issue(&user)?;
    let jar = jar.add(state.sessions.session_cookie(token));
    Ok((jar, ApiResponse::created(Principal::from(&user).into())))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<SessionResponse>), AppError> {
    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"));

    let user = state
        .store
        .find_user_by_email(&req.email.to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&Secret::new(req.password), &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login failed");
        return Err(invalid());
    }

    let (token, claims) = state.sessions.issue(&user)?;
    tracing::info!(user_id = %user.id, jti = %claims.jti, role = %user.role, "Login succeeded");

    let jar = jar.add(state.sessions.session_cookie(token));
    Ok((jar, ApiResponse::ok(Principal::from(&user).into())))
}

/// Revoke the session id until the token would have expired anyway.
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>), AppError> {
    state
        .revocations
        .revoke(&claims.jti, claims.remaining_ttl())
        .await?;
    tracing::info!(user_id = %claims.sub, jti = %claims.jti, "Logged out");

    let jar = jar.add(state.sessions.removal_cookie());
    Ok((jar, ApiResponse::ok(serde_json::json!({ "loggedOut": true }))))
}

/// GET /api/auth/session
pub async fn session(principal: Principal) -> ApiResponse<SessionResponse> {
    ApiResponse::ok(principal.into())
}
