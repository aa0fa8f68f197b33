use crate::models::Role;
use crate::policy::Principal;
use crate::services::session::SessionClaims;
use crate::startup::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

const LOGIN_PAGE: &str = "/login";

/// Browser navigations get redirected; API clients get JSON.
fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn reject(state: &AppState, jar: CookieJar, headers: &HeaderMap, reason: &str) -> Response {
    tracing::debug!(reason = %reason, "Rejected session");
    let jar = jar.add(state.sessions.removal_cookie());
    if wants_html(headers) {
        (jar, Redirect::to(LOGIN_PAGE)).into_response()
    } else {
        (
            jar,
            AppError::Unauthorized(anyhow::anyhow!("Authentication required")),
        )
            .into_response()
    }
}

async fn resolve_principal(
    state: &AppState,
    claims: &SessionClaims,
) -> Result<Option<Principal>, AppError> {
    let role = claims.role.filter(|role| match role {
        Role::Seller => claims.seller_id.is_some(),
        Role::Customer => claims.customer_id.is_some(),
        Role::Admin => true,
    });
    if let Some(role) = role {
        return Ok(Some(Principal {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            role,
            seller_id: claims.seller_id.clone(),
            customer_id: claims.customer_id.clone(),
        }));
    }

    // Older sessions lack the role or the tenant ids it needs.
    let Some(user) = state.store.get_user(&claims.sub).await? else {
        return Ok(None);
    };
    Ok(Some(Principal::from(&user)))
}

/// Verify the session cookie and attach the caller to the request.
///
/// Invalid, expired and revoked sessions clear the cookie.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = jar.get(state.sessions.cookie_name()).map(|c| c.value().to_string()) else {
        return reject(&state, jar, request.headers(), "missing cookie");
    };

    let claims = match state.sessions.verify(&token) {
        Ok(claims) => claims,
        Err(_) => return reject(&state, jar, request.headers(), "invalid token"),
    };

    match state.revocations.is_revoked(&claims.jti).await {
        Ok(false) => {}
        Ok(true) => return reject(&state, jar, request.headers(), "revoked"),
        Err(e) => return e.into_response(),
    }

    let principal = match resolve_principal(&state, &claims).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return reject(&state, jar, request.headers(), "unknown user"),
        Err(e) => return e.into_response(),
    };

    let span = tracing::Span::current();
    span.record("user_id", principal.user_id.as_str());
    span.record("role", principal.role.as_str());

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(principal);
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))
    }
}
