use crate::models::{Role, User};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

/// Claims carried in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Missing on sessions issued before roles were embedded; the session
    /// layer falls back to the user record.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
    /// Session id, used for revocation on logout
    pub jti: String,
}

impl SessionClaims {
    /// Seconds until the token expires, floored at zero.
    pub fn remaining_ttl(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

/// Issues and verifies HS256 session tokens and builds their cookies.
#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    cookie_name: String,
    secure_cookie: bool,
}

impl SessionService {
    pub fn new(
        secret: &Secret<String>,
        ttl_hours: i64,
        cookie_name: impl Into<String>,
        secure_cookie: bool,
    ) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            ttl: Duration::hours(ttl_hours),
            cookie_name: cookie_name.into(),
            secure_cookie,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue(&self, user: &User) -> Result<(String, SessionClaims), AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: Some(user.role),
            seller_id: user.seller_id.clone(),
            customer_id: user.customer_id.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String, AppError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<SessionClaims>(token, &self.decoding_key, &validation)?.claims)
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }

    /// Cookie that makes the browser drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(ttl_hours: i64) -> SessionService {
        SessionService::new(&Secret::new("test-secret-test-secret".into()), ttl_hours, "session", false)
    }

    fn seller() -> User {
        User::new_seller("Owner@Example.com".into(), None, "hash".into())
    }

    #[test]
    fn issued_token_verifies() {
        let sessions = service(12);
        let user = seller();
        let (token, claims) = sessions.issue(&user).unwrap();

        let verified = sessions.verify(&token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.role, Some(Role::Seller));
        assert_eq!(verified.seller_id.as_deref(), Some(user.id.as_str()));
        assert_eq!(verified.email, "owner@example.com");
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let (token, _) = service(12).issue(&seller()).unwrap();
        let other = SessionService::new(&Secret::new("another-secret-entirely".into()), 12, "session", false);
        assert!(matches!(other.verify(&token), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let sessions = service(-1);
        let (token, claims) = sessions.issue(&seller()).unwrap();
        assert_eq!(claims.remaining_ttl(), 0);
        assert!(sessions.verify(&token).is_err());
    }

    #[test]
    fn claims_without_role_still_decode() {
        let sessions = service(1);
        let now = Utc::now().timestamp();
        let legacy = serde_json::json!({
            "sub": "u-1",
            "email": "old@example.com",
            "iat": now,
            "exp": now + 600,
            "jti": "j-1",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &legacy,
            &EncodingKey::from_secret(b"test-secret-test-secret"),
        )
        .unwrap();
        let claims = sessions.verify(&token).unwrap();
        assert_eq!(claims.role, None);
    }

    #[test]
    fn cookies_are_http_only() {
        let sessions = service(2);
        let cookie = sessions.session_cookie("abc".into());
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(2)));
        assert_eq!(sessions.removal_cookie().max_age(), Some(time::Duration::ZERO));
    }
}
