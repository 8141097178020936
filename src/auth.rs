//! Sessions and passwords.
//!
//! A session is an HS256 JWT carrying the public [`User`] record. It lives in
//! the `auth-token` cookie for 24 hours and is never refreshed; once it
//! expires the client has to log in again.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};
use cookie::{time::Duration, Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::AppError,
    models::user::{Role, User},
    AppState,
};

pub const AUTH_COOKIE: &str = "auth-token";
pub const SESSION_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub user: User,
    pub iat: usize,
    pub exp: usize,
}

/// Prefixes of the bcrypt hashes written by the previous generation of the
/// service. They still verify; new hashes are always argon2.
const LEGACY_HASH_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2: {0}")]
    Argon2(#[from] argon2::password_hash::Error),
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// True for bcrypt hashes, which should be replaced after the next
/// successful login.
pub fn is_legacy_hash(hash: &str) -> bool {
    LEGACY_HASH_PREFIXES
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// `Ok(false)` on mismatch. Errors only when the stored hash can't be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if is_legacy_hash(hash) {
        return Ok(bcrypt::verify(password, hash)?);
    }
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(key: &EncodingKey, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token_at(key, user, Utc::now())
}

pub(crate) fn issue_token_at(
    key: &EncodingKey,
    user: &User,
    issued_at: DateTime<Utc>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = issued_at + chrono::Duration::hours(SESSION_HOURS);
    let claims = Claims {
        user: user.clone(),
        iat: issued_at.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, key)
}

/// Checks signature and expiry with no leeway.
pub fn verify_token(key: &DecodingKey, token: &str) -> Result<User, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(token, key, &validation)?;
    Ok(data.claims.user)
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(Duration::hours(SESSION_HOURS))
        .build()
}

pub fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// The verified session user. Rejects with 401 when the cookie is missing or
/// the token does not verify.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// 403 unless the session has exactly this role.
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }

    /// The user themselves, or any admin.
    pub fn can_act_for(&self, user_id: &str) -> bool {
        self.0.id == user_id || self.0.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = session_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let user = verify_token(&state.decoding_key, &token).map_err(|e| {
            tracing::warn!(error = %e, path = %parts.uri.path(), "rejected session token");
            AppError::Unauthenticated
        })?;
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"q8Zr2-test-signing-secret-0f9Xw7LmP4";

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            address: "1 Loop Rd".into(),
            role: Role::User,
            store_id: None,
        }
    }

    #[test]
    fn password_hash_verifies_only_the_hashed_password() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
        assert!(verify_password("hunter22", "not-a-phc-string").is_err());
    }

    #[test]
    fn bcrypt_hashes_still_verify() {
        let legacy = bcrypt::hash("hunter22", 4).unwrap();
        assert!(is_legacy_hash(&legacy));
        assert!(verify_password("hunter22", &legacy).unwrap());
        assert!(!verify_password("hunter23", &legacy).unwrap());

        assert!(is_legacy_hash("$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy"));
        assert!(!is_legacy_hash(&hash_password("hunter22").unwrap()));
    }

    #[test]
    fn token_round_trips_the_public_user() {
        let token = issue_token(&EncodingKey::from_secret(SECRET), &user()).unwrap();
        let decoded = verify_token(&DecodingKey::from_secret(SECRET), &token).unwrap();
        assert_eq!(decoded, user());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued_at = Utc::now() - chrono::Duration::hours(SESSION_HOURS + 1);
        let token = issue_token_at(&EncodingKey::from_secret(SECRET), &user(), issued_at).unwrap();
        assert!(verify_token(&DecodingKey::from_secret(SECRET), &token).is_err());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = issue_token(&EncodingKey::from_secret(b"some-other-secret"), &user()).unwrap();
        assert!(verify_token(&DecodingKey::from_secret(SECRET), &token).is_err());
        assert!(verify_token(&DecodingKey::from_secret(SECRET), "garbage").is_err());
    }

    #[test]
    fn session_cookie_attributes() {
        let rendered = session_cookie("abc".into(), false).to_string();
        assert!(rendered.starts_with("auth-token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=86400"));
        assert!(!rendered.contains("Secure"));

        assert!(session_cookie("abc".into(), true).to_string().contains("Secure"));
        assert!(cleared_cookie(false).to_string().contains("Max-Age=0"));
    }

    #[test]
    fn session_token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; auth-token=tok123"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok123"));

        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("auth-token=second"));
        assert_eq!(session_token(&headers).as_deref(), Some("second"));

        assert!(session_token(&HeaderMap::new()).is_none());
    }
}
