use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::require_fields;
use crate::{
    auth::{
        cleared_cookie, hash_password, is_legacy_hash, issue_token, session_cookie,
        verify_password, CurrentUser,
    },
    error::AppError,
    extract::ApiJson,
    models::user::{AuthResponse, LoginPayload, RegisterPayload, Role, StoredUser, User, UserChanges},
    AppState,
};

fn signed_in(
    state: &AppState,
    status: StatusCode,
    user: User,
    message: &str,
) -> Result<Response, AppError> {
    let token = issue_token(&state.encoding_key, &user)?;
    let cookie = session_cookie(token, state.cookie_secure);
    Ok((
        status,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(AuthResponse {
            message: message.to_string(),
            user,
        }),
    )
        .into_response())
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterPayload>,
) -> Result<Response, AppError> {
    require_fields(
        &[
            payload.name.as_str(),
            payload.email.as_str(),
            payload.address.as_str(),
            payload.password.as_str(),
        ],
        "All fields are required",
    )?;
    let email = payload.email.trim();

    if state.repo.find_user_by_email(email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = StoredUser {
        user: User {
            id: Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            email: email.to_string(),
            address: payload.address.trim().to_string(),
            role: Role::User,
            store_id: None,
        },
        password_hash,
    };
    let created = state.repo.insert_user(&user).await?;
    tracing::info!(user_id = %created.user.id, "registered user");

    signed_in(&state, StatusCode::CREATED, created.user, "Registration successful")
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> Result<Response, AppError> {
    require_fields(
        &[payload.email.as_str(), payload.password.as_str()],
        "Email and password are required",
    )?;

    let user = state
        .repo
        .find_user_by_email(payload.email.trim())
        .await?
        .ok_or(AppError::LoginFail)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.user.id, "failed login");
        return Err(AppError::LoginFail);
    }
    if is_legacy_hash(&user.password_hash) {
        upgrade_legacy_hash(&state, &user.user.id, &payload.password).await;
    }

    signed_in(&state, StatusCode::OK, user.user, "Login successful")
}

/// Swaps a verified bcrypt hash for an argon2 one. Failures only cost the
/// upgrade, never the login.
async fn upgrade_legacy_hash(state: &AppState, user_id: &str, password: &str) {
    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "could not rehash legacy password");
            return;
        }
    };
    let changes = UserChanges {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    match state.repo.update_user(user_id, &changes).await {
        Ok(_) => tracing::info!(user_id, "upgraded legacy password hash"),
        Err(e) => tracing::warn!(user_id, error = %e, "could not store upgraded password hash"),
    }
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            cleared_cookie(state.cookie_secure).to_string(),
        )],
        Json(json!({ "message": "Logged out" })),
    )
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "user": user }))
}
