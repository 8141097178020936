use axum::{extract::State, Json};
use serde_json::json;

use super::require_fields;
use crate::{
    auth::{hash_password, verify_password, CurrentUser},
    error::AppError,
    extract::ApiJson,
    models::user::{Role, UpdatePasswordPayload, UserChanges},
    AppState,
};

/// `POST /api/store/update-password`, store owners only.
pub async fn update_store_owner_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<UpdatePasswordPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    current.require(Role::StoreOwner)?;
    change_password(&state, &current, payload).await
}

/// `POST /api/user/update-password`, any signed-in user.
pub async fn update_user_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<UpdatePasswordPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    change_password(&state, &current, payload).await
}

/// Re-checks the current password against the stored hash before replacing it.
async fn change_password(
    state: &AppState,
    current: &CurrentUser,
    payload: UpdatePasswordPayload,
) -> Result<Json<serde_json::Value>, AppError> {
    require_fields(
        &[
            payload.current_password.as_str(),
            payload.new_password.as_str(),
        ],
        "Current password and new password are required",
    )?;

    let stored = state
        .repo
        .find_user(&current.0.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &stored.password_hash)? {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    let changes = UserChanges {
        password_hash: Some(hash_password(&payload.new_password)?),
        ..Default::default()
    };
    state
        .repo
        .update_user(&stored.user.id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    tracing::info!(user_id = %stored.user.id, "password updated");

    Ok(Json(json!({ "message": "Password updated successfully" })))
}
