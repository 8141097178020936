use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    auth::CurrentUser,
    error::AppError,
    extract::ApiJson,
    models::{
        rating::{Rating, RatingFilter, SubmitRatingPayload, UpdateRatingPayload},
        user::Role,
    },
    ratings::{submit_rating, validate_rating, Submission},
    AppState,
};

/// Creates or replaces the caller's rating for a store. Only `user` accounts
/// may rate.
pub async fn submit(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<SubmitRatingPayload>,
) -> Result<impl IntoResponse, AppError> {
    if current.0.role != Role::User {
        return Err(AppError::Forbidden(
            "Only users can submit ratings".to_string(),
        ));
    }
    let store_id = payload.store_id.trim();
    if store_id.is_empty() {
        return Err(AppError::Validation(
            "Store ID and rating are required".to_string(),
        ));
    }
    let value = validate_rating(payload.rating)?;

    let submission = submit_rating(state.repo.as_ref(), &current.0.id, store_id, value).await?;
    let (status, message) = match &submission {
        Submission::Created(_) => (StatusCode::CREATED, "Rating submitted successfully"),
        Submission::Updated(_) => (StatusCode::OK, "Rating updated successfully"),
    };
    tracing::info!(
        user_id = %current.0.id,
        store_id,
        rating = value.get(),
        created = matches!(submission, Submission::Created(_)),
        "rating submitted"
    );

    Ok((
        status,
        Json(json!({
            "message": message,
            "rating": submission.rating(),
        })),
    ))
}

/// Loads a rating and checks that the caller created it or is an admin.
async fn owned_rating(
    state: &AppState,
    current: &CurrentUser,
    rating_id: &str,
) -> Result<Rating, AppError> {
    let rating = state
        .repo
        .find_rating(rating_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_string()))?;
    if !current.can_act_for(&rating.user_id) {
        tracing::warn!(user_id = %current.0.id, rating_id, "rating access denied");
        return Err(AppError::forbidden());
    }
    Ok(rating)
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(rating_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateRatingPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let value = validate_rating(payload.rating)?;
    owned_rating(&state, &current, &rating_id).await?;

    let updated = state
        .repo
        .update_rating(&rating_id, value)
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_string()))?;

    Ok(Json(json!({
        "message": "Rating updated successfully",
        "rating": updated,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(rating_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    owned_rating(&state, &current, &rating_id).await?;

    if !state.repo.delete_rating(&rating_id).await? {
        return Err(AppError::NotFound("Rating not found".to_string()));
    }
    tracing::info!(user_id = %current.0.id, %rating_id, "rating deleted");

    Ok(Json(json!({ "message": "Rating deleted successfully" })))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !current.can_act_for(&user_id) {
        return Err(AppError::forbidden());
    }
    let ratings = state
        .repo
        .list_ratings(&RatingFilter::by_user(user_id))
        .await?;

    Ok(Json(json!({ "ratings": ratings })))
}

pub async fn get_for_user_and_store(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((user_id, store_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !current.can_act_for(&user_id) {
        return Err(AppError::forbidden());
    }
    let rating = state
        .repo
        .list_ratings(&RatingFilter::by_user_and_store(user_id, store_id))
        .await?
        .into_iter()
        .next();

    Ok(Json(json!({ "rating": rating })))
}
