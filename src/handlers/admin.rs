//! Admin-only routes. Every handler checks for the `admin` role first.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::require_fields;
use crate::{
    aggregate::RatingStats,
    auth::{hash_password, CurrentUser},
    error::AppError,
    extract::{ApiJson, ApiQuery},
    listing::{StoreQuery, UserQuery},
    models::{
        rating::{Rating, RatingFilter},
        store::{CreateStorePayload, Store, StoreWithRating},
        user::{CreateUserPayload, Role, StoredUser, User, UserChanges},
    },
    ratings::{with_average, with_averages},
    AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    /// Everyone except admins.
    pub total_users: usize,
    pub total_stores: usize,
    pub total_ratings: usize,
    pub rating_stats: RatingStats,
}

pub async fn stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<PlatformStats>, AppError> {
    current.require(Role::Admin)?;

    let everything = RatingFilter::default();
    let (users, stores, ratings) = tokio::try_join!(
        state.repo.list_users(),
        state.repo.list_stores(),
        state.repo.list_ratings(&everything),
    )?;

    Ok(Json(PlatformStats {
        total_users: users.iter().filter(|u| u.user.role != Role::Admin).count(),
        total_stores: stores.len(),
        total_ratings: ratings.len(),
        rating_stats: RatingStats::from_ratings(&ratings),
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    current.require(Role::Admin)?;

    let users: Vec<User> = state
        .repo
        .list_users()
        .await?
        .into_iter()
        .map(|stored| stored.user)
        .collect();
    let users = query.apply(users);

    Ok(Json(json!({ "total": users.len(), "users": users })))
}

pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    current.require(Role::Admin)?;
    require_fields(
        &[
            payload.name.as_str(),
            payload.email.as_str(),
            payload.address.as_str(),
            payload.password.as_str(),
            payload.role.as_str(),
        ],
        "All fields are required",
    )?;
    let role: Role = payload
        .role
        .trim()
        .parse()
        .map_err(|e| AppError::Validation(format!("{e}")))?;
    let email = payload.email.trim();

    if state.repo.find_user_by_email(email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let created = state
        .repo
        .insert_user(&StoredUser {
            user: User {
                id: Uuid::new_v4().to_string(),
                name: payload.name.trim().to_string(),
                email: email.to_string(),
                address: payload.address.trim().to_string(),
                role,
                store_id: None,
            },
            password_hash,
        })
        .await?;
    tracing::info!(admin_id = %current.0.id, user_id = %created.user.id, %role, "admin created user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": created.user,
        })),
    ))
}

#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub user: User,
    /// Present for store owners with a linked store.
    pub store: Option<StoreWithRating>,
    pub ratings: Vec<Rating>,
}

pub async fn user_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserDetail>, AppError> {
    current.require(Role::Admin)?;

    let user = state
        .repo
        .find_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
        .user;

    let store = match (&user.role, &user.store_id) {
        (Role::StoreOwner, Some(store_id)) => match state.repo.find_store(store_id).await? {
            Some(store) => Some(with_average(state.repo.as_ref(), store).await?),
            None => None,
        },
        _ => None,
    };
    let ratings = state
        .repo
        .list_ratings(&RatingFilter::by_user(&user.id))
        .await?;

    Ok(Json(UserDetail {
        user,
        store,
        ratings,
    }))
}

pub async fn list_stores(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<StoreQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    current.require(Role::Admin)?;

    let stores = state.repo.list_stores().await?;
    let stores = query.apply(with_averages(state.repo.as_ref(), stores).await?);

    Ok(Json(json!({ "total": stores.len(), "stores": stores })))
}

/// Creates a store and promotes its owner to `store_owner`.
///
/// The two writes are separate calls; if the owner update fails the store
/// still exists.
pub async fn create_store(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<CreateStorePayload>,
) -> Result<impl IntoResponse, AppError> {
    current.require(Role::Admin)?;
    require_fields(
        &[
            payload.name.as_str(),
            payload.email.as_str(),
            payload.address.as_str(),
            payload.owner_id.as_str(),
        ],
        "All fields are required",
    )?;

    let owner = state
        .repo
        .find_user(payload.owner_id.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Owner not found".to_string()))?
        .user;

    let store = state
        .repo
        .insert_store(&Store {
            id: Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            address: payload.address.trim().to_string(),
            owner_id: owner.id.clone(),
        })
        .await?;

    let promoted = state
        .repo
        .update_user(
            &owner.id,
            &UserChanges {
                role: Some(Role::StoreOwner),
                store_id: Some(store.id.clone()),
                ..Default::default()
            },
        )
        .await?;
    if promoted.is_none() {
        tracing::warn!(owner_id = %owner.id, store_id = %store.id, "store owner vanished before promotion");
    }
    tracing::info!(admin_id = %current.0.id, store_id = %store.id, owner_id = %owner.id, "admin created store");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Store created successfully",
            "store": StoreWithRating {
                store,
                average_rating: 0.0,
            },
        })),
    ))
}
