use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    aggregate::RatingStats,
    auth::CurrentUser,
    error::AppError,
    models::{
        rating::{RatingFilter, RatingWithUser},
        store::StoreWithRating,
        user::{Role, User},
    },
    AppState,
};

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub store: StoreWithRating,
    pub stats: RatingStats,
    /// Newest first.
    pub ratings: Vec<RatingWithUser>,
}

/// The owner's store with its ratings and who submitted them.
pub async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Dashboard>, AppError> {
    current.require(Role::StoreOwner)?;

    // the token may predate the store assignment, so read the live record
    let owner = state
        .repo
        .find_user(&current.0.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let store_id = owner
        .user
        .store_id
        .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;
    let store = state
        .repo
        .find_store(&store_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;

    let ratings = state
        .repo
        .list_ratings(&RatingFilter::by_store(&store_id))
        .await?;
    let users: HashMap<String, User> = state
        .repo
        .list_users()
        .await?
        .into_iter()
        .map(|stored| (stored.user.id.clone(), stored.user))
        .collect();

    let stats = RatingStats::from_ratings(&ratings);
    let mut ratings: Vec<RatingWithUser> = ratings
        .into_iter()
        .map(|rating| RatingWithUser {
            user: users.get(&rating.user_id).cloned(),
            rating,
        })
        .collect();
    ratings.sort_by(|a, b| b.rating.created_at.cmp(&a.rating.created_at));

    Ok(Json(Dashboard {
        store: StoreWithRating {
            store,
            average_rating: stats.average_rating,
        },
        stats,
        ratings,
    }))
}
