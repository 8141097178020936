use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use crate::{
    auth::CurrentUser,
    error::AppError,
    extract::ApiQuery,
    listing::SearchQuery,
    models::store::StoreWithRating,
    ratings::{with_average, with_averages},
    AppState,
};

pub async fn list_stores(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let stores = state.repo.list_stores().await?;
    let stores: Vec<StoreWithRating> = with_averages(state.repo.as_ref(), stores)
        .await?
        .into_iter()
        .filter(|s| query.matches(s))
        .collect();

    Ok(Json(json!({ "stores": stores })))
}

pub async fn get_store(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(store_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = state
        .repo
        .find_store(&store_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;
    let store = with_average(state.repo.as_ref(), store).await?;

    Ok(Json(json!({ "store": store })))
}
