use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{admin, auth, owner, password, ratings, stores},
    AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/admin/stats", get(admin::stats))
        .route(
            "/api/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/api/admin/users/:user_id", get(admin::user_detail))
        .route(
            "/api/admin/stores",
            get(admin::list_stores).post(admin::create_store),
        )
        .route("/api/stores", get(stores::list_stores))
        .route("/api/stores/:store_id", get(stores::get_store))
        .route("/api/store/dashboard", get(owner::dashboard))
        .route(
            "/api/store/update-password",
            post(password::update_store_owner_password),
        )
        .route(
            "/api/user/update-password",
            post(password::update_user_password),
        )
        .route("/api/ratings", post(ratings::submit))
        .route(
            "/api/ratings/:rating_id",
            patch(ratings::update).delete(ratings::delete),
        )
        .route("/api/ratings/user/:user_id", get(ratings::list_for_user))
        .route(
            "/api/ratings/user/:user_id/store/:store_id",
            get(ratings::get_for_user_and_store),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
