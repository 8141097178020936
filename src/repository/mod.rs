//! Persistence behind a single trait.
//!
//! Two backends implement it:
//! - [`DocumentStore`]: forwards to an external JSON document-store HTTP
//!   service (`/users`, `/stores`, `/ratings`).
//! - [`SqliteStore`]: a local SQLite database that enforces one rating per
//!   (user, store) pair at the storage layer.

mod document;
mod sqlite;

pub use document::DocumentStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    rating::{Rating, RatingFilter, RatingValue},
    store::Store,
    user::{StoredUser, UserChanges},
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document store returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("invalid document store url: {0}")]
    InvalidUrl(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint rejected the write.
    #[error("duplicate {0}")]
    Conflict(String),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<StoredUser>, RepositoryError>;

    async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError>;

    async fn find_user_by_email(&self, email: &str)
        -> Result<Option<StoredUser>, RepositoryError>;

    async fn insert_user(&self, user: &StoredUser) -> Result<StoredUser, RepositoryError>;

    /// Returns `None` when no user has that id.
    async fn update_user(
        &self,
        id: &str,
        changes: &UserChanges,
    ) -> Result<Option<StoredUser>, RepositoryError>;

    async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError>;

    async fn find_store(&self, id: &str) -> Result<Option<Store>, RepositoryError>;

    async fn insert_store(&self, store: &Store) -> Result<Store, RepositoryError>;

    async fn list_ratings(&self, filter: &RatingFilter) -> Result<Vec<Rating>, RepositoryError>;

    async fn find_rating(&self, id: &str) -> Result<Option<Rating>, RepositoryError>;

    async fn insert_rating(&self, rating: &Rating) -> Result<Rating, RepositoryError>;

    async fn update_rating(
        &self,
        id: &str,
        value: RatingValue,
    ) -> Result<Option<Rating>, RepositoryError>;

    /// Returns `false` when no rating had that id.
    async fn delete_rating(&self, id: &str) -> Result<bool, RepositoryError>;
}
