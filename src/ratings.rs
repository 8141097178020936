//! Rating submission and per-store averages on top of a [`Repository`].

use chrono::Utc;
use uuid::Uuid;

use crate::{
    aggregate::{average_rating, averages_by_store},
    error::AppError,
    models::{
        rating::{Rating, RatingFilter, RatingValue},
        store::{Store, StoreWithRating},
    },
    repository::{Repository, RepositoryError},
};

/// Outcome of [`submit_rating`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Created(Rating),
    Updated(Rating),
}

impl Submission {
    pub fn rating(&self) -> &Rating {
        match self {
            Submission::Created(r) | Submission::Updated(r) => r,
        }
    }
}

/// Checks a raw star value from a request body.
pub fn validate_rating(value: Option<i64>) -> Result<RatingValue, AppError> {
    let value = value.ok_or_else(|| AppError::Validation("Rating value is required".to_string()))?;
    RatingValue::try_from(value).map_err(|e| AppError::Validation(e.to_string()))
}

/// Creates the user's rating for a store, or updates it if one exists.
///
/// This is a lookup followed by a write. Against the document store two
/// concurrent submissions for the same pair can both miss the lookup and
/// insert twice; the SQLite backend folds the second insert into an update.
pub async fn submit_rating(
    repo: &dyn Repository,
    user_id: &str,
    store_id: &str,
    value: RatingValue,
) -> Result<Submission, AppError> {
    if repo.find_store(store_id).await?.is_none() {
        return Err(AppError::NotFound("Store not found".to_string()));
    }

    let existing = repo
        .list_ratings(&RatingFilter::by_user_and_store(user_id, store_id))
        .await?
        .into_iter()
        .next();

    if let Some(existing) = existing {
        if let Some(updated) = repo.update_rating(&existing.id, value).await? {
            return Ok(Submission::Updated(updated));
        }
        // deleted since the lookup; start over with a fresh rating
        tracing::debug!(rating_id = %existing.id, "rating vanished before update");
    }

    let rating = Rating {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        store_id: store_id.to_string(),
        rating: value.get(),
        created_at: Utc::now(),
    };
    Ok(Submission::Created(repo.insert_rating(&rating).await?))
}

pub async fn average_for_store(repo: &dyn Repository, store_id: &str) -> Result<f64, RepositoryError> {
    let ratings = repo.list_ratings(&RatingFilter::by_store(store_id)).await?;
    Ok(average_rating(&ratings))
}

pub async fn with_average(repo: &dyn Repository, store: Store) -> Result<StoreWithRating, RepositoryError> {
    let average_rating = average_for_store(repo, &store.id).await?;
    Ok(StoreWithRating {
        store,
        average_rating,
    })
}

/// Attaches averages to a whole listing using a single ratings fetch.
pub async fn with_averages(
    repo: &dyn Repository,
    stores: Vec<Store>,
) -> Result<Vec<StoreWithRating>, RepositoryError> {
    let ratings = repo.list_ratings(&RatingFilter::default()).await?;
    let averages = averages_by_store(&ratings);
    Ok(stores
        .into_iter()
        .map(|store| {
            let average_rating = averages.get(&store.id).copied().unwrap_or(0.0);
            StoreWithRating {
                store,
                average_rating,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        models::user::{Role, StoredUser, User, UserChanges},
        repository::SqliteStore,
    };

    /// Deletes the rating it is asked to update, as a concurrent DELETE would.
    struct DeletedMidUpdate(SqliteStore);

    #[async_trait]
    impl Repository for DeletedMidUpdate {
        async fn list_users(&self) -> Result<Vec<StoredUser>, RepositoryError> {
            self.0.list_users().await
        }
        async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
            self.0.find_user(id).await
        }
        async fn find_user_by_email(
            &self,
            email: &str,
        ) -> Result<Option<StoredUser>, RepositoryError> {
            self.0.find_user_by_email(email).await
        }
        async fn insert_user(&self, user: &StoredUser) -> Result<StoredUser, RepositoryError> {
            self.0.insert_user(user).await
        }
        async fn update_user(
            &self,
            id: &str,
            changes: &UserChanges,
        ) -> Result<Option<StoredUser>, RepositoryError> {
            self.0.update_user(id, changes).await
        }
        async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
            self.0.list_stores().await
        }
        async fn find_store(&self, id: &str) -> Result<Option<Store>, RepositoryError> {
            self.0.find_store(id).await
        }
        async fn insert_store(&self, store: &Store) -> Result<Store, RepositoryError> {
            self.0.insert_store(store).await
        }
        async fn list_ratings(&self, filter: &RatingFilter) -> Result<Vec<Rating>, RepositoryError> {
            self.0.list_ratings(filter).await
        }
        async fn find_rating(&self, id: &str) -> Result<Option<Rating>, RepositoryError> {
            self.0.find_rating(id).await
        }
        async fn insert_rating(&self, rating: &Rating) -> Result<Rating, RepositoryError> {
            self.0.insert_rating(rating).await
        }
        async fn update_rating(
            &self,
            id: &str,
            value: RatingValue,
        ) -> Result<Option<Rating>, RepositoryError> {
            self.0.delete_rating(id).await?;
            self.0.update_rating(id, value).await
        }
        async fn delete_rating(&self, id: &str) -> Result<bool, RepositoryError> {
            self.0.delete_rating(id).await
        }
    }

    #[tokio::test]
    async fn resubmission_recreates_a_rating_deleted_mid_update() {
        let sqlite = SqliteStore::in_memory().await.unwrap();
        sqlite
            .insert_user(&StoredUser {
                user: User {
                    id: "u1".into(),
                    name: "Ann".into(),
                    email: "ann@test.dev".into(),
                    address: "1 Lane".into(),
                    role: Role::User,
                    store_id: None,
                },
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        sqlite
            .insert_store(&Store {
                id: "s1".into(),
                name: "Shop".into(),
                email: "shop@test.dev".into(),
                address: "2 Lane".into(),
                owner_id: "u1".into(),
            })
            .await
            .unwrap();
        let repo = DeletedMidUpdate(sqlite);

        let first = submit_rating(&repo, "u1", "s1", RatingValue::try_from(2).unwrap())
            .await
            .unwrap();
        assert!(matches!(first, Submission::Created(_)));

        let second = submit_rating(&repo, "u1", "s1", RatingValue::try_from(4).unwrap())
            .await
            .unwrap();
        assert!(matches!(second, Submission::Created(_)));
        assert_eq!(second.rating().rating, 4);
        assert_ne!(second.rating().id, first.rating().id);

        let stored = repo
            .list_ratings(&RatingFilter::by_user_and_store("u1", "s1"))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rating, 4);
    }

    #[test]
    fn validate_rating_requires_a_value_in_range() {
        assert_eq!(validate_rating(Some(3)).unwrap().get(), 3);
        assert!(matches!(validate_rating(None), Err(AppError::Validation(_))));
        assert!(matches!(validate_rating(Some(0)), Err(AppError::Validation(_))));
        assert!(matches!(validate_rating(Some(6)), Err(AppError::Validation(_))));
    }
}
