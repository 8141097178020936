use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use super::{Repository, RepositoryError};
use crate::models::{
    rating::{Rating, RatingFilter, RatingValue},
    store::Store,
    user::{StoredUser, UserChanges},
};

const USERS: &str = "users";
const STORES: &str = "stores";
const RATINGS: &str = "ratings";

/// Client for a json-server style document store.
///
/// Every call is a single HTTP request with no retries. Lookups by id map a
/// 404 to `None`; any other non-success status becomes
/// [`RepositoryError::Status`].
#[derive(Clone)]
pub struct DocumentStore {
    client: reqwest::Client,
    base_url: Url,
}

impl DocumentStore {
    pub fn new(base_url: &str) -> Result<Self, RepositoryError> {
        let base_url =
            Url::parse(base_url).map_err(|e| RepositoryError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RepositoryError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RepositoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RepositoryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, RepositoryError> {
        let url = self.endpoint(&[collection])?;
        let response = self.client.get(url).query(query).send().await?;
        let response = check(response)?;
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, RepositoryError> {
        let url = self.endpoint(&[collection, id])?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response)?;
        Ok(Some(response.json().await?))
    }

    async fn create<B, T>(&self, collection: &str, body: &B) -> Result<T, RepositoryError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&[collection])?;
        let response = self.client.post(url).json(body).send().await?;
        let response = check(response)?;
        Ok(response.json().await?)
    }

    async fn patch<B, T>(
        &self,
        collection: &str,
        id: &str,
        body: &B,
    ) -> Result<Option<T>, RepositoryError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&[collection, id])?;
        let response = self.client.patch(url).json(body).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response)?;
        Ok(Some(response.json().await?))
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, RepositoryError> {
        let url = self.endpoint(&[collection, id])?;
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response)?;
        Ok(true)
    }
}

fn check(response: reqwest::Response) -> Result<reqwest::Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RepositoryError::Status {
            status: status.as_u16(),
            path: response.url().path().to_string(),
        })
    }
}

#[async_trait]
impl Repository for DocumentStore {
    async fn list_users(&self) -> Result<Vec<StoredUser>, RepositoryError> {
        self.list(USERS, &[]).await
    }

    async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        self.get(USERS, id).await
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredUser>, RepositoryError> {
        let users: Vec<StoredUser> = self.list(USERS, &[("email", email)]).await?;
        Ok(users.into_iter().find(|u| u.user.email == email))
    }

    async fn insert_user(&self, user: &StoredUser) -> Result<StoredUser, RepositoryError> {
        self.create(USERS, user).await
    }

    async fn update_user(
        &self,
        id: &str,
        changes: &UserChanges,
    ) -> Result<Option<StoredUser>, RepositoryError> {
        self.patch(USERS, id, changes).await
    }

    async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        self.list(STORES, &[]).await
    }

    async fn find_store(&self, id: &str) -> Result<Option<Store>, RepositoryError> {
        self.get(STORES, id).await
    }

    async fn insert_store(&self, store: &Store) -> Result<Store, RepositoryError> {
        self.create(STORES, store).await
    }

    async fn list_ratings(&self, filter: &RatingFilter) -> Result<Vec<Rating>, RepositoryError> {
        let mut query = Vec::new();
        if let Some(user_id) = filter.user_id.as_deref() {
            query.push(("userId", user_id));
        }
        if let Some(store_id) = filter.store_id.as_deref() {
            query.push(("storeId", store_id));
        }
        let ratings: Vec<Rating> = self.list(RATINGS, &query).await?;
        // not every document store honours query filters; apply them again locally
        Ok(ratings.into_iter().filter(|r| filter.matches(r)).collect())
    }

    async fn find_rating(&self, id: &str) -> Result<Option<Rating>, RepositoryError> {
        self.get(RATINGS, id).await
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<Rating, RepositoryError> {
        self.create(RATINGS, rating).await
    }

    async fn update_rating(
        &self,
        id: &str,
        value: RatingValue,
    ) -> Result<Option<Rating>, RepositoryError> {
        self.patch(RATINGS, id, &json!({ "rating": value.get() })).await
    }

    async fn delete_rating(&self, id: &str) -> Result<bool, RepositoryError> {
        self.remove(RATINGS, id).await
    }
}
