use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{Repository, RepositoryError};
use crate::models::{
    rating::{Rating, RatingFilter, RatingValue},
    store::Store,
    user::{Role, StoredUser, User, UserChanges},
};

const USER_COLUMNS: &str = "id, name, email, address, role, password_hash, store_id";
const STORE_COLUMNS: &str = "id, name, email, address, owner_id";
const RATING_COLUMNS: &str = "id, user_id, store_id, rating, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    address: String,
    role: String,
    password_hash: String,
    store_id: Option<String>,
}

impl TryFrom<UserRow> for StoredUser {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|e| RepositoryError::DataCorruption(format!("user {}: {e}", row.id)))?;
        Ok(StoredUser {
            user: User {
                id: row.id,
                name: row.name,
                email: row.email,
                address: row.address,
                role,
                store_id: row.store_id,
            },
            password_hash: row.password_hash,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: String,
    name: String,
    email: String,
    address: String,
    owner_id: String,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Store {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            owner_id: row.owner_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: String,
    user_id: String,
    store_id: String,
    rating: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for Rating {
    type Error = RepositoryError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating).map_err(|_| {
            RepositoryError::DataCorruption(format!("rating {}: value {}", row.id, row.rating))
        })?;
        Ok(Rating {
            id: row.id,
            user_id: row.user_id,
            store_id: row.store_id,
            rating,
            created_at: row.created_at,
        })
    }
}

/// Maps a unique-constraint violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(what: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if e
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation())
        {
            RepositoryError::Conflict(what.to_string())
        } else {
            RepositoryError::Database(e)
        }
    }
}

/// SQLite-backed repository.
///
/// Unlike the document store, the ratings table carries a
/// `UNIQUE(user_id, store_id)` constraint and inserts resolve conflicts by
/// updating the existing row, so concurrent submissions still leave one
/// rating per pair.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. Single connection, so every query sees
    /// the same data.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, RepositoryError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Repository for SqliteStore {
    async fn list_users(&self) -> Result<Vec<StoredUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StoredUser::try_from).collect()
    }

    async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(StoredUser::try_from)
            .transpose()
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredUser>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(StoredUser::try_from)
        .transpose()
    }

    async fn insert_user(&self, user: &StoredUser) -> Result<StoredUser, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.user.id)
        .bind(&user.user.name)
        .bind(&user.user.email)
        .bind(&user.user.address)
        .bind(user.user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.user.store_id)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("email"))?;
        StoredUser::try_from(row)
    }

    async fn update_user(
        &self,
        id: &str,
        changes: &UserChanges,
    ) -> Result<Option<StoredUser>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
                role = COALESCE(?, role), \
                store_id = COALESCE(?, store_id), \
                password_hash = COALESCE(?, password_hash) \
             WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(changes.role.map(|r| r.as_str()))
        .bind(&changes.store_id)
        .bind(&changes.password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(StoredUser::try_from)
        .transpose()
    }

    async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Store::from).collect())
    }

    async fn find_store(&self, id: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Store::from))
    }

    async fn insert_store(&self, store: &Store) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "INSERT INTO stores ({STORE_COLUMNS}) VALUES (?, ?, ?, ?, ?) RETURNING {STORE_COLUMNS}"
        ))
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.email)
        .bind(&store.address)
        .bind(&store.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("store"))?;
        Ok(Store::from(row))
    }

    async fn list_ratings(&self, filter: &RatingFilter) -> Result<Vec<Rating>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingRow>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings \
             WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR store_id = ?2) \
             ORDER BY created_at, rowid"
        ))
        .bind(&filter.user_id)
        .bind(&filter.store_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Rating::try_from).collect()
    }

    async fn find_rating(&self, id: &str) -> Result<Option<Rating>, RepositoryError> {
        sqlx::query_as::<_, RatingRow>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Rating::try_from)
        .transpose()
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<Rating, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(&format!(
            "INSERT INTO ratings ({RATING_COLUMNS}) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, store_id) DO UPDATE SET rating = excluded.rating \
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(&rating.id)
        .bind(&rating.user_id)
        .bind(&rating.store_id)
        .bind(i64::from(rating.rating))
        .bind(rating.created_at)
        .fetch_one(&self.pool)
        .await?;
        Rating::try_from(row)
    }

    async fn update_rating(
        &self,
        id: &str,
        value: RatingValue,
    ) -> Result<Option<Rating>, RepositoryError> {
        sqlx::query_as::<_, RatingRow>(&format!(
            "UPDATE ratings SET rating = ? WHERE id = ? RETURNING {RATING_COLUMNS}"
        ))
        .bind(i64::from(value.get()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Rating::try_from)
        .transpose()
    }

    async fn delete_rating(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_user(id: &str, email: &str) -> StoredUser {
        StoredUser {
            user: User {
                id: id.into(),
                name: "Test User".into(),
                email: email.into(),
                address: "1 Test Way".into(),
                role: Role::User,
                store_id: None,
            },
            password_hash: "hash".into(),
        }
    }

    fn rating(id: &str, user_id: &str, store_id: &str, value: u8) -> Rating {
        Rating {
            id: id.into(),
            user_id: user_id.into(),
            store_id: store_id.into(),
            rating: value,
            created_at: Utc::now(),
        }
    }

    async fn seeded() -> SqliteStore {
        let repo = SqliteStore::in_memory().await.unwrap();
        repo.insert_user(&stored_user("u1", "one@test.dev")).await.unwrap();
        repo.insert_user(&stored_user("u2", "two@test.dev")).await.unwrap();
        repo.insert_store(&Store {
            id: "s1".into(),
            name: "Shop".into(),
            email: "shop@test.dev".into(),
            address: "2 Test Way".into(),
            owner_id: "u2".into(),
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = seeded().await;
        let err = repo
            .insert_user(&stored_user("u3", "one@test.dev"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_user_only_touches_given_fields() {
        let repo = seeded().await;
        let updated = repo
            .update_user(
                "u2",
                &UserChanges {
                    role: Some(Role::StoreOwner),
                    store_id: Some("s1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.user.role, Role::StoreOwner);
        assert_eq!(updated.user.store_id.as_deref(), Some("s1"));
        assert_eq!(updated.password_hash, "hash");

        let missing = repo.update_user("nobody", &UserChanges::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn second_insert_for_same_pair_updates_in_place() {
        let repo = seeded().await;
        repo.insert_rating(&rating("r1", "u1", "s1", 2)).await.unwrap();
        let second = repo.insert_rating(&rating("r2", "u1", "s1", 5)).await.unwrap();

        assert_eq!(second.id, "r1");
        assert_eq!(second.rating, 5);
        let all = repo.list_ratings(&RatingFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn list_ratings_applies_filters() {
        let repo = seeded().await;
        repo.insert_rating(&rating("r1", "u1", "s1", 4)).await.unwrap();
        repo.insert_rating(&rating("r2", "u2", "s1", 3)).await.unwrap();

        let by_user = repo.list_ratings(&RatingFilter::by_user("u1")).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].id, "r1");

        let by_store = repo.list_ratings(&RatingFilter::by_store("s1")).await.unwrap();
        assert_eq!(by_store.len(), 2);

        let pair = repo
            .list_ratings(&RatingFilter::by_user_and_store("u2", "s1"))
            .await
            .unwrap();
        assert_eq!(pair.len(), 1);
        assert_eq!(pair[0].rating, 3);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let repo = seeded().await;
        repo.insert_rating(&rating("r1", "u1", "s1", 4)).await.unwrap();

        let value = RatingValue::try_from(1).unwrap();
        let updated = repo.update_rating("r1", value).await.unwrap().unwrap();
        assert_eq!(updated.rating, 1);
        assert!(repo.update_rating("nope", value).await.unwrap().is_none());

        assert!(repo.delete_rating("r1").await.unwrap());
        assert!(!repo.delete_rating("r1").await.unwrap());
        assert!(repo.find_rating("r1").await.unwrap().is_none());
    }
}
