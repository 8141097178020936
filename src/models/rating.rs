use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deserialize_id;
use crate::models::user::User;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub store_id: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

/// A star value that has been checked against the 1..=5 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingValue(u8);

impl RatingValue {
    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange(pub i64);

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rating must be between {MIN_RATING} and {MAX_RATING} (got {})",
            self.0
        )
    }
}

impl std::error::Error for OutOfRange {}

impl TryFrom<i64> for RatingValue {
    type Error = OutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if (MIN_RATING..=MAX_RATING).contains(&v) => Ok(RatingValue(v)),
            _ => Err(OutOfRange(value)),
        }
    }
}

/// Lookup filter for the ratings collection. Unset fields match everything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RatingFilter {
    pub user_id: Option<String>,
    pub store_id: Option<String>,
}

impl RatingFilter {
    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn by_store(store_id: impl Into<String>) -> Self {
        Self {
            store_id: Some(store_id.into()),
            ..Default::default()
        }
    }

    pub fn by_user_and_store(user_id: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            store_id: Some(store_id.into()),
        }
    }

    pub fn matches(&self, rating: &Rating) -> bool {
        self.user_id.as_ref().map_or(true, |id| *id == rating.user_id)
            && self.store_id.as_ref().map_or(true, |id| *id == rating.store_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingPayload {
    #[serde(default)]
    pub store_id: String,
    pub rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatingPayload {
    pub rating: Option<i64>,
}

/// A rating shown on the store owner's dashboard, with the rater attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingWithUser {
    #[serde(flatten)]
    pub rating: Rating,
    pub user: Option<User>,
}
