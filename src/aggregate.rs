//! Rating aggregation.
//!
//! Everything here works on an already-fetched slice of ratings. Nothing is
//! cached; callers recompute on every read. Values outside 1..=5 can only
//! come from a hand-edited backend and are left out of every figure.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::rating::{Rating, MAX_RATING, MIN_RATING};

fn counted(rating: &Rating) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating.rating)
}

/// Mean of the given ratings rounded to one decimal place, or `0.0` when empty.
pub fn average_rating(ratings: &[Rating]) -> f64 {
    let (sum, count) = ratings
        .iter()
        .filter(|r| counted(r))
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r.rating), count + 1));
    if count == 0 {
        return 0.0;
    }
    round_one_decimal(sum as f64 / count as f64)
}

/// Averages for every store that appears in `ratings`, from a single pass.
pub fn averages_by_store(ratings: &[Rating]) -> HashMap<String, f64> {
    let mut totals: HashMap<&str, (u64, u64)> = HashMap::new();
    for r in ratings.iter().filter(|r| counted(r)) {
        let entry = totals.entry(r.store_id.as_str()).or_default();
        entry.0 += u64::from(r.rating);
        entry.1 += 1;
    }
    totals
        .into_iter()
        .map(|(store_id, (sum, count))| {
            (
                store_id.to_string(),
                round_one_decimal(sum as f64 / count as f64),
            )
        })
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Count of ratings per star value. Serializes as `{"1": n, ..., "5": n}`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Distribution([u64; MAX_RATING as usize]);

impl Distribution {
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        let mut counts = [0u64; MAX_RATING as usize];
        for r in ratings.iter().filter(|r| counted(r)) {
            counts[usize::from(r.rating - MIN_RATING)] += 1;
        }
        Self(counts)
    }

    pub fn count(&self, stars: u8) -> u64 {
        if (MIN_RATING..=MAX_RATING).contains(&stars) {
            self.0[usize::from(stars - MIN_RATING)]
        } else {
            0
        }
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (stars, count) in (MIN_RATING..=MAX_RATING).zip(self.0.iter()) {
            map.serialize_entry(&stars.to_string(), count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub total_ratings: usize,
    pub average_rating: f64,
    pub rating_distribution: Distribution,
}

impl RatingStats {
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        Self {
            total_ratings: ratings.iter().filter(|r| counted(r)).count(),
            average_rating: average_rating(ratings),
            rating_distribution: Distribution::from_ratings(ratings),
        }
    }
}
