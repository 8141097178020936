//! Filtering and sorting for the admin tables and the store browser.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::models::{store::StoreWithRating, user::User};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSortField {
    #[default]
    Name,
    Email,
    Address,
    Role,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreSortField {
    #[default]
    Name,
    Email,
    Address,
    AverageRating,
}

/// Query string for `GET /api/admin/users`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct UserQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// `all` or absent matches every role.
    pub role: Option<String>,
    pub sort: UserSortField,
    pub order: SortOrder,
}

/// Query string for `GET /api/admin/stores`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StoreQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub sort: StoreSortField,
    pub order: SortOrder,
}

/// Query string for `GET /api/stores`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub search: Option<String>,
}

fn contains_ci(haystack: &str, needle: Option<&String>) -> bool {
    match needle {
        Some(n) if !n.is_empty() => haystack.to_lowercase().contains(&n.to_lowercase()),
        _ => true,
    }
}

fn cmp_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl UserQuery {
    fn role_filter(&self) -> Option<&str> {
        self.role
            .as_deref()
            .filter(|r| !r.is_empty() && *r != "all")
    }

    pub fn matches(&self, user: &User) -> bool {
        contains_ci(&user.name, self.name.as_ref())
            && contains_ci(&user.email, self.email.as_ref())
            && contains_ci(&user.address, self.address.as_ref())
            && self
                .role_filter()
                .map_or(true, |role| user.role.as_str() == role)
    }

    pub fn apply(&self, users: Vec<User>) -> Vec<User> {
        let mut users: Vec<User> = users.into_iter().filter(|u| self.matches(u)).collect();
        users.sort_by(|a, b| {
            let ordering = match self.sort {
                UserSortField::Name => cmp_ci(&a.name, &b.name),
                UserSortField::Email => cmp_ci(&a.email, &b.email),
                UserSortField::Address => cmp_ci(&a.address, &b.address),
                UserSortField::Role => a.role.as_str().cmp(b.role.as_str()),
            };
            self.order.apply(ordering)
        });
        users
    }
}

impl StoreQuery {
    pub fn matches(&self, store: &StoreWithRating) -> bool {
        contains_ci(&store.store.name, self.name.as_ref())
            && contains_ci(&store.store.email, self.email.as_ref())
            && contains_ci(&store.store.address, self.address.as_ref())
    }

    pub fn apply(&self, stores: Vec<StoreWithRating>) -> Vec<StoreWithRating> {
        let mut stores: Vec<StoreWithRating> =
            stores.into_iter().filter(|s| self.matches(s)).collect();
        stores.sort_by(|a, b| {
            let ordering = match self.sort {
                StoreSortField::Name => cmp_ci(&a.store.name, &b.store.name),
                StoreSortField::Email => cmp_ci(&a.store.email, &b.store.email),
                StoreSortField::Address => cmp_ci(&a.store.address, &b.store.address),
                StoreSortField::AverageRating => a.average_rating.total_cmp(&b.average_rating),
            };
            self.order.apply(ordering)
        });
        stores
    }
}

impl SearchQuery {
    /// Matches on name or address, case-insensitively.
    pub fn matches(&self, store: &StoreWithRating) -> bool {
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                store.store.name.to_lowercase().contains(&term)
                    || store.store.address.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}
