//! Store rating platform: an HTTP JSON API where admins manage users and
//! stores, store owners follow the ratings on their store, and users rate
//! stores from one to five stars.

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod ratings;
pub mod repository;
pub mod rest;

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::repository::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, jwt_secret: &[u8], cookie_secure: bool) -> Self {
        Self {
            repo,
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            cookie_secure,
        }
    }
}
