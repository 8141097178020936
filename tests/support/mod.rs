#![allow(dead_code)]

pub mod document_store;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use store_rating::{
    auth::hash_password,
    models::user::{Role, StoredUser, User},
    repository::{Repository, SqliteStore},
    rest, AppState,
};
use tower::ServiceExt;

pub const SECRET: &[u8] = b"Xk29-integration-signing-secret-7QpLr3";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<dyn Repository>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` pair from `Set-Cookie`, ready to send back.
    pub fn session(&self) -> String {
        self.set_cookie
            .as_deref()
            .and_then(|c| c.split(';').next())
            .expect("response set no cookie")
            .to_string()
    }
}

impl TestApp {
    pub async fn sqlite() -> Self {
        let repo = SqliteStore::in_memory().await.expect("in-memory sqlite");
        Self::with_repo(Arc::new(repo))
    }

    pub fn with_repo(repo: Arc<dyn Repository>) -> Self {
        let state = AppState::new(repo.clone(), SECRET, false);
        Self {
            router: rest::router(state),
            repo,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, cookie, Some(body)).await
    }

    /// Inserts a user straight into the repository, bypassing the API.
    pub async fn seed_user(&self, name: &str, email: &str, password: &str, role: Role) -> User {
        let stored = StoredUser {
            user: User {
                id: format!("{}-id", name.to_lowercase()),
                name: name.to_string(),
                email: email.to_string(),
                address: format!("{name} Street 1"),
                role,
                store_id: None,
            },
            password_hash: hash_password(password).unwrap(),
        };
        self.repo.insert_user(&stored).await.unwrap().user
    }

    /// Logs in and returns the cookie to send on later requests.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.session()
    }
}
