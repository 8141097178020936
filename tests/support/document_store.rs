//! An in-process stand-in for the json-server document store.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};

type Collections = Arc<Mutex<HashMap<String, Vec<Value>>>>;

#[derive(Clone)]
struct Backend {
    data: Collections,
    honour_filters: bool,
}

#[derive(Clone)]
pub struct FakeDocumentStore {
    pub addr: SocketAddr,
    data: Collections,
}

impl FakeDocumentStore {
    pub async fn start() -> Self {
        Self::serve(true).await
    }

    /// A store that returns whole collections regardless of `?field=value`.
    pub async fn start_ignoring_filters() -> Self {
        Self::serve(false).await
    }

    async fn serve(honour_filters: bool) -> Self {
        let data: Collections = Arc::new(Mutex::new(HashMap::new()));
        let backend = Backend {
            data: data.clone(),
            honour_filters,
        };
        let app = Router::new()
            .route("/:collection", get(list).post(create))
            .route("/:collection/:id", get(fetch).patch(update).delete(remove))
            .with_state(backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, data }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.data
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn insert(&self, collection: &str, document: Value) {
        self.data
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn id_matches(document: &Value, id: &str) -> bool {
    document.get("id").map(as_text).as_deref() == Some(id)
}

async fn list(
    State(backend): State<Backend>,
    Path(collection): Path<String>,
    Query(mut filters): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    if !backend.honour_filters {
        filters.clear();
    }
    let data = backend.data.lock().unwrap();
    let documents: Vec<Value> = data
        .get(&collection)
        .map(|docs| {
            docs.iter()
                .filter(|doc| {
                    filters
                        .iter()
                        .all(|(field, wanted)| doc.get(field).map(as_text).as_deref() == Some(wanted.as_str()))
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(documents)
}

async fn create(
    State(backend): State<Backend>,
    Path(collection): Path<String>,
    Json(mut document): Json<Value>,
) -> impl IntoResponse {
    let mut data = backend.data.lock().unwrap();
    let docs = data.entry(collection).or_default();
    if document.get("id").is_none() {
        document["id"] = json!((docs.len() + 1).to_string());
    }
    docs.push(document.clone());
    (StatusCode::CREATED, Json(document))
}

async fn fetch(
    State(backend): State<Backend>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let data = backend.data.lock().unwrap();
    data.get(&collection)
        .and_then(|docs| docs.iter().find(|d| id_matches(d, &id)).cloned())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update(
    State(backend): State<Backend>,
    Path((collection, id)): Path<(String, String)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Value>, StatusCode> {
    let mut data = backend.data.lock().unwrap();
    let document = data
        .get_mut(&collection)
        .and_then(|docs| docs.iter_mut().find(|d| id_matches(d, &id)))
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Value::Object(fields) = &mut *document {
        fields.extend(changes);
    }
    Ok(Json(document.clone()))
}

async fn remove(
    State(backend): State<Backend>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let mut data = backend.data.lock().unwrap();
    let docs = data.get_mut(&collection).ok_or(StatusCode::NOT_FOUND)?;
    let position = docs
        .iter()
        .position(|d| id_matches(d, &id))
        .ok_or(StatusCode::NOT_FOUND)?;
    docs.remove(position);
    Ok(Json(json!({})))
}
