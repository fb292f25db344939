//! In-process fake of the REST API.
//!
//! [`MemoryTransport`] answers requests the way the dashboard API does, from
//! collections held in memory. It enables deterministic tests of resource
//! clients and the query cache without a network.
//!
//! # Behaviour
//!
//! - `GET /<collection>` returns `{data, page, limit, total}`; query
//!   parameters other than `page` and `limit` filter string fields by
//!   case-insensitive substring
//! - `GET /<collection>/<id>` returns the item or 404
//! - `POST /<collection>` assigns the next id and returns 201 with the item
//! - `PUT /<collection>/<id>` replaces the item, keeping its id, or 404
//! - `DELETE /<collection>/<id>` returns 204, or 404 if already gone
//! - writes missing a field registered with [`MemoryTransport::require`]
//!   get 422 with per-field errors
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lexdesk::transport::MemoryTransport;
//!
//! let transport = Arc::new(MemoryTransport::new());
//! transport.require("useful-links", &["title", "url"]);
//! let id = transport.seed("useful-links", serde_json::json!({ "title": "Court", "url": "https://court.example" }));
//! assert_eq!(id, 1);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value, json};

use crate::error::Error;

use super::{ApiRequest, ApiResponse, Transport};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default)]
struct Store {
    collections: BTreeMap<String, BTreeMap<u64, Value>>,
    required: BTreeMap<String, Vec<String>>,
    next_id: u64,
    requests: Vec<ApiRequest>,
    failures: VecDeque<Error>,
}

/// A fake API server shared between the code under test and the test itself.
///
/// Clones share the same collections and request log.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    store: Arc<Mutex<Store>>,
    latency: Option<Duration>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response, so concurrent requests overlap.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Requires `fields` to be present and non-empty on writes to `collection`.
    pub fn require(&self, collection: &str, fields: &[&str]) {
        self.lock()
            .required
            .insert(
                collection.to_string(),
                fields.iter().map(|field| field.to_string()).collect(),
            );
    }

    /// Inserts an item directly and returns its id.
    pub fn seed(&self, collection: &str, item: Value) -> u64 {
        let mut store = self.lock();
        store.insert(collection, item)
    }

    /// Fails the next request with `err` instead of answering it.
    pub fn fail_next(&self, err: Error) {
        self.lock().failures.push_back(err);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received with `method` on exactly `path`.
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == *method && request.path == path)
            .count()
    }

    /// Number of items currently stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let mut store = self.lock();
        store.requests.push(request.clone());
        if let Some(err) = store.failures.pop_front() {
            return Err(err);
        }

        let segments: Vec<&str> = request
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let method = &request.method;
        let response = match segments.as_slice() {
            [collection] if method == Method::GET => store.list(collection, &request.query),
            [collection] if method == Method::POST => {
                store.create(collection, request.body.clone())
            }
            [collection, id] => match id.parse::<u64>() {
                Ok(id) if method == Method::GET => store.get(collection, id),
                Ok(id) if method == Method::PUT => {
                    store.update(collection, id, request.body.clone())
                }
                Ok(id) if method == Method::DELETE => store.delete(collection, id),
                Ok(_) => method_not_allowed(),
                Err(_) => not_found(collection, id),
            },
            _ => method_not_allowed(),
        };
        Ok(response)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, Error>> {
        async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.handle(request)
        }
        .boxed()
    }
}

impl Store {
    fn insert(&mut self, collection: &str, item: Value) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let item = with_id(item, id);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, item);
        id
    }

    fn list(&self, collection: &str, query: &[(String, String)]) -> ApiResponse {
        let mut page: usize = 1;
        let mut limit: usize = DEFAULT_LIMIT;
        let mut filters = Vec::new();
        for (key, value) in query {
            match key.as_str() {
                "page" => page = value.parse().unwrap_or(1).max(1),
                "limit" => limit = value.parse().unwrap_or(DEFAULT_LIMIT).max(1),
                _ => filters.push((key.as_str(), value.to_lowercase())),
            }
        }

        let matching: Vec<&Value> = self
            .collections
            .get(collection)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|item| {
                filters.iter().all(|(field, needle)| {
                    item.get(*field)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
                })
            })
            .collect();

        let total = matching.len();
        let data: Vec<&Value> = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        ApiResponse::json_value(
            StatusCode::OK,
            &json!({ "data": data, "page": page, "limit": limit, "total": total }),
        )
    }

    fn get(&self, collection: &str, id: u64) -> ApiResponse {
        match self.collections.get(collection).and_then(|items| items.get(&id)) {
            Some(item) => ApiResponse::json_value(StatusCode::OK, item),
            None => not_found(collection, &id.to_string()),
        }
    }

    fn create(&mut self, collection: &str, body: Option<Value>) -> ApiResponse {
        let body = body.unwrap_or_else(|| Value::Object(Map::new()));
        if let Some(response) = self.validate(collection, &body) {
            return response;
        }
        let id = self.insert(collection, body);
        self.get(collection, id).with_status(StatusCode::CREATED)
    }

    fn update(&mut self, collection: &str, id: u64, body: Option<Value>) -> ApiResponse {
        let exists = self
            .collections
            .get(collection)
            .is_some_and(|items| items.contains_key(&id));
        if !exists {
            return not_found(collection, &id.to_string());
        }

        let body = body.unwrap_or_else(|| Value::Object(Map::new()));
        if let Some(response) = self.validate(collection, &body) {
            return response;
        }
        let item = with_id(body, id);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, item.clone());
        ApiResponse::json_value(StatusCode::OK, &item)
    }

    fn delete(&mut self, collection: &str, id: u64) -> ApiResponse {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|items| items.remove(&id));
        match removed {
            Some(_) => ApiResponse::new(StatusCode::NO_CONTENT, Vec::new()),
            None => not_found(collection, &id.to_string()),
        }
    }

    fn validate(&self, collection: &str, body: &Value) -> Option<ApiResponse> {
        let required = self.required.get(collection)?;
        let errors: BTreeMap<&str, &str> = required
            .iter()
            .filter(|field| match body.get(field.as_str()) {
                None | Some(Value::Null) => true,
                Some(Value::String(text)) => text.trim().is_empty(),
                Some(_) => false,
            })
            .map(|field| (field.as_str(), "is required"))
            .collect();

        (!errors.is_empty()).then(|| {
            ApiResponse::json_value(
                StatusCode::UNPROCESSABLE_ENTITY,
                &json!({ "message": "Validation failed", "errors": errors }),
            )
        })
    }
}

impl ApiResponse {
    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

fn with_id(item: Value, id: u64) -> Value {
    match item {
        Value::Object(mut fields) => {
            fields.insert("id".to_string(), json!(id));
            Value::Object(fields)
        }
        other => json!({ "id": id, "value": other }),
    }
}

fn not_found(collection: &str, id: &str) -> ApiResponse {
    ApiResponse::json_value(
        StatusCode::NOT_FOUND,
        &json!({ "message": format!("{collection} {id} not found") }),
    )
}

fn method_not_allowed() -> ApiResponse {
    ApiResponse::json_value(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "message": "Method not allowed" }),
    )
}
