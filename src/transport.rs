//! The HTTP boundary every resource client goes through.
//!
//! A [`Transport`] turns an [`ApiRequest`] into an [`ApiResponse`]. It owns
//! credentials and timeouts; resource clients only build requests and decode
//! responses. Two implementations ship with the crate:
//!
//! - [`HttpTransport`]: `reqwest` client with a cookie store and configured
//!   credentials attached to every request
//! - [`MemoryTransport`]: an in-process fake of the REST API for tests and demos

pub mod http;
pub mod memory;

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

/// A request against the API, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response with its status and raw body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json_value(status: StatusCode, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// Turns a non-2xx response into the matching [`Error`].
    pub fn error_for_status(self) -> Result<Self, Error> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::from_response(self.status, &self.body))
        }
    }

    /// Checks the status, then decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        let response = self.error_for_status()?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Sends API requests.
///
/// Implementations return `Err` only when no response was received
/// ([`Error::Network`]); status handling is left to the caller.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, Error>>;
}
