//! Error taxonomy shared by the transport, resource clients and the query cache.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Convenient result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for every fallible operation in the crate.
///
/// The type is `Clone` because a single in-flight fetch hands its outcome to
/// every reader that attached to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport failed before a response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// A response was received with a non-2xx status and no field errors.
    #[error("Request failed with status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// A 4xx response carrying per-field validation errors.
    #[error("Validation failed: {message}")]
    Validation {
        status: u16,
        message: String,
        errors: BTreeMap<String, String>,
    },

    /// The server answered 404.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The response body could not be decoded into the expected type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A cache key was read with a different value type than it was stored with.
    #[error("Cached value for `{key}` has a different type")]
    CacheType { key: String },

    /// The transport could not be configured.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Classifies a non-2xx response into the matching error variant.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let payload: Value = serde_json::from_slice(body).unwrap_or_default();
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map_or_else(|| fallback_message(status, body), str::to_string);

        if status == StatusCode::NOT_FOUND {
            return Self::NotFound { message };
        }

        match payload.get("errors").and_then(field_messages) {
            Some(errors) if status.is_client_error() && !errors.is_empty() => Self::Validation {
                status: status.as_u16(),
                message,
                errors,
            },
            _ => Self::HttpStatus {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Returns `true` for [`Error::NotFound`].
    ///
    /// A repeated delete surfaces this error; callers may treat it as success.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status carried by the error, if a response was received.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::Validation { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Per-field validation messages, if any.
    pub const fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Flattens an `errors` object whose values are a message or a list of them.
fn field_messages(errors: &Value) -> Option<BTreeMap<String, String>> {
    let fields = errors.as_object()?;
    let messages = fields
        .iter()
        .map(|(field, value)| {
            let message = match value {
                Value::String(message) => message.clone(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            };
            (field.clone(), message)
        })
        .collect();
    Some(messages)
}

fn fallback_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() || text.starts_with('{') {
        status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
    } else {
        text.to_string()
    }
}
