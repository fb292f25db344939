//! Typed REST resource clients.
//!
//! A [`ResourceClient`] offers list/get/create/update/delete over one REST
//! collection for one [`Entity`] type. Entity-specific clients wrap it and add
//! their own reads, such as [`UsefulLinkService::filter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lexdesk::model::Employee;
//! use lexdesk::resource::{ListParams, ResourceClient};
//!
//! let employees: ResourceClient<Employee, _> = ResourceClient::new(transport.clone());
//! let page = employees.list(&ListParams::new().page(1).limit(16)).await?;
//! let created = employees.create(&Employee::new("Ada", "ada@example.org", "Clerk")).await?;
//! ```

mod client;
mod useful_link;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::query::{KeyPart, QueryKey};

pub use client::ResourceClient;
pub use useful_link::{UsefulLinkFilter, UsefulLinkService};

/// A record stored in one REST collection.
///
/// The identifier is absent before creation and assigned by the server.
/// Implementors expose it read-only so it cannot be changed client-side.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Id: fmt::Display + Clone + Send + Sync + 'static;

    /// Default collection path, e.g. `/useful-links`.
    const ENDPOINT: &'static str;

    /// Cache tag leading every query key for this collection.
    const TAG: &'static str;

    /// Name of the identifier field in the JSON representation.
    const ID_FIELD: &'static str = "id";

    fn id(&self) -> Option<&Self::Id>;
}

/// Query parameters of a list request.
///
/// Parameters are kept sorted by name, so equal parameter sets always yield
/// the same query string order and the same cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(self, page: u32) -> Self {
        self.with("page", page)
    }

    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        self.with("limit", limit)
    }

    /// Sets a parameter, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    /// Sets a free-text filter; blank text removes the filter instead.
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, text: &str) -> Self {
        let name = name.into();
        let text = text.trim();
        if text.is_empty() {
            self.0.remove(&name);
        } else {
            self.0.insert(name, text.to_string());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Name/value pairs in key order, as sent on the wire.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Key parts identifying these parameters in a [`QueryKey`].
    pub fn key_parts(&self) -> impl Iterator<Item = KeyPart> + '_ {
        self.0
            .iter()
            .flat_map(|(k, v)| [KeyPart::from(k.as_str()), KeyPart::from(v.as_str())])
    }

    /// Appends these parameters to `key`.
    pub fn append_to(&self, mut key: QueryKey) -> QueryKey {
        key.extend(self.key_parts());
        key
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<E> {
    #[serde(default = "Vec::new")]
    pub data: Vec<E>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

impl<E> Page<E> {
    /// `true` when the page holds no items (the empty state of a list view).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of pages needed for `total` items at this page's limit.
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return u64::from(!self.data.is_empty());
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_ordered() {
        let a = ListParams::new().limit(16).page(1).with("title", "foo");
        let b = ListParams::new().with("title", "foo").page(1).limit(16);

        assert_eq!(a, b);
        assert_eq!(
            a.to_query(),
            vec![
                ("limit".to_string(), "16".to_string()),
                ("page".to_string(), "1".to_string()),
                ("title".to_string(), "foo".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_filter_is_removed() {
        let params = ListParams::new().filter("title", "court").filter("title", "   ");
        assert!(params.get("title").is_none());

        let params = ListParams::new().filter("title", "  court ");
        assert_eq!(params.get("title"), Some("court"));
    }

    #[test]
    fn test_params_extend_keys() {
        let key = ListParams::new()
            .page(2)
            .append_to(QueryKey::from("links").with("list"));
        assert_eq!(key.to_string(), "links/list/page/2");
    }

    #[test]
    fn test_page_deserializes_wire_format() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"data":[1,2],"page":1,"limit":2,"total":5}"#)
                .expect("valid page");
        assert_eq!(page.len(), 2);
        assert_eq!(page.total_pages(), 3);

        let empty: Page<u32> = serde_json::from_str(r#"{"data":[]}"#).expect("valid page");
        assert!(empty.is_empty());
        assert_eq!(empty.total_pages(), 0);
    }
}
