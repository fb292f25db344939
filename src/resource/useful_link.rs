use std::ops::Deref;
use std::sync::Arc;

use crate::error::Error;
use crate::model::UsefulLink;
use crate::query::QueryKey;
use crate::transport::Transport;

use super::{Entity, ListParams, Page, ResourceClient};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 16;

/// Search criteria for useful links.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsefulLinkFilter {
    /// Free text matched against link titles.
    pub title: String,
    pub category: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for UsefulLinkFilter {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl UsefulLinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title text and goes back to the first page.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self.page = DEFAULT_PAGE;
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Query parameters for the list endpoint; blank text is left out.
    pub fn to_params(&self) -> ListParams {
        let params = ListParams::new()
            .page(self.page)
            .limit(self.limit)
            .filter("title", &self.title);
        match self.category.as_deref() {
            Some(category) => params.filter("category", category),
            None => params,
        }
    }

    /// Cache key of this search: `["links", "filter", <params>...]`.
    pub fn query_key(&self) -> QueryKey {
        self.to_params()
            .append_to(QueryKey::new(UsefulLink::TAG).with("filter"))
    }
}

/// Client for the useful links collection.
///
/// Every generic operation is available through [`Deref`] to the underlying
/// [`ResourceClient`]; [`UsefulLinkService::filter`] adds the search.
pub struct UsefulLinkService<T> {
    base: ResourceClient<UsefulLink, T>,
}

impl<T> Clone for UsefulLinkService<T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

impl<T: Transport> UsefulLinkService<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            base: ResourceClient::new(transport),
        }
    }

    /// Searches links by title and category, one page at a time.
    pub async fn filter(&self, filter: &UsefulLinkFilter) -> Result<Page<UsefulLink>, Error> {
        self.base.list(&filter.to_params()).await
    }
}

impl<T> From<ResourceClient<UsefulLink, T>> for UsefulLinkService<T> {
    fn from(base: ResourceClient<UsefulLink, T>) -> Self {
        Self { base }
    }
}

impl<T> Deref for UsefulLinkService<T> {
    type Target = ResourceClient<UsefulLink, T>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
