//! Composition root: one transport, one query cache, three collections.
//!
//! A [`Dashboard`] is built once by the application and handed to whatever
//! renders the employees, proceedings and useful links screens. Reads go
//! through the shared [`QueryClient`]; writes invalidate the collection they
//! touched so every open list refetches.
//!
//! # Example
//!
//! ```rust,ignore
//! use lexdesk::dashboard::Dashboard;
//! use lexdesk::resource::{ListParams, UsefulLinkFilter};
//!
//! let settings = lexdesk::config::load(None)?;
//! let dashboard = Dashboard::from_settings(&settings)?;
//!
//! let employees = dashboard.employees().list(&ListParams::new().page(1)).await;
//! let links = dashboard.links().filter(&UsefulLinkFilter::new().title("court")).await;
//! dashboard.links().delete(&3).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::{SearchSettings, Settings};
use crate::debounce::Debouncer;
use crate::error::Error;
use crate::model::{Employee, LegalProceeding, UsefulLink};
use crate::query::{GarbageCollector, Query, QueryClient, QueryKey, QueryResult};
use crate::resource::{
    Entity, ListParams, Page, ResourceClient, UsefulLinkFilter, UsefulLinkService,
};
use crate::transport::{HttpTransport, Transport};

/// A [`ResourceClient`] whose reads are cached and whose writes invalidate.
///
/// Keys used:
///
/// - `list`: `[tag, "list", <params>...]`
/// - `get`: `[tag, "detail", <id>]`
/// - `filter` (links only): `[tag, "filter", <params>...]`
pub struct CachedResource<E, T> {
    client: ResourceClient<E, T>,
    queries: QueryClient,
}

impl<E, T> Clone for CachedResource<E, T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            queries: self.queries.clone(),
        }
    }
}

impl<E, T> CachedResource<E, T>
where
    E: Entity,
    T: Transport,
{
    pub fn new(client: ResourceClient<E, T>, queries: QueryClient) -> Self {
        Self { client, queries }
    }

    /// The uncached client underneath.
    pub fn client(&self) -> &ResourceClient<E, T> {
        &self.client
    }

    pub fn list_key(&self, params: &ListParams) -> QueryKey {
        params.append_to(self.client.tag().with("list"))
    }

    pub fn detail_key(&self, id: &E::Id) -> QueryKey {
        self.client.tag().with("detail").with(id.to_string())
    }

    pub async fn list(&self, params: &ListParams) -> QueryResult<Page<E>> {
        let client = self.client.clone();
        let owned = params.clone();
        self.queries
            .read(&self.list_key(params), move || async move {
                client.list(&owned).await
            })
            .await
    }

    /// Watches one page of the collection, refetching after every write.
    pub fn watch_list(&self, params: &ListParams) -> Query<Page<E>> {
        let client = self.client.clone();
        let owned = params.clone();
        Query::new(
            self.list_key(params),
            move || {
                let client = client.clone();
                let params = owned.clone();
                async move { client.list(&params).await }.boxed()
            },
            self.queries.clone(),
        )
    }

    pub async fn get(&self, id: &E::Id) -> QueryResult<E> {
        let client = self.client.clone();
        let owned = id.clone();
        self.queries
            .read(&self.detail_key(id), move || async move {
                client.get(&owned).await
            })
            .await
    }

    /// Creates `entity` and invalidates every cached read of the collection.
    pub async fn create(&self, entity: &E) -> Result<E, Error> {
        self.queries
            .mutate(&self.client.tag(), self.client.create(entity))
            .await
    }

    pub async fn update(&self, id: &E::Id, entity: &E) -> Result<E, Error> {
        self.queries
            .mutate(&self.client.tag(), self.client.update(id, entity))
            .await
    }

    /// Deletes `id`. A second delete of the same id fails with
    /// [`Error::NotFound`] and leaves the cache as it was.
    pub async fn delete(&self, id: &E::Id) -> Result<(), Error> {
        self.queries
            .mutate(&self.client.tag(), self.client.delete(id))
            .await
    }

    /// Marks every cached read of the collection stale.
    pub fn invalidate(&self) -> usize {
        self.queries.invalidate(&self.client.tag())
    }
}

impl<T: Transport> CachedResource<UsefulLink, T> {
    /// The search-capable client for useful links.
    pub fn service(&self) -> UsefulLinkService<T> {
        UsefulLinkService::from(self.client.clone())
    }

    pub async fn filter(&self, filter: &UsefulLinkFilter) -> QueryResult<Page<UsefulLink>> {
        let service = self.service();
        let owned = filter.clone();
        self.queries
            .read(&filter.query_key(), move || async move {
                service.filter(&owned).await
            })
            .await
    }

    pub fn watch_filter(&self, filter: &UsefulLinkFilter) -> Query<Page<UsefulLink>> {
        let service = self.service();
        let owned = filter.clone();
        Query::new(
            filter.query_key(),
            move || {
                let service = service.clone();
                let filter = owned.clone();
                async move { service.filter(&filter).await }.boxed()
            },
            self.queries.clone(),
        )
    }
}

/// Data access for the whole dashboard.
///
/// Every distinct search creates a cache key of its own. Entries unread for
/// the configured cache time are only dropped by
/// [`QueryClient::collect_garbage`]: either call it from the owner or enable
/// [`Dashboard::with_garbage_collection`].
pub struct Dashboard<T> {
    transport: Arc<T>,
    queries: QueryClient,
    search: SearchSettings,
    collector: Option<GarbageCollector>,
    employees: CachedResource<Employee, T>,
    proceedings: CachedResource<LegalProceeding, T>,
    links: CachedResource<UsefulLink, T>,
}

impl<T: Transport> Dashboard<T> {
    pub fn new(transport: Arc<T>, queries: QueryClient) -> Self {
        Self {
            employees: CachedResource::new(ResourceClient::new(transport.clone()), queries.clone()),
            proceedings: CachedResource::new(
                ResourceClient::new(transport.clone()),
                queries.clone(),
            ),
            links: CachedResource::new(ResourceClient::new(transport.clone()), queries.clone()),
            search: SearchSettings::default(),
            collector: None,
            transport,
            queries,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }

    /// Collects unused cache entries every `every` until the dashboard is dropped.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn with_garbage_collection(mut self, every: Duration) -> Self {
        self.collector = Some(self.queries.spawn_garbage_collector(every));
        self
    }

    pub fn employees(&self) -> &CachedResource<Employee, T> {
        &self.employees
    }

    pub fn proceedings(&self) -> &CachedResource<LegalProceeding, T> {
        &self.proceedings
    }

    pub fn links(&self) -> &CachedResource<UsefulLink, T> {
        &self.links
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// A debouncer for search input using the configured quiet period.
    pub fn search_input<V: Send + 'static>(&self) -> (Debouncer<V>, UnboundedReceiverStream<V>) {
        Debouncer::new(self.search.debounce)
    }
}

impl Dashboard<HttpTransport> {
    /// Builds an HTTP-backed dashboard from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        let transport = Arc::new(HttpTransport::new(&settings.api)?);
        let queries = QueryClient::with_config(settings.query.clone());
        Ok(Self::new(transport, queries).with_search(settings.search.clone()))
    }
}
