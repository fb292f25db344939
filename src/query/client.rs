//! Query cache coordination with request deduplication and invalidation.
//!
//! This module provides the [`QueryClient`] cache coordinator and the [`Query`]
//! watch stream, similar to SWR or TanStack Query.
//!
//! # Read Path
//!
//! 1. A fresh cached entry is returned without touching the network
//! 2. A key with a request in flight attaches to that request
//! 3. Anything else invokes the fetcher once and caches the outcome
//!
//! Fetches run on a spawned task and store their outcome in the cache when
//! they finish. A reader that goes away before then loses nothing but its
//! own copy of the result.
//!
//! # Example
//!
//! ```rust,ignore
//! use lexdesk::query::{QueryClient, QueryKey};
//!
//! let queries = QueryClient::new();
//! let key = QueryKey::from("links").with("list");
//!
//! let result = queries.read(&key, move || async move { links.list(&params).await }).await;
//! if let Some(page) = result.data() {
//!     println!("{} links", page.total);
//! }
//!
//! // after a write
//! queries.invalidate(&QueryKey::from("links"));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;

use super::cache::{CacheEntry, FetchStatus};
use super::config::QueryConfig;
use super::key::QueryKey;

type AnyValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<AnyValue, Error>>>;

/// The state of a query result.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    /// Query is loading (fetching data).
    Loading,
    /// Query succeeded with data.
    Success {
        /// The data returned by the query.
        data: T,
        /// Whether the data is stale and being (or about to be) refetched.
        is_stale: bool,
    },
    /// Query failed with an error.
    Error(Error),
}

/// A query result containing the current state.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    /// The current state of the query.
    pub state: QueryState<T>,
}

impl<T> QueryResult<T> {
    pub const fn loading() -> Self {
        Self {
            state: QueryState::Loading,
        }
    }

    pub const fn success(data: T, is_stale: bool) -> Self {
        Self {
            state: QueryState::Success { data, is_stale },
        }
    }

    pub const fn error(err: Error) -> Self {
        Self {
            state: QueryState::Error(err),
        }
    }

    /// Returns the data if the query succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the error if the query failed, otherwise `None`.
    pub const fn error_ref(&self) -> Option<&Error> {
        match &self.state {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the query is currently loading.
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    /// Returns `true` if the query succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    /// Returns `true` if the query failed.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }

    /// Returns `true` if the query data is stale.
    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }

    /// Converts the result into a plain `Result`.
    ///
    /// A result that is still loading has nothing to return and yields `None`.
    pub fn into_result(self) -> Option<Result<T, Error>> {
        match self.state {
            QueryState::Loading => None,
            QueryState::Success { data, .. } => Some(Ok(data)),
            QueryState::Error(err) => Some(Err(err)),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> QueryResult<T> {
    fn from_outcome(key: &QueryKey, outcome: Result<AnyValue, Error>) -> Self {
        match outcome.and_then(|value| downcast::<T>(key, &value)) {
            Ok(data) => Self::success(data, false),
            Err(err) => Self::error(err),
        }
    }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: &AnyValue) -> Result<T, Error> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| Error::CacheType {
            key: key.to_string(),
        })
}

/// One cache slot: the entry, the request currently filling it and a
/// generation bumped on every invalidation.
struct Slot {
    entry: CacheEntry<AnyValue>,
    in_flight: Option<SharedFetch>,
    generation: u64,
}

impl Slot {
    fn new() -> Self {
        Self {
            entry: CacheEntry::pending(),
            in_flight: None,
            generation: 0,
        }
    }

    fn complete(&mut self, generation: u64, outcome: Result<AnyValue, Error>) {
        self.in_flight = None;
        self.entry.resolve(outcome);
        // invalidated while the request was running
        if self.generation != generation {
            self.entry.mark_stale();
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("entry", &self.entry)
            .field("in_flight", &self.in_flight.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

enum Lookup {
    Cached(Result<AnyValue, Error>),
    InFlight(SharedFetch),
}

/// The cache coordinator.
///
/// The `QueryClient` is the central state manager for reads. It handles:
/// - Caching read results per [`QueryKey`]
/// - Deduplicating concurrent requests for the same key
/// - Invalidating entries by key prefix after writes
/// - Broadcasting invalidations to [`Query`] watchers
///
/// Clones share the same cache. Construct one per composition root.
///
/// # Example
///
/// ```rust
/// use lexdesk::query::{QueryClient, QueryConfig};
/// use std::time::Duration;
///
/// let config = QueryConfig::new(
///     Duration::from_secs(30),  // stale_time
///     Duration::from_secs(300), // cache_time
/// );
///
/// let client = QueryClient::with_config(config);
/// assert!(client.is_empty());
/// ```
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<DashMap<QueryKey, Slot>>,
    invalidation_tx: broadcast::Sender<QueryKey>,
    config: QueryConfig,
}

impl QueryClient {
    /// Creates a new query client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    /// Creates a new query client with the given configuration.
    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (invalidation_tx, _) = broadcast::channel(100);
        Self {
            cache: Arc::new(DashMap::new()),
            invalidation_tx,
            config,
        }
    }

    /// Reads `key`, fetching it with `fetcher` only when needed.
    ///
    /// Concurrent reads of the same key share one invocation of `fetcher`
    /// and all receive the same value or error. Errors are cached like
    /// values and are not retried until the key is invalidated.
    pub async fn read<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        match self.begin_read(key, fetcher) {
            Lookup::Cached(outcome) => QueryResult::from_outcome(key, outcome),
            Lookup::InFlight(fetch) => QueryResult::from_outcome(key, fetch.await),
        }
    }

    fn begin_read<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Lookup
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let mut slot = self.cache.entry(key.clone()).or_insert_with(Slot::new);

        if let Some(fetch) = slot.in_flight.clone() {
            debug!(%key, "joining in-flight request");
            slot.entry.touch();
            return Lookup::InFlight(fetch);
        }

        if !slot.entry.check_staleness(self.config.stale_time) {
            let cached = match slot.entry.status {
                FetchStatus::Success => slot.entry.data.clone().map(Ok),
                FetchStatus::Error => slot.entry.error.clone().map(Err),
                FetchStatus::Pending => None,
            };
            if let Some(outcome) = cached {
                debug!(%key, "cache hit");
                slot.entry.touch();
                return Lookup::Cached(outcome);
            }
        }

        let generation = slot.generation;
        let cache = Arc::clone(&self.cache);
        let owned_key = key.clone();
        let fetch = async move {
            let outcome = fetcher().await.map(|data| Arc::new(data) as AnyValue);
            if let Some(mut slot) = cache.get_mut(&owned_key) {
                slot.complete(generation, outcome.clone());
            }
            outcome
        }
        .boxed()
        .shared();

        slot.in_flight = Some(fetch.clone());
        slot.entry.begin_fetch();
        drop(slot);

        debug!(%key, "cache miss, fetching");
        // Drive the request to completion even if every reader is dropped.
        tokio::spawn(fetch.clone());

        Lookup::InFlight(fetch)
    }

    /// Marks every entry whose key equals or starts with `prefix` as stale.
    ///
    /// Returns the number of entries marked. Active [`Query`] streams under
    /// the prefix refetch, showing their previous data in the meantime.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut marked = 0;
        for mut slot in self.cache.iter_mut() {
            if slot.key().starts_with(prefix) {
                slot.generation += 1;
                slot.entry.mark_stale();
                marked += 1;
            }
        }

        debug!(%prefix, marked, "invalidated queries");
        // No receivers just means nobody is watching.
        let _ = self.invalidation_tx.send(prefix.clone());
        marked
    }

    /// Runs a write and invalidates `affects` when it succeeds.
    ///
    /// A failed write leaves the cache untouched and returns the error as is.
    pub async fn mutate<O, Fut>(&self, affects: &QueryKey, operation: Fut) -> Result<O, Error>
    where
        Fut: Future<Output = Result<O, Error>>,
    {
        match operation.await {
            Ok(output) => {
                self.invalidate(affects);
                Ok(output)
            }
            Err(err) => {
                warn!(%affects, error = %err, "mutation failed");
                Err(err)
            }
        }
    }

    /// Returns the current state of `key` without fetching.
    ///
    /// While a refetch is running the previous data is reported as stale.
    pub fn snapshot<T>(&self, key: &QueryKey) -> Option<QueryResult<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut slot = self.cache.get_mut(key)?;
        let stale_time = self.config.stale_time;
        let entry = &mut slot.entry;
        entry.touch();
        let is_stale = entry.check_staleness(stale_time) || entry.is_pending();

        let result = match (entry.status, entry.data.as_ref(), entry.error.as_ref()) {
            (FetchStatus::Error, _, Some(err)) => QueryResult::error(err.clone()),
            (_, Some(data), _) => match downcast::<T>(key, data) {
                Ok(data) => QueryResult::success(data, is_stale),
                Err(err) => QueryResult::error(err),
            },
            _ => QueryResult::loading(),
        };
        Some(result)
    }

    /// Returns `true` if `key` holds a resolved entry that is not stale.
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        let stale_time = self.config.stale_time;
        self.cache.get_mut(key).is_some_and(|mut slot| {
            !slot.entry.is_pending() && !slot.entry.check_staleness(stale_time)
        })
    }

    /// Drops resolved entries nobody read within the configured cache time.
    ///
    /// Entries with a request in flight are kept. Returns the number removed.
    pub fn collect_garbage(&self) -> usize {
        let cache_time = self.config.cache_time;
        let mut removed = 0;
        self.cache.retain(|_, slot| {
            let keep = slot.in_flight.is_some() || !slot.entry.should_gc(cache_time);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(removed, "collected expired queries");
        }
        removed
    }

    /// Runs [`QueryClient::collect_garbage`] every `every` on a spawned task.
    ///
    /// Must be called within a Tokio runtime. The task stops when the
    /// returned handle is dropped.
    pub fn spawn_garbage_collector(&self, every: Duration) -> GarbageCollector {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let client = self.clone();
        let join = tokio::spawn(async move {
            let mut ticks = interval(every);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick completes immediately
            ticks.tick().await;
            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = ticks.tick() => {
                        client.collect_garbage();
                    }
                }
            }
        });
        GarbageCollector { token, join }
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Gets the query configuration.
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Subscribes to invalidation notifications.
    fn subscribe_invalidation(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidation_tx.subscribe()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Handle of a periodic garbage collection task.
///
/// Dropping it stops the task.
pub struct GarbageCollector {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl GarbageCollector {
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

impl Drop for GarbageCollector {
    fn drop(&mut self) {
        self.token.cancel();
        self.join.abort();
    }
}

impl fmt::Debug for GarbageCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GarbageCollector")
            .field("running", &self.is_running())
            .finish()
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, Error>> + Send + Sync>;

/// A watch over one query key.
///
/// [`Query::stream`] yields the evolving [`QueryResult`] of the key:
///
/// 1. Cached data is emitted immediately (flagged stale if it is), or `Loading`
/// 2. Missing or stale data is fetched through [`QueryClient::read`], so
///    watchers of the same key share requests
/// 3. When the key is invalidated, the stale data is emitted again and the
///    query refetches
///
/// Dropping the stream tears the watcher down; a request it started keeps
/// running and still fills the cache.
///
/// # Example
///
/// ```rust,ignore
/// let query = Query::new(
///     QueryKey::from("links").with("list"),
///     move || Box::pin(async move { links.list(&ListParams::new()).await }),
///     queries.clone(),
/// );
///
/// let mut updates = query.stream();
/// while let Some(result) = updates.next().await {
///     render(result);
/// }
/// ```
pub struct Query<T> {
    key: QueryKey,
    fetcher: Fetcher<T>,
    client: QueryClient,
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a new query with the given key, fetcher, and client.
    pub fn new<F>(key: QueryKey, fetcher: F, client: QueryClient) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, Error>> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(fetcher),
            client,
        }
    }

    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Returns the stream of results for this query.
    pub fn stream(&self) -> BoxStream<'static, QueryResult<T>> {
        let key = self.key.clone();
        let fetcher = self.fetcher.clone();
        let client = self.client.clone();

        stream::unfold(State::Initial, move |state| {
            let key = key.clone();
            let fetcher = fetcher.clone();
            let client = client.clone();

            async move {
                match state {
                    State::Initial => {
                        // Subscribe before fetching so no invalidation is missed.
                        let rx = client.subscribe_invalidation();
                        match client.snapshot::<T>(&key) {
                            Some(result) if client.is_fresh(&key) => {
                                Some((result, State::Watching { rx }))
                            }
                            Some(result) => Some((result, State::Fetching { rx })),
                            None => Some((QueryResult::loading(), State::Fetching { rx })),
                        }
                    }

                    State::Fetching { rx } => {
                        let result = client.read(&key, move || fetcher()).await;
                        Some((result, State::Watching { rx }))
                    }

                    State::Watching { mut rx } => loop {
                        match rx.recv().await {
                            Ok(prefix) if key.starts_with(&prefix) => {
                                let result = client
                                    .snapshot::<T>(&key)
                                    .unwrap_or_else(QueryResult::loading);
                                return Some((result, State::Fetching { rx }));
                            }
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                // Missed notifications may have covered our key.
                                debug!(%key, skipped, "invalidation receiver lagged");
                                let result = client
                                    .snapshot::<T>(&key)
                                    .unwrap_or_else(QueryResult::loading);
                                return Some((result, State::Fetching { rx }));
                            }
                            Err(broadcast::error::RecvError::Closed) => return None,
                        }
                    },
                }
            }
        })
        .boxed()
    }
}

/// Internal state machine for the Query stream.
enum State {
    Initial,
    Fetching { rx: broadcast::Receiver<QueryKey> },
    Watching { rx: broadcast::Receiver<QueryKey> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(
        calls: &Arc<AtomicUsize>,
        value: i32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<i32, Error>> + Send + 'static {
        let calls = calls.clone();
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            })
        }
    }

    #[test]
    fn test_query_result_data() {
        let result = QueryResult::success(42, false);
        assert_eq!(result.data(), Some(&42));

        let result: QueryResult<i32> = QueryResult::loading();
        assert_eq!(result.data(), None);

        let result: QueryResult<i32> = QueryResult::error(Error::Network("down".to_string()));
        assert_eq!(result.data(), None);
        assert!(result.error_ref().is_some());
    }

    #[test]
    fn test_query_result_predicates() {
        let loading: QueryResult<i32> = QueryResult::loading();
        assert!(loading.is_loading());
        assert!(!loading.is_success());
        assert!(!loading.is_error());
        assert!(!loading.is_stale());

        let success = QueryResult::success(42, false);
        assert!(!success.is_loading());
        assert!(success.is_success());
        assert!(!success.is_error());
        assert!(!success.is_stale());

        let stale = QueryResult::success(42, true);
        assert!(stale.is_success());
        assert!(stale.is_stale());

        let error: QueryResult<i32> = QueryResult::error(Error::Decode("bad".to_string()));
        assert!(!error.is_loading());
        assert!(!error.is_success());
        assert!(error.is_error());
        assert!(!error.is_stale());
    }

    #[test]
    fn test_into_result() {
        assert!(QueryResult::<i32>::loading().into_result().is_none());
        assert_eq!(QueryResult::success(1, true).into_result(), Some(Ok(1)));
    }

    #[test]
    fn test_query_client_new() {
        let client = QueryClient::new();
        assert_eq!(client.len(), 0);
        assert_eq!(client.config().stale_time, None);
    }

    #[test]
    fn test_query_client_with_config() {
        let config = QueryConfig::new(Duration::from_secs(30), Duration::from_secs(300));
        let client = QueryClient::with_config(config);
        assert_eq!(client.config().stale_time, Some(Duration::from_secs(30)));
        assert_eq!(client.config().cache_time, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_read_caches_value() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from("links");

        let first = client.read(&key, counted(&calls, 1)).await;
        let second = client.read(&key, counted(&calls, 2)).await;

        assert_eq!(first.data(), Some(&1));
        assert_eq!(second.data(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(client.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_fetch() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from("links").with("list");

        let (a, b, c) = tokio::join!(
            client.read(&key, counted(&calls, 7)),
            client.read(&key, counted(&calls, 8)),
            client.read(&key, counted(&calls, 9)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.data(), Some(&7));
        assert_eq!(b.data(), Some(&7));
        assert_eq!(c.data(), Some(&7));
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let list = QueryKey::from("links").with("list");
        let detail = QueryKey::from("links").with("detail").with("3");
        let other = QueryKey::from("employees").with("list");

        client.read(&list, counted(&calls, 1)).await;
        client.read(&detail, counted(&calls, 2)).await;
        client.read(&other, counted(&calls, 3)).await;

        let marked = client.invalidate(&QueryKey::from("links"));
        assert_eq!(marked, 2);
        assert!(!client.is_fresh(&list));
        assert!(!client.is_fresh(&detail));
        assert!(client.is_fresh(&other));

        let refreshed = client.read(&list, counted(&calls, 10)).await;
        assert_eq!(refreshed.data(), Some(&10));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_invalidate_nonexistent_key() {
        let client = QueryClient::new();
        let mut rx = client.subscribe_invalidation();

        assert_eq!(client.invalidate(&QueryKey::from("nonexistent")), 0);

        // Still broadcast even if no cache entry exists
        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        let key = result
            .expect("Should receive notification within timeout")
            .expect("Channel should not be closed");
        assert_eq!(key, QueryKey::from("nonexistent"));
    }

    #[tokio::test]
    async fn test_read_with_mismatched_type() {
        let client = QueryClient::new();
        let key = QueryKey::from("data");

        let _ = client
            .read(&key, || async { Ok::<i32, Error>(42) })
            .await;
        let result = client
            .read(&key, || async { Ok::<String, Error>("test".to_string()) })
            .await;

        assert_eq!(
            result.error_ref(),
            Some(&Error::CacheType {
                key: "data".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_snapshot_reports_stale_data() {
        let client = QueryClient::new();
        let key = QueryKey::from("links");
        assert!(client.snapshot::<i32>(&key).is_none());

        client.read(&key, || async { Ok::<i32, Error>(5) }).await;
        let snapshot = client.snapshot::<i32>(&key).expect("entry should exist");
        assert!(!snapshot.is_stale());

        client.invalidate(&key);
        let snapshot = client.snapshot::<i32>(&key).expect("entry should exist");
        assert_eq!(snapshot.data(), Some(&5));
        assert!(snapshot.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_time_expires_entries() {
        let config = QueryConfig::new(Duration::from_secs(30), Duration::from_secs(300));
        let client = QueryClient::with_config(config);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from("links");

        client.read(&key, counted(&calls, 1)).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!client.is_fresh(&key));

        let result = client.read(&key, counted(&calls, 2)).await;
        assert_eq!(result.data(), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_garbage() {
        let config = QueryConfig::new(Duration::from_secs(30), Duration::from_secs(60));
        let client = QueryClient::with_config(config);
        let calls = Arc::new(AtomicUsize::new(0));

        client.read(&QueryKey::from("old"), counted(&calls, 1)).await;
        tokio::time::advance(Duration::from_secs(45)).await;
        client.read(&QueryKey::from("new"), counted(&calls, 2)).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(client.collect_garbage(), 1);
        assert_eq!(client.len(), 1);
        assert!(client.snapshot::<i32>(&QueryKey::from("new")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_reads_keep_entries_alive() {
        let config = QueryConfig::new(Duration::from_secs(300), Duration::from_secs(60));
        let client = QueryClient::with_config(config);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from("links").with("list");

        client.read(&key, counted(&calls, 1)).await;
        tokio::time::advance(Duration::from_secs(50)).await;
        let hit = client.read(&key, counted(&calls, 2)).await;
        assert_eq!(hit.data(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(client.collect_garbage(), 0);
        assert!(client.snapshot::<i32>(&key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_garbage_collector_runs_periodically() {
        let config = QueryConfig::new(Duration::from_secs(30), Duration::from_secs(60));
        let client = QueryClient::with_config(config);
        let calls = Arc::new(AtomicUsize::new(0));
        client.read(&QueryKey::from("links"), counted(&calls, 1)).await;

        let collector = client.spawn_garbage_collector(Duration::from_secs(30));
        assert!(collector.is_running());
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(client.is_empty());

        drop(collector);
        client.read(&QueryKey::from("links"), counted(&calls, 2)).await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(client.len(), 1);
    }
}
