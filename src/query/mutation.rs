//! Write operations that keep cached reads consistent.
//!
//! A [`Mutation`] wraps a create, update or delete together with the key
//! prefixes it affects. Running it goes through [`QueryClient::mutate`]: on
//! success every affected prefix is invalidated, on failure the cache is left
//! alone and the error is reported without retry.
//!
//! # Example
//!
//! ```rust,ignore
//! use lexdesk::query::{Mutation, QueryKey};
//!
//! let create_link = Mutation::new(queries.clone(), move |link: UsefulLink| {
//!     let links = links.clone();
//!     Box::pin(async move { links.create(&link).await })
//! })
//! .invalidates(QueryKey::from("links"));
//!
//! let result = create_link.execute(draft).await;
//! if let Some(err) = result.error() {
//!     show_error(err);
//! }
//!
//! // Or drive a submit button: `Loading` first, then the outcome.
//! let mut button = MutationResult::default();
//! let mut updates = create_link.watch(draft);
//! while let Some(next) = updates.next().await {
//!     button = next;
//! }
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Error;

use super::client::QueryClient;
use super::key::QueryKey;

/// The state of a mutation result.
#[derive(Debug, Clone)]
pub enum MutationState<T> {
    /// Mutation is idle (not yet started).
    Idle,
    /// Mutation is in progress.
    Loading,
    /// Mutation succeeded with a result.
    Success(T),
    /// Mutation failed with an error.
    Error(Error),
}

/// A mutation result containing the current state.
#[derive(Debug, Clone)]
pub struct MutationResult<T> {
    /// The current state of the mutation.
    pub state: MutationState<T>,
}

impl<T> MutationResult<T> {
    /// A mutation that has not been started.
    pub const fn idle() -> Self {
        Self {
            state: MutationState::Idle,
        }
    }

    /// A mutation whose request is outstanding.
    pub const fn loading() -> Self {
        Self {
            state: MutationState::Loading,
        }
    }

    /// Returns the result data if the mutation succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error if the mutation failed, otherwise `None`.
    pub const fn error(&self) -> Option<&Error> {
        match &self.state {
            MutationState::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the mutation is currently loading.
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, MutationState::Loading)
    }

    /// Returns `true` if the mutation succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.state, MutationState::Success(_))
    }

    /// Returns `true` if the mutation failed.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, MutationState::Error(_))
    }
}

impl<T> Default for MutationResult<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> From<Result<T, Error>> for MutationResult<T> {
    fn from(result: Result<T, Error>) -> Self {
        let state = match result {
            Ok(data) => MutationState::Success(data),
            Err(err) => MutationState::Error(err),
        };
        Self { state }
    }
}

type Mutator<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, Error>> + Send + Sync>;

/// A reusable write bound to the query keys it affects.
pub struct Mutation<I, O> {
    client: QueryClient,
    mutator: Mutator<I, O>,
    affects: Vec<QueryKey>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            mutator: self.mutator.clone(),
            affects: self.affects.clone(),
        }
    }
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a mutation that runs `mutator` for each input.
    pub fn new<F>(client: QueryClient, mutator: F) -> Self
    where
        F: Fn(I) -> BoxFuture<'static, Result<O, Error>> + Send + Sync + 'static,
    {
        Self {
            client,
            mutator: Arc::new(mutator),
            affects: Vec::new(),
        }
    }

    /// Declares a key prefix invalidated when the mutation succeeds.
    #[must_use]
    pub fn invalidates(mut self, prefix: impl Into<QueryKey>) -> Self {
        self.affects.push(prefix.into());
        self
    }

    /// Prefixes invalidated on success.
    pub fn affects(&self) -> &[QueryKey] {
        &self.affects
    }

    /// Runs the mutation once.
    pub async fn execute(&self, input: I) -> MutationResult<O> {
        let result = match self.affects.split_first() {
            Some((first, rest)) => {
                let output = self.client.mutate(first, (self.mutator)(input)).await;
                if output.is_ok() {
                    for prefix in rest {
                        self.client.invalidate(prefix);
                    }
                }
                output
            }
            None => (self.mutator)(input).await,
        };
        MutationResult::from(result)
    }

    /// Runs the mutation once, yielding `Loading` and then the outcome.
    ///
    /// The write starts when the stream is polled past `Loading`; dropping the
    /// stream before then skips it.
    pub fn watch(&self, input: I) -> BoxStream<'static, MutationResult<O>> {
        let mutation = self.clone();
        stream::once(async { MutationResult::loading() })
            .chain(stream::once(async move { mutation.execute(input).await }))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_mutation_result_data() {
        let result = MutationResult {
            state: MutationState::Success(42),
        };
        assert_eq!(result.data(), Some(&42));

        let result: MutationResult<i32> = MutationResult::idle();
        assert_eq!(result.data(), None);

        let result: MutationResult<i32> = MutationResult::loading();
        assert_eq!(result.data(), None);

        let result: MutationResult<i32> = Err(Error::Network("down".to_string())).into();
        assert_eq!(result.data(), None);
        assert_eq!(result.error(), Some(&Error::Network("down".to_string())));
    }

    #[test]
    fn test_mutation_result_predicates() {
        let idle: MutationResult<i32> = MutationResult::default();
        assert!(matches!(idle.state, MutationState::Idle));
        assert!(!idle.is_loading());
        assert!(!idle.is_success());
        assert!(!idle.is_error());

        let loading: MutationResult<i32> = MutationResult::loading();
        assert!(loading.is_loading());
        assert!(!loading.is_success());
        assert!(!loading.is_error());

        let success = MutationResult::from(Ok::<i32, Error>(42));
        assert!(!success.is_loading());
        assert!(success.is_success());
        assert!(!success.is_error());

        let error: MutationResult<i32> = Err(Error::Decode("bad".to_string())).into();
        assert!(!error.is_loading());
        assert!(!error.is_success());
        assert!(error.is_error());
    }

    #[tokio::test]
    async fn test_execute_invalidates_every_prefix() {
        let client = QueryClient::new();
        let links = QueryKey::from("links").with("list");
        let employees = QueryKey::from("employees").with("list");
        client.read(&links, || async { Ok::<i32, Error>(1) }).await;
        client.read(&employees, || async { Ok::<i32, Error>(2) }).await;

        let mutation = Mutation::new(client.clone(), |n: i32| {
            async move { Ok::<i32, Error>(n * 2) }.boxed()
        })
        .invalidates("links")
        .invalidates("employees");

        let result = mutation.execute(21).await;
        assert_eq!(result.data(), Some(&42));
        assert!(!client.is_fresh(&links));
        assert!(!client.is_fresh(&employees));
    }

    #[tokio::test]
    async fn test_failed_execute_leaves_cache() {
        let client = QueryClient::new();
        let links = QueryKey::from("links").with("list");
        client.read(&links, || async { Ok::<i32, Error>(1) }).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mutation = Mutation::new(client.clone(), move |_: ()| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), Error>(Error::HttpStatus {
                    status: 500,
                    message: "boom".to_string(),
                })
            }
            .boxed()
        })
        .invalidates("links");

        let result = mutation.execute(()).await;
        assert!(result.is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(client.is_fresh(&links));
    }

    #[tokio::test]
    async fn test_watch_reports_loading_before_outcome() {
        let client = QueryClient::new();
        let links = QueryKey::from("links").with("list");
        client.read(&links, || async { Ok::<i32, Error>(1) }).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mutation = Mutation::new(client.clone(), move |n: i32| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<i32, Error>(n + 1)
            }
            .boxed()
        })
        .invalidates("links");

        let mut updates = mutation.watch(1);
        let first = updates.next().await.expect("loading state");
        assert!(first.is_loading());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(client.is_fresh(&links));

        let second = updates.next().await.expect("outcome");
        assert_eq!(second.data(), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!client.is_fresh(&links));
        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_reports_failure() {
        let client = QueryClient::new();
        let mutation = Mutation::new(client, |_: ()| {
            async { Err::<(), Error>(Error::Network("offline".to_string())) }.boxed()
        });

        let states: Vec<_> = mutation.watch(()).collect().await;
        assert_eq!(states.len(), 2);
        assert!(states[0].is_loading());
        assert_eq!(states[1].error(), Some(&Error::Network("offline".to_string())));
    }
}
