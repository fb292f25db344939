//! Client-side query cache with deduplication and invalidation.
//!
//! This module provides cached reads and cache-invalidating writes, similar to
//! SWR or TanStack Query.
//!
//! # Features
//!
//! - **Reads**: [`QueryClient::read`] serves fresh cached data, shares
//!   in-flight requests per key and caches both values and errors
//! - **Watches**: [`Query`] streams a key's state, refetching after invalidation
//!   while still showing the previous data
//! - **Writes**: [`QueryClient::mutate`] and [`Mutation`] invalidate affected
//!   key prefixes after a successful write
//!
//! # Example
//!
//! ```rust,ignore
//! use lexdesk::query::{QueryClient, QueryKey};
//!
//! let queries = QueryClient::new();
//! let key = QueryKey::from("links").with("list");
//!
//! let page = queries.read(&key, move || async move { links.list(&params).await }).await;
//!
//! queries
//!     .mutate(&QueryKey::from("links"), links.delete(&id))
//!     .await?;
//! ```

mod cache;
mod client;
mod config;
mod key;
pub mod mutation;

// Re-export main types
pub use cache::{CacheEntry, FetchStatus};
pub use client::{GarbageCollector, Query, QueryClient, QueryResult, QueryState};
pub use config::QueryConfig;
pub use key::{KeyPart, QueryKey};
pub use mutation::{Mutation, MutationResult, MutationState};
