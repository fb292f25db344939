//! # lexdesk
//!
//! Data access for the lexdesk administrative dashboard: typed REST clients
//! for its collections and a client-side query cache that keeps screens in
//! sync with the server.
//!
//! ## Core Components
//!
//! - [`ResourceClient`](resource::ResourceClient): list/get/create/update/delete
//!   over one REST collection, typed by an [`Entity`](resource::Entity)
//! - [`UsefulLinkService`](resource::UsefulLinkService): the useful links
//!   client with its paginated search
//! - [`QueryClient`](query::QueryClient): caches reads by
//!   [`QueryKey`](query::QueryKey), shares in-flight requests and invalidates
//!   by key prefix after writes
//! - [`Debouncer`](debounce::Debouncer): turns search keystrokes into one
//!   settled value per pause
//! - [`Dashboard`](dashboard::Dashboard): wires one transport and one cache to
//!   the employees, proceedings and useful links collections
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lexdesk::dashboard::Dashboard;
//! use lexdesk::query::QueryClient;
//! use lexdesk::resource::UsefulLinkFilter;
//! use lexdesk::transport::MemoryTransport;
//!
//! # async fn run() -> lexdesk::Result<()> {
//! let dashboard = Dashboard::new(Arc::new(MemoryTransport::new()), QueryClient::new());
//!
//! let result = dashboard
//!     .links()
//!     .filter(&UsefulLinkFilter::new().title("court"))
//!     .await;
//! if let Some(page) = result.data() {
//!     println!("{} of {} links", page.len(), page.total);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod error;
pub mod model;
pub mod prelude;
pub mod query;
pub mod resource;
pub mod telemetry;
pub mod transport;

pub use error::{Error, Result};
