//! Prelude module for convenient imports.
//!
//! ```
//! use lexdesk::prelude::*;
//! ```

pub use crate::dashboard::{CachedResource, Dashboard};
pub use crate::debounce::Debouncer;
pub use crate::error::{Error, Result};
pub use crate::model::{Employee, LegalProceeding, ProceedingStatus, UsefulLink};
pub use crate::query::{
    Mutation, Query, QueryClient, QueryConfig, QueryKey, QueryResult, QueryState,
};
pub use crate::resource::{
    Entity, ListParams, Page, ResourceClient, UsefulLinkFilter, UsefulLinkService,
};
pub use crate::transport::{HttpTransport, MemoryTransport, Transport};
