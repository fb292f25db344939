use std::time::Duration;

use tokio::time::Instant;

use crate::error::Error;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Pending,
    Success,
    Error,
}

/// A cached read result with timestamp and staleness information.
///
/// The last successful `data` survives a refetch so it can keep being shown
/// while the entry is `Pending` again.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub status: FetchStatus,
    pub data: Option<T>,
    pub error: Option<Error>,
    pub timestamp: Instant,
    /// Last time the entry was read, joined or fetched.
    pub last_access: Instant,
    pub is_stale: bool,
}

impl<T> CacheEntry<T> {
    /// Creates an entry for a first fetch that has not resolved yet.
    pub fn pending() -> Self {
        let now = Instant::now();
        Self {
            status: FetchStatus::Pending,
            data: None,
            error: None,
            timestamp: now,
            last_access: now,
            is_stale: false,
        }
    }

    /// Moves the entry back to `Pending`, keeping the previous data.
    pub fn begin_fetch(&mut self) {
        self.status = FetchStatus::Pending;
        self.timestamp = Instant::now();
        self.last_access = self.timestamp;
    }

    /// Records a read of the entry.
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Stores the outcome of a fetch, resetting timestamp and staleness.
    pub fn resolve(&mut self, outcome: Result<T, Error>) {
        match outcome {
            Ok(data) => {
                self.status = FetchStatus::Success;
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => {
                self.status = FetchStatus::Error;
                self.error = Some(err);
            }
        }
        self.timestamp = Instant::now();
        self.last_access = self.timestamp;
        self.is_stale = false;
    }

    /// Checks if this entry is stale based on the given stale time.
    ///
    /// Without a stale time an entry only goes stale through invalidation.
    pub fn check_staleness(&mut self, stale_time: Option<Duration>) -> bool {
        if let Some(stale_time) = stale_time {
            if self.timestamp.elapsed() > stale_time {
                self.is_stale = true;
            }
        }
        self.is_stale
    }

    /// Marks this entry as stale.
    pub const fn mark_stale(&mut self) {
        self.is_stale = true;
    }

    pub fn is_pending(&self) -> bool {
        self.status == FetchStatus::Pending
    }

    /// Checks if this entry went unused for longer than `cache_time`.
    pub fn should_gc(&self, cache_time: Duration) -> bool {
        !self.is_pending() && self.last_access.elapsed() > cache_time
    }
}
