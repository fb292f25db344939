use std::time::Duration;

/// Configuration for query behavior.
///
/// This controls how long cached reads are served and when they are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long data is considered fresh before becoming stale.
    ///
    /// `None` keeps data fresh until its key is invalidated. Once stale, the
    /// next read refetches while watchers keep showing the cached data.
    pub stale_time: Option<Duration>,

    /// How long resolved entries are retained before garbage collection.
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: None,
            cache_time: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

impl QueryConfig {
    /// Creates a new query configuration with the given stale and cache times.
    #[must_use]
    pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time: Some(stale_time),
            cache_time,
        }
    }
}
