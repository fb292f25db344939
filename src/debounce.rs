//! Trailing-edge debouncing of search input.
//!
//! Search boxes feed every keystroke into a [`Debouncer`]; only the value that
//! stays put for the whole window comes out of the paired stream, so a query
//! key is built once per pause instead of once per keystroke.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use lexdesk::debounce::Debouncer;
//! use lexdesk::resource::UsefulLinkFilter;
//!
//! let (mut input, mut settled) = Debouncer::new(Duration::from_millis(500));
//! input.push("co".to_string());
//! input.push("court".to_string());
//!
//! // only "court" arrives, 500ms after the last push
//! while let Some(title) = settled.next().await {
//!     let key = UsefulLinkFilter::new().title(title).query_key();
//! }
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Timer task waiting to emit one value.
struct Pending {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Pending {
    fn cancel(self) {
        self.token.cancel();
        self.join.abort();
    }
}

/// Emits a value once no newer value has been pushed for the whole window.
///
/// Must be used from within a Tokio runtime. Dropping the debouncer discards
/// the value still waiting and ends the output stream.
pub struct Debouncer<T> {
    window: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<Pending>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Creates a debouncer and the stream its settled values arrive on.
    pub fn new(window: Duration) -> (Self, UnboundedReceiverStream<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            tx,
            pending: None,
        };
        (debouncer, UnboundedReceiverStream::new(rx))
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Replaces the waiting value with `value` and restarts the window.
    pub fn push(&mut self, value: T) {
        if let Some(pending) = self.pending.take() {
            trace!("debounce window restarted");
            pending.cancel();
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();
        let window = self.window;
        let join = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    // Receiver gone means nobody listens anymore.
                    let _ = tx.send(value);
                }
            }
        });

        self.pending = Some(Pending { token, join });
    }

    /// Discards the waiting value, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    /// Returns `true` while a pushed value is still waiting out its window.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.join.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_is_emitted() {
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(500));

        debouncer.push("c");
        advance(Duration::from_millis(100)).await;
        debouncer.push("co");
        advance(Duration::from_millis(100)).await;
        debouncer.push("cou");

        let value = timeout(Duration::from_secs(1), settled.next()).await;
        assert_eq!(value, Ok(Some("cou")));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_value() {
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(500));

        debouncer.push(1);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        let value = timeout(Duration::from_secs(1), settled.next()).await;
        assert!(value.is_err(), "nothing should be emitted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_ends_stream() {
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(500));
        debouncer.push(1);
        drop(debouncer);

        assert_eq!(settled.next().await, None);
    }
}
