//! Read-only view of an inline completion provider's enablement.
//!
//! The settings session never configures the completer; it only needs to
//! know whether one is currently enabled so completion controls can be
//! disabled and the right affordance shown.

use futures::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Implemented by whatever owns the completion feature. The settings side
/// holds a subscription, not the provider itself.
pub trait CompletionAvailability {
    /// Current enablement, true when completions are switched on.
    fn is_enabled(&self) -> bool;

    /// Subscribe to enablement changes. Dropping the receiver ends the
    /// subscription.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// A live subscription to one completion provider's enablement flag.
#[derive(Debug, Clone)]
pub struct CompletionBridge {
    rx: watch::Receiver<bool>,
}

impl CompletionBridge {
    pub fn new(provider: &dyn CompletionAvailability) -> Self {
        Self {
            rx: provider.subscribe(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the flag to change and returns the new value, or `None`
    /// once the provider side has gone away.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// The enablement flag as a stream. Yields the current value first,
    /// then every change.
    pub fn updates(&self) -> impl Stream<Item = bool> {
        WatchStream::new(self.rx.clone())
    }
}
