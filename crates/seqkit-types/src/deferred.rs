//! Manually completed values that settle exactly once.
//!
//! A [`Deferred`] lets one task suspend on a [`Pending`] future while another
//! (typically a UI handler) supplies the outcome. It models a request/response
//! across a UI boundary: the outcome is a value, and a user "no" travels as
//! data (e.g. `confirmed: false`), not as an error.
//!
//! ```
//! use futures_util::FutureExt;
//! use seqkit_types::deferred::Deferred;
//!
//! let (deferred, pending) = Deferred::new();
//! assert!(deferred.resolve(1));
//! assert!(!deferred.resolve(2));
//! assert_eq!(pending.now_or_never(), Some(Ok(1)));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// The resolving side of a deferred value.
///
/// Cloning shares the same slot, so any clone may resolve it; only the first
/// call to [`Deferred::resolve`] takes effect.
#[derive(Debug)]
pub struct Deferred<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Deferred<T> {
    /// Creates a resolver and the future that observes it.
    pub fn new() -> (Self, Pending<T>) {
        let (sender, receiver) = oneshot::channel();
        let deferred = Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        };
        (deferred, Pending { receiver })
    }

    /// Settles the value. Returns `false` if it was already settled.
    ///
    /// Settling succeeds even if the [`Pending`] side has been dropped;
    /// the value is then discarded.
    pub fn resolve(&self, value: T) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }

    /// Whether [`Deferred::resolve`] has already been called.
    pub fn is_settled(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Every resolver was dropped before the value was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Deferred value dropped without being resolved")]
pub struct DeferredDropped;

/// The awaiting side of a deferred value.
#[derive(Debug)]
pub struct Pending<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T, DeferredDropped>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map_err(|_| DeferredDropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_to_first_value() {
        let (deferred, pending) = Deferred::new();
        assert!(deferred.resolve("first"));
        assert!(!deferred.resolve("second"));
        assert_eq!(pending.await, Ok("first"));
    }

    #[tokio::test]
    async fn test_clone_shares_slot() {
        let (deferred, pending) = Deferred::new();
        let other = deferred.clone();
        assert!(other.resolve(7u32));
        assert!(deferred.is_settled());
        assert!(!deferred.resolve(8));
        assert_eq!(pending.await, Ok(7));
    }

    #[tokio::test]
    async fn test_resolve_from_another_task() {
        let (deferred, pending) = Deferred::new();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            deferred.resolve(true)
        });
        assert_eq!(pending.await, Ok(true));
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_resolver() {
        let (deferred, pending) = Deferred::<u8>::new();
        drop(deferred);
        assert_eq!(pending.await, Err(DeferredDropped));
    }

    #[test]
    fn test_resolve_after_pending_dropped() {
        let (deferred, pending) = Deferred::new();
        drop(pending);
        assert!(deferred.resolve(1));
        assert!(!deferred.resolve(2));
    }
}
