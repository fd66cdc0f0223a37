//! Observable single-slot state for pending user confirmations.
//!
//! A [`ConfirmationStore`] holds "is there a pending user decision right now".
//! It is an explicit object handed to whoever needs it rather than a process
//! global: the bridge that raises the confirmation publishes into it, and any
//! number of views subscribe to it so that whichever one is mounted can render
//! the picker and resolve the decision.

use tokio::sync::watch;

/// A single observable slot.
///
/// Publishing into an occupied slot through [`ConfirmationStore::try_publish`]
/// fails and hands the value back, so two confirmations are never shown at once.
#[derive(Debug)]
pub struct ConfirmationStore<T> {
    sender: watch::Sender<Option<T>>,
}

impl<T> Default for ConfirmationStore<T> {
    fn default() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }
}

impl<T: Clone> ConfirmationStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the slot.
    pub fn current(&self) -> Option<T> {
        self.sender.borrow().clone()
    }

    pub fn is_occupied(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Subscribes to slot changes. The receiver sees the current value immediately.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes `value` if the slot is empty; otherwise returns it untouched.
    pub fn try_publish(&self, value: T) -> Result<(), T> {
        let mut value = Some(value);
        self.sender.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        });
        match value {
            Some(rejected) => Err(rejected),
            None => Ok(()),
        }
    }

    /// Empties the slot, returning what it held.
    pub fn clear(&self) -> Option<T> {
        let mut previous = None;
        self.sender.send_if_modified(|slot| {
            previous = slot.take();
            previous.is_some()
        });
        previous
    }

    /// Empties the slot only if its content satisfies `predicate`.
    pub fn clear_if(&self, predicate: impl FnOnce(&T) -> bool) -> bool {
        self.sender.send_if_modified(|slot| match slot {
            Some(value) if predicate(value) => {
                *slot = None;
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_into_empty_slot() {
        let store = ConfirmationStore::new();
        assert!(store.try_publish("a").is_ok());
        assert_eq!(store.current(), Some("a"));
    }

    #[test]
    fn test_occupied_slot_rejects() {
        let store = ConfirmationStore::new();
        store.try_publish(1).unwrap();
        assert_eq!(store.try_publish(2), Err(2));
        assert_eq!(store.current(), Some(1));
    }

    #[test]
    fn test_clear_if() {
        let store = ConfirmationStore::new();
        store.try_publish(5).unwrap();
        assert!(!store.clear_if(|v| *v == 4));
        assert!(store.is_occupied());
        assert!(store.clear_if(|v| *v == 5));
        assert!(!store.is_occupied());
    }

    #[tokio::test]
    async fn test_all_subscribers_observe() {
        let store = ConfirmationStore::new();
        let mut first = store.subscribe();
        let mut second = store.subscribe();
        assert_eq!(store.subscriber_count(), 2);

        store.try_publish("pending").unwrap();
        first.changed().await.unwrap();
        second.changed().await.unwrap();
        assert_eq!(*first.borrow_and_update(), Some("pending"));
        assert_eq!(*second.borrow_and_update(), Some("pending"));

        assert_eq!(store.clear(), Some("pending"));
        first.changed().await.unwrap();
        assert_eq!(*first.borrow(), None);
    }

    #[test]
    fn test_clear_on_empty_does_not_notify() {
        let store = ConfirmationStore::<u8>::new();
        let receiver = store.subscribe();
        assert_eq!(store.clear(), None);
        assert!(!receiver.has_changed().unwrap());
    }
}
