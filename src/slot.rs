//! Single in-flight user decision shared by the confirmation bridges.
//!
//! A [`DecisionSlot`] pairs the published state of a confirmation (kept in a
//! [`ConfirmationStore`] so views can observe it) with the [`Deferred`] that
//! the view resolves. At most one decision is in flight per slot.

use seqkit_types::deferred::{Deferred, Pending};
use seqkit_types::store::ConfirmationStore;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Anything published into a slot carries the request id it belongs to.
pub(crate) trait Identified {
    fn id(&self) -> &str;
}

struct InFlight<D> {
    id: String,
    deferred: Deferred<D>,
}

pub(crate) struct DecisionSlot<C, D> {
    store: Arc<ConfirmationStore<C>>,
    in_flight: Mutex<Option<InFlight<D>>>,
}

impl<C: Clone + Identified, D> DecisionSlot<C, D> {
    pub fn new(store: Arc<ConfirmationStore<C>>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<ConfirmationStore<C>> {
        &self.store
    }

    pub fn current(&self) -> Option<C> {
        self.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<C>> {
        self.store.subscribe()
    }

    /// Claims the slot for `id`. Fails with the id of the decision already in flight.
    ///
    /// The claim is released when the returned [`Reservation`] is dropped,
    /// including when the awaiting future is cancelled.
    pub fn reserve(&self, id: &str) -> Result<(Reservation<'_, C, D>, Pending<D>), String> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = in_flight.as_ref() {
            return Err(current.id.clone());
        }
        let (deferred, pending) = Deferred::new();
        *in_flight = Some(InFlight {
            id: id.to_owned(),
            deferred,
        });
        let reservation = Reservation {
            slot: self,
            id: id.to_owned(),
        };
        Ok((reservation, pending))
    }

    /// Resolves the decision for `id`. Returns `false` for an unknown or settled id.
    pub fn resolve(&self, id: &str, decision: D) -> bool {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match in_flight.as_ref() {
            Some(current) if current.id == id => current.deferred.resolve(decision),
            _ => false,
        }
    }
}

/// A claim on a [`DecisionSlot`]; publishing goes through it.
pub(crate) struct Reservation<'a, C: Clone + Identified, D> {
    slot: &'a DecisionSlot<C, D>,
    id: String,
}

impl<C: Clone + Identified, D> Reservation<'_, C, D> {
    /// Publishes the confirmation to observers. Fails with the id of whatever
    /// occupies the store, which happens when the store is shared.
    pub fn publish(&self, confirmation: C) -> Result<(), String> {
        self.slot.store.try_publish(confirmation).map_err(|_| {
            self.slot
                .store
                .current()
                .map(|c| c.id().to_owned())
                .unwrap_or_default()
        })
    }
}

impl<C: Clone + Identified, D> Drop for Reservation<'_, C, D> {
    fn drop(&mut self) {
        self.slot.store.clear_if(|c| c.id() == self.id);
        let mut in_flight = self
            .slot
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if in_flight.as_ref().is_some_and(|f| f.id == self.id) {
            *in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ask(&'static str);

    impl Identified for Ask {
        fn id(&self) -> &str {
            self.0
        }
    }

    fn slot() -> DecisionSlot<Ask, bool> {
        DecisionSlot::new(Arc::new(ConfirmationStore::new()))
    }

    #[tokio::test]
    async fn test_reserve_publish_resolve() {
        let slot = slot();
        let (reservation, pending) = slot.reserve("a").unwrap();
        reservation.publish(Ask("a")).unwrap();
        assert_eq!(slot.current(), Some(Ask("a")));
        assert!(!slot.resolve("b", true));
        assert!(slot.resolve("a", true));
        assert!(!slot.resolve("a", false));
        assert_eq!(pending.await, Ok(true));
        drop(reservation);
        assert_eq!(slot.current(), None);
    }

    #[test]
    fn test_second_reservation_rejected() {
        let slot = slot();
        let (_first, _pending) = slot.reserve("a").unwrap();
        assert_eq!(slot.reserve("b").err(), Some("a".to_owned()));
    }

    #[test]
    fn test_drop_releases_slot() {
        let slot = slot();
        {
            let (reservation, _pending) = slot.reserve("a").unwrap();
            reservation.publish(Ask("a")).unwrap();
        }
        assert_eq!(slot.current(), None);
        assert!(slot.reserve("b").is_ok());
    }

    #[test]
    fn test_shared_store_conflict() {
        let store = Arc::new(ConfirmationStore::new());
        let first: DecisionSlot<Ask, bool> = DecisionSlot::new(Arc::clone(&store));
        let second: DecisionSlot<Ask, bool> = DecisionSlot::new(store);
        let (r1, _p1) = first.reserve("a").unwrap();
        r1.publish(Ask("a")).unwrap();
        let (r2, _p2) = second.reserve("b").unwrap();
        assert_eq!(r2.publish(Ask("b")), Err("a".to_owned()));
        drop(r2);
        assert_eq!(first.current(), Some(Ask("a")));
    }
}
