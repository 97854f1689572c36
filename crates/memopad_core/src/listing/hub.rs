//! Publish/subscribe hub for listing snapshots.
//!
//! # Responsibility
//! - Register/unregister listing subscribers.
//! - Deliver every published snapshot to all live subscribers.
//!
//! # Invariants
//! - A new subscriber immediately receives the current snapshot when one
//!   exists, then every subsequent publish until it unsubscribes.
//! - Subscribers whose receiving side is gone are pruned on the next publish.

use crate::model::note::Note;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Hub-assigned subscriber handle id.
pub type SubscriberId = u64;

/// Shared hub handle used across the controller and its worker.
pub type SharedListingHub = Arc<Mutex<ListingHub>>;

/// Snapshot of the observable listing.
///
/// Exactly two states exist: `Empty` (zero records) and `Populated` (one or
/// more records, ordered `updated_at DESC, id DESC`). There is no loading
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingState {
    Empty,
    Populated(Vec<Note>),
}

impl ListingState {
    /// Builds the snapshot state from an ordered listing.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        if notes.is_empty() {
            Self::Empty
        } else {
            Self::Populated(notes)
        }
    }

    /// Returns the snapshot contents; empty slice for `Empty`.
    pub fn notes(&self) -> &[Note] {
        match self {
            Self::Empty => &[],
            Self::Populated(notes) => notes,
        }
    }

    pub fn len(&self) -> usize {
        self.notes().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Subscriber registry and snapshot fan-out.
#[derive(Debug, Default)]
pub struct ListingHub {
    subscribers: BTreeMap<SubscriberId, Sender<ListingState>>,
    next_subscriber_id: SubscriberId,
    last_published: Option<ListingState>,
}

impl ListingHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one subscriber and returns its receiving end.
    ///
    /// The current snapshot, when one exists, is replayed to the new
    /// subscriber before any live publishes arrive.
    pub fn subscribe(&mut self) -> (SubscriberId, Receiver<ListingState>) {
        let (sender, receiver) = unbounded();
        if let Some(state) = &self.last_published {
            // Receiver cannot be disconnected yet; ignore the impossible error.
            let _ = sender.send(state.clone());
        }

        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.insert(id, sender);
        (id, receiver)
    }

    /// Removes one subscriber. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Delivers a snapshot to every live subscriber and prunes dead ones.
    pub fn publish(&mut self, state: ListingState) {
        let mut disconnected = Vec::new();
        for (id, sender) in &self.subscribers {
            if sender.send(state.clone()).is_err() {
                disconnected.push(*id);
            }
        }
        for id in disconnected {
            self.subscribers.remove(&id);
        }
        self.last_published = Some(state);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns the most recently published snapshot.
    pub fn last_published(&self) -> Option<&ListingState> {
        self.last_published.as_ref()
    }
}

/// Subscription handle tied to a shared hub.
///
/// Dropping the handle unsubscribes it.
#[derive(Debug)]
pub struct ListingSubscription {
    id: SubscriberId,
    receiver: Receiver<ListingState>,
    hub: SharedListingHub,
}

impl ListingSubscription {
    pub(crate) fn register(hub: SharedListingHub) -> Self {
        let (id, receiver) = lock_hub(&hub).subscribe();
        Self { id, receiver, hub }
    }

    /// Blocks until the next snapshot. `None` when no publisher remains.
    pub fn recv(&self) -> Option<ListingState> {
        self.receiver.recv().ok()
    }

    /// Blocks up to `timeout` for the next snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ListingState> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Returns a pending snapshot without blocking.
    pub fn try_recv(&self) -> Option<ListingState> {
        self.receiver.try_recv().ok()
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for ListingSubscription {
    fn drop(&mut self) {
        lock_hub(&self.hub).unsubscribe(self.id);
    }
}

/// Locks the shared hub, recovering from poisoning.
///
/// The hub holds plain registry data that stays consistent even when a
/// publisher panicked while holding the lock.
pub(crate) fn lock_hub(hub: &SharedListingHub) -> MutexGuard<'_, ListingHub> {
    hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{lock_hub, ListingHub, ListingState, ListingSubscription};
    use crate::model::note::Note;
    use std::sync::{Arc, Mutex};

    fn sample_note(id: i64, title: &str) -> Note {
        Note {
            id,
            title: title.to_string(),
            content: String::new(),
            is_completed: false,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn from_notes_maps_empty_and_populated_states() {
        assert!(ListingState::from_notes(vec![]).is_empty());

        let populated = ListingState::from_notes(vec![sample_note(1, "a")]);
        assert!(!populated.is_empty());
        assert_eq!(populated.len(), 1);
        assert_eq!(populated.notes()[0].title, "a");
    }

    #[test]
    fn subscriber_receives_every_publish() {
        let mut hub = ListingHub::new();
        let (_, receiver) = hub.subscribe();

        hub.publish(ListingState::Empty);
        hub.publish(ListingState::from_notes(vec![sample_note(1, "a")]));

        assert_eq!(receiver.recv().unwrap(), ListingState::Empty);
        assert_eq!(receiver.recv().unwrap().len(), 1);
    }

    #[test]
    fn late_subscriber_gets_current_snapshot_replayed() {
        let mut hub = ListingHub::new();
        hub.publish(ListingState::from_notes(vec![sample_note(7, "existing")]));

        let (_, receiver) = hub.subscribe();
        let replayed = receiver.try_recv().unwrap();
        assert_eq!(replayed.notes()[0].id, 7);
    }

    #[test]
    fn unsubscribed_handle_stops_receiving() {
        let mut hub = ListingHub::new();
        let (id, receiver) = hub.subscribe();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));

        hub.publish(ListingState::Empty);
        assert!(receiver.try_recv().is_err());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned_on_publish() {
        let mut hub = ListingHub::new();
        let (_, receiver) = hub.subscribe();
        drop(receiver);

        hub.publish(ListingState::Empty);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn dropping_subscription_handle_unsubscribes() {
        let hub = Arc::new(Mutex::new(ListingHub::new()));
        let subscription = ListingSubscription::register(Arc::clone(&hub));
        assert_eq!(lock_hub(&hub).subscriber_count(), 1);

        drop(subscription);
        assert_eq!(lock_hub(&hub).subscriber_count(), 0);
    }
}
