//! Subscribers notified after every wallet update.
//!
//! Notifications carry no payload: subscribers re-read whatever wallet state
//! they care about.

use std::sync::Arc;

/// Receives a call once per successful wallet update, after all of its
/// changes are visible.
pub trait WalletSubscriber: Send + Sync {
    fn receive_wallet_update(&self);
}

impl<F> WalletSubscriber for F
where
    F: Fn() + Send + Sync,
{
    fn receive_wallet_update(&self) {
        self()
    }
}

/// Handle returned by `Wallet::subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Registered subscribers in registration order.
#[derive(Default)]
pub(crate) struct SubscriberSet {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Arc<dyn WalletSubscriber>)>,
}

impl SubscriberSet {
    pub(crate) fn subscribe(&mut self, subscriber: Arc<dyn WalletSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Clone the current list so it can be invoked without holding a lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn WalletSubscriber>> {
        self.subscribers.iter().map(|(_, s)| Arc::clone(s)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
