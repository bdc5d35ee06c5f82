//! Bookkeeping for the denormalized subscribers of one optic instance.
//!
//! The hub only records who is subscribed and which stores it listens to. The
//! [`Tracker`](super::Tracker) drives it, and never calls out to listeners or
//! other stores while the hub is borrowed.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::store::{Listener, ListenerId, Store, WeakStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SubscriberId(u64);

/// A store the hub listens to.
pub(crate) struct Source {
    pub(crate) store: WeakStore,
    pub(crate) listener: ListenerId,
}

impl Source {
    pub(crate) fn release(&self) {
        self.store.unlisten(self.listener);
    }
}

#[derive(Default)]
pub(crate) struct Hub {
    subscribers: BTreeMap<SubscriberId, Listener>,
    next_subscriber: u64,
    active: bool,
    sources: Vec<Source>,
}

impl Hub {
    /// Registers a subscriber. Returns its id and whether it is the first.
    pub(crate) fn add(&mut self, listener: Listener) -> (SubscriberId, bool) {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.insert(id, listener);
        (id, self.subscribers.len() == 1)
    }

    /// Removes a subscriber. Returns `true` when it was the last one and the
    /// hub is still listening.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some() && self.subscribers.is_empty() && self.active
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// The current subscribers, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<(SubscriberId, Listener)> {
        self.subscribers
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect()
    }

    pub(crate) const fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) const fn activate(&mut self) {
        self.active = true;
    }

    /// Splits the sources into those `wanted` no longer names, which are
    /// removed and returned, and the wanted stores not listened to yet.
    pub(crate) fn diff(&mut self, wanted: &[Store]) -> (Vec<Source>, Vec<Store>) {
        let (kept, stale): (Vec<Source>, Vec<Source>) = self
            .sources
            .drain(..)
            .partition(|source| wanted.iter().any(|store| source.store.is(store)));
        let missing = wanted
            .iter()
            .filter(|store| !kept.iter().any(|source| source.store.is(store)))
            .cloned()
            .collect();
        self.sources = kept;
        (stale, missing)
    }

    pub(crate) fn extend(&mut self, sources: Vec<Source>) {
        self.sources.extend(sources);
    }

    pub(crate) fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Stops listening. Returns the sources the caller must release.
    pub(crate) fn deactivate(&mut self) -> Vec<Source> {
        self.active = false;
        std::mem::take(&mut self.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use rstest::rstest;

    #[rstest]
    fn test_remove_reports_last_only_while_active() {
        let mut hub = Hub::default();
        let (first, is_first) = hub.add(Rc::new(|| {}));
        let (second, _) = hub.add(Rc::new(|| {}));
        assert!(is_first);

        hub.activate();
        assert!(!hub.remove(first));
        assert!(hub.remove(second));
        assert!(!hub.remove(second));
    }

    #[rstest]
    fn test_diff_keeps_known_stores() {
        let (kept, dropped, added) = (
            Store::new(Value::Null, None),
            Store::new(Value::Null, None),
            Store::new(Value::Null, None),
        );
        let mut hub = Hub::default();
        hub.extend(
            [&kept, &dropped]
                .into_iter()
                .map(|store| Source {
                    store: store.downgrade(),
                    listener: store.listen(Rc::new(|| {})),
                })
                .collect(),
        );

        let (stale, missing) = hub.diff(&[kept.clone(), added.clone()]);

        assert_eq!(stale.len(), 1);
        assert!(stale[0].store.is(&dropped));
        assert_eq!(missing.len(), 1);
        assert!(missing[0].ptr_eq(&added));
        assert_eq!(hub.source_count(), 1);
    }
}
