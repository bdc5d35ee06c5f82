//! Per-instance denormalization cache and dependency subscriptions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dependency::hub::{Hub, Source, SubscriberId};
use crate::dependency::resolution::{Context, InstanceId, Resolution};
use crate::dependency::tree::{DependencyTree, denormalize_state, get_dependencies};
use crate::optics::Derive;
use crate::store::{Listener, State, Store, Subscription};
use crate::value::Value;

/// Cached results kept per instance, one for each resolution context.
const MAX_CONTEXTS: usize = 4;

struct Cache {
    context: Context,
    normalized: Value,
    tree: Option<DependencyTree>,
    denormalized: Value,
}

impl Cache {
    fn build(normalized: Value) -> Self {
        let tree = get_dependencies(&normalized);
        let denormalized = tree
            .as_ref()
            .map_or_else(|| normalized.clone(), |tree| denormalize_state(&normalized, tree));
        Self {
            context: Context::default(),
            normalized,
            tree,
            denormalized,
        }
    }

    fn refresh(&mut self) {
        if let Some(tree) = &self.tree
            && tree.refresh()
        {
            self.denormalized = denormalize_state(&self.normalized, tree);
        }
    }
}

/// Clears a flag when dropped.
struct Raised<'a>(&'a Cell<bool>);

impl Drop for Raised<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The dependency state owned by one optic instance.
///
/// Clones of a [`State`] share their tracker; derived optics get their own.
#[derive(Default)]
pub(crate) struct Tracker {
    caches: RefCell<Vec<Cache>>,
    hub: RefCell<Hub>,
    emitting: Cell<bool>,
    pending: Cell<bool>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn id(&self) -> InstanceId {
        std::ptr::from_ref(self).addr()
    }

    /// Reads the focus of `state` with every reference resolved.
    ///
    /// The result is cached: it is recomputed only when the normalized focus
    /// changed or a referenced optic resolves to something new. A reference
    /// that leads back to an optic still being resolved reads as its
    /// normalized focus.
    pub(crate) fn denormalized(&self, state: &State) -> Value {
        self.resolve(state).0
    }

    /// Like [`denormalized`](Self::denormalized), also returning the stores
    /// the result was read from, apart from the store of `state`.
    fn resolve(&self, state: &State) -> (Value, Vec<Store>) {
        let normalized = state.get_normalized();
        let Some((resolution, outer)) = Resolution::enter(self.id(), state.store()) else {
            return (normalized, Vec::new());
        };

        let mut caches = self.caches.take();
        let reused = caches
            .iter()
            .position(|cache| cache.context.fits(&outer))
            .map(|position| caches.swap_remove(position))
            .filter(|cache| !state.optic().focus_changed(&cache.normalized, &normalized));
        let rebuilt = reused.is_none();
        let mut cache = reused.map_or_else(
            || Cache::build(normalized),
            |mut cache| {
                cache.refresh();
                cache
            },
        );

        let (context, cyclic) = resolution.finish();
        if rebuilt && cyclic {
            tracing::warn!(
                store = %state.store_id(),
                path = %state.path(),
                "cyclic reference, the inner occurrence reads as normalized"
            );
        }
        cache.context = context;
        caches.retain(|other| !other.context.same_key(&cache.context));

        let stores = cache
            .context
            .stores()
            .iter()
            .filter(|store| !store.ptr_eq(state.store()))
            .cloned()
            .collect();
        let denormalized = cache.denormalized.clone();
        caches.push(cache);
        if caches.len() > MAX_CONTEXTS {
            caches.remove(0);
        }
        self.caches.replace(caches);
        (denormalized, stores)
    }

    /// Every store whose writes can change what `state` resolves to, its own
    /// store first.
    fn sources(&self, state: &State) -> Vec<Store> {
        let (_, reached) = self.resolve(state);
        std::iter::once(state.store().clone()).chain(reached).collect()
    }

    /// Adds a denormalized subscriber to the optic instance `state`.
    ///
    /// The first subscriber starts listening to the store of `state` and to
    /// every store its references lead to, directly or through other
    /// references.
    pub(crate) fn attach(this: &Rc<Self>, state: &State, listener: Listener) -> Subscription {
        let (id, first) = this.hub.borrow_mut().add(listener);
        if first {
            Self::connect(this, state);
        }
        let tracker = Rc::clone(this);
        Subscription::new(move || tracker.detach(id))
    }

    fn detach(&self, id: SubscriberId) {
        let last = self.hub.borrow_mut().remove(id);
        if last {
            self.disconnect();
        }
    }

    fn connect(this: &Rc<Self>, state: &State) {
        this.hub.borrow_mut().activate();
        Self::sync(this, state);

        tracing::debug!(
            store = %state.store_id(),
            path = %state.path(),
            sources = this.hub.borrow().source_count(),
            "dependency hub connected"
        );
    }

    fn disconnect(&self) {
        let sources = self.hub.borrow_mut().deactivate();
        for source in &sources {
            source.release();
        }
        tracing::debug!(sources = sources.len(), "dependency hub disconnected");
    }

    /// Moves the hub's store listeners onto the stores the focus depends on
    /// now.
    fn sync(this: &Rc<Self>, state: &State) {
        let wanted = this.sources(state);
        let (stale, missing) = this.hub.borrow_mut().diff(&wanted);
        if stale.is_empty() && missing.is_empty() {
            return;
        }

        for source in &stale {
            source.release();
        }
        let added: Vec<Source> = missing
            .into_iter()
            .map(|store| {
                let weak = state.downgrade();
                let tracker = Rc::clone(this);
                let listener = store.listen(Rc::new(move || {
                    if let Some(state) = weak.upgrade() {
                        Self::sync(&tracker, &state);
                        tracker.emit();
                    }
                }));
                Source {
                    store: store.downgrade(),
                    listener,
                }
            })
            .collect();

        tracing::debug!(
            store = %state.store_id(),
            path = %state.path(),
            released = stale.len(),
            added = added.len(),
            "dependency sources retargeted"
        );

        let mut hub = this.hub.borrow_mut();
        if hub.is_active() {
            hub.extend(added);
        } else {
            drop(hub);
            for source in &added {
                source.release();
            }
        }
    }

    /// Runs every denormalized subscriber of this instance.
    ///
    /// A store write made by one of them re-runs the pass after the current
    /// one ends instead of nesting inside it.
    fn emit(&self) {
        if self.emitting.replace(true) {
            self.pending.set(true);
            return;
        }
        let _emitting = Raised(&self.emitting);

        loop {
            self.pending.set(false);
            let snapshot = self.hub.borrow().snapshot();
            for (id, listener) in snapshot {
                let subscribed = self.hub.borrow().contains(id);
                if subscribed {
                    listener();
                }
            }
            if !self.pending.get() {
                break;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.hub.borrow().len()
    }
}
