//! Reactive stores and the store-rooted optics that read and write them.
//!
//! A store owns one root [`Value`] and an ordered set of listeners. Every read
//! and write goes through a [`State`]: an optic rooted in a store. Writes
//! replace the root wholesale and then notify every listener synchronously,
//! in registration order.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use refract::{Derive, SubscribeOptions, create_state, value};
//!
//! let app = create_state(value!({
//!     user: { name: "Ada" },
//!     todos: [],
//! }));
//! let name = app.field("user").field("name");
//! let todos = app.field("todos");
//!
//! let renders = Rc::new(Cell::new(0));
//! let _subscription = name.subscribe_with(
//!     {
//!         let renders = Rc::clone(&renders);
//!         move |_| renders.set(renders.get() + 1)
//!     },
//!     SubscribeOptions::normalized(),
//! );
//!
//! todos.set(value!(["write docs"]));
//! assert_eq!(renders.get(), 0);
//!
//! name.set("Grace");
//! assert_eq!(renders.get(), 1);
//! assert_eq!(name.get(), value!("Grace"));
//! ```

mod options;
mod state;
mod subscription;

pub use options::GetOptions;
pub use options::StateOptions;
pub use options::SubscribeOptions;
pub use state::State;
pub use subscription::Subscription;


use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::Value;

/// Creates a store holding `initial` and returns the optic focused on its root.
pub fn create_state(initial: impl Into<Value>) -> State {
    create_state_with(initial, StateOptions::default())
}

/// Creates a store holding `initial`, configured by `options`.
pub fn create_state_with(initial: impl Into<Value>, options: StateOptions) -> State {
    State::root(Store::new(initial.into(), options.name))
}

// =============================================================================
// StoreId
// =============================================================================

/// Stable identity of a store, shared by every optic derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric value of the id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "store#{}", self.0)
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ListenerId(u64);

pub(crate) type Listener = Rc<dyn Fn()>;

struct StoreInner {
    id: StoreId,
    name: Option<Rc<str>>,
    initial: Value,
    state: RefCell<Value>,
    listeners: RefCell<BTreeMap<ListenerId, Listener>>,
    next_listener: Cell<u64>,
}

/// Shared handle to a store.
#[derive(Clone)]
pub(crate) struct Store(Rc<StoreInner>);

impl Store {
    pub(crate) fn new(initial: Value, name: Option<Rc<str>>) -> Self {
        let id = StoreId::next();
        tracing::trace!(store = %id, name = name.as_deref(), "store created");
        Self(Rc::new(StoreInner {
            id,
            name,
            state: RefCell::new(initial.clone()),
            initial,
            listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(0),
        }))
    }

    pub(crate) fn id(&self) -> StoreId {
        self.0.id
    }

    pub(crate) fn name(&self) -> Option<Rc<str>> {
        self.0.name.clone()
    }

    pub(crate) fn state(&self) -> Value {
        self.0.state.borrow().clone()
    }

    pub(crate) fn initial(&self) -> Value {
        self.0.initial.clone()
    }

    /// Replaces the root and notifies every listener.
    ///
    /// Returns `false`, without notifying, when `next` is the current root.
    pub(crate) fn replace(&self, next: Value) -> bool {
        {
            let mut state = self.0.state.borrow_mut();
            if state.same(&next) {
                return false;
            }
            *state = next;
        }
        tracing::trace!(
            store = %self.0.id,
            name = self.0.name.as_deref(),
            listeners = self.listener_count(),
            "store updated"
        );
        self.notify();
        true
    }

    /// Runs one notification pass.
    ///
    /// The pass works on the listeners registered when it starts. A listener
    /// removed during the pass is skipped if it has not run yet.
    fn notify(&self) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .0
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();
        for (id, listener) in snapshot {
            let registered = self.0.listeners.borrow().contains_key(&id);
            if registered {
                listener();
            }
        }
    }

    pub(crate) fn listen(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.0.next_listener.get());
        self.0.next_listener.set(id.0 + 1);
        self.0.listeners.borrow_mut().insert(id, listener);
        id
    }

    pub(crate) fn unlisten(&self, id: ListenerId) -> bool {
        self.0.listeners.borrow_mut().remove(&id).is_some()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    pub(crate) fn downgrade(&self) -> WeakStore {
        WeakStore(Rc::downgrade(&self.0))
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Store")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish_non_exhaustive()
    }
}

/// A store handle that does not keep the store alive.
#[derive(Clone)]
pub(crate) struct WeakStore(Weak<StoreInner>);

impl WeakStore {
    pub(crate) fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(Store)
    }

    /// Removes a listener if the store is still alive.
    pub(crate) fn unlisten(&self, id: ListenerId) {
        if let Some(store) = self.upgrade() {
            store.unlisten(id);
        }
    }

    /// Returns `true` when this points at `store`.
    pub(crate) fn is(&self, store: &Store) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&store.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;
    use rstest::rstest;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Listener {
        let log = Rc::clone(log);
        Rc::new(move || log.borrow_mut().push(label))
    }

    #[rstest]
    fn test_store_ids_are_unique() {
        let first = Store::new(Value::Undefined, None);
        let second = Store::new(Value::Undefined, None);
        assert_ne!(first.id(), second.id());
    }

    #[rstest]
    fn test_listeners_run_in_registration_order() {
        let store = Store::new(value!(0), None);
        let log = Rc::new(RefCell::new(Vec::new()));
        store.listen(recorder(&log, "first"));
        store.listen(recorder(&log, "second"));
        store.listen(recorder(&log, "third"));

        assert!(store.replace(value!(1)));

        assert_eq!(*log.borrow(), ["first", "second", "third"]);
    }

    #[rstest]
    fn test_replace_with_same_root_does_not_notify() {
        let root = value!({ a: 1 });
        let store = Store::new(root.clone(), None);
        let log = Rc::new(RefCell::new(Vec::new()));
        store.listen(recorder(&log, "listener"));

        assert!(!store.replace(root));
        assert!(log.borrow().is_empty());
    }

    #[rstest]
    fn test_listener_removed_mid_pass_is_skipped() {
        let store = Store::new(value!(0), None);
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim = Rc::new(Cell::new(None));

        store.listen({
            let store = store.downgrade();
            let victim = Rc::clone(&victim);
            let log = Rc::clone(&log);
            Rc::new(move || {
                log.borrow_mut().push("remover");
                if let Some(id) = victim.get() {
                    store.unlisten(id);
                }
            })
        });
        victim.set(Some(store.listen(recorder(&log, "victim"))));

        store.replace(value!(1));

        assert_eq!(*log.borrow(), ["remover"]);
        assert_eq!(store.listener_count(), 1);
    }

    #[rstest]
    fn test_listener_added_mid_pass_waits_for_next_pass() {
        let store = Store::new(value!(0), None);
        let log = Rc::new(RefCell::new(Vec::new()));
        let added = Rc::new(Cell::new(false));

        store.listen({
            let weak = store.downgrade();
            let log = Rc::clone(&log);
            let added = Rc::clone(&added);
            Rc::new(move || {
                if !added.replace(true)
                    && let Some(store) = weak.upgrade()
                {
                    store.listen(recorder(&log, "late"));
                }
            })
        });

        store.replace(value!(1));
        assert!(log.borrow().is_empty());

        store.replace(value!(2));
        assert_eq!(*log.borrow(), ["late"]);
    }
}
