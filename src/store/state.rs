//! Store-rooted optics.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use static_assertions::assert_not_impl_any;

use crate::dependency::Tracker;
use crate::optics::{Derive, LensStep, Modifier, Optic, Update};
use crate::store::options::{GetOptions, SubscribeOptions};
use crate::store::subscription::Subscription;
use crate::store::{Store, StoreId, WeakStore};
use crate::value::Value;

/// An optic rooted in a store.
///
/// A `State` reads and writes the store it was derived from. Deriving a new
/// `State` (with [`field`](Derive::field), [`map`](Derive::map), ...) keeps the
/// same store; cloning a `State` keeps the same instance, which shares its
/// denormalization cache and its dependency subscriptions with the original.
///
/// Reads and subscriptions resolve references to other stores by default.
/// Writes always go to the stored, normalized value.
///
/// # Examples
///
/// ```
/// use refract::{Derive, create_state, value};
///
/// let city = create_state(value!({ name: "Lyon", inhabitants: 1000 }));
/// let person = create_state(value!({ name: "Ada", city: (city.clone()) }));
/// let home = person.field("city");
///
/// assert_eq!(home.get(), value!({ name: "Lyon", inhabitants: 1000 }));
/// assert_eq!(home.get_normalized(), value!((city.clone())));
///
/// city.field("inhabitants").set(1001);
/// assert_eq!(home.get().get("inhabitants"), Some(&value!(1001)));
/// ```
#[derive(Clone)]
pub struct State {
    store: Store,
    optic: Optic,
    tracker: Rc<Tracker>,
}

assert_not_impl_any!(State: Send, Sync);

impl State {
    pub(crate) fn root(store: Store) -> Self {
        Self {
            store,
            optic: Optic::new(),
            tracker: Rc::new(Tracker::new()),
        }
    }

    /// Reads the focus with references to other stores resolved.
    pub fn get(&self) -> Value {
        self.get_with(GetOptions::default())
    }

    /// Reads the focus as stored, with references left in place.
    pub fn get_normalized(&self) -> Value {
        self.optic.get(&self.store.state())
    }

    /// Reads the focus.
    pub fn get_with(&self, options: GetOptions) -> Value {
        if options.denormalize {
            self.tracker.denormalized(self)
        } else {
            self.get_normalized()
        }
    }

    /// Replaces the focus and notifies the store's listeners.
    ///
    /// Nothing is notified when the write changes nothing: the focus is
    /// missing, or `value` is already the focus.
    pub fn set(&self, value: impl Into<Value>) {
        self.write(Update::Replace(value.into()));
    }

    /// Replaces the focus with `function` applied to it.
    ///
    /// For mapped optics `function` runs once per focused element. It receives
    /// the stored value, not the resolved one.
    pub fn update<F>(&self, mut function: F)
    where
        F: FnMut(&Value) -> Value,
    {
        self.write(Update::Apply(&mut function));
    }

    fn write(&self, update: Update<'_>) {
        let current = self.store.state();
        let next = self.optic.apply(&current, update);
        self.store.replace(next);
    }

    /// Restores the store's initial value and notifies its listeners.
    pub fn reset(&self) {
        tracing::trace!(store = %self.store.id(), "store reset");
        self.store.replace(self.store.initial());
    }

    /// Calls `listener` with the new focus whenever it changes.
    ///
    /// Equivalent to [`subscribe_with`](Self::subscribe_with) with the default
    /// options, which track referenced stores as well.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Value) + 'static,
    {
        self.subscribe_with(listener, SubscribeOptions::default())
    }

    /// Calls `listener` with the new focus whenever it changes.
    ///
    /// The focus is compared by reference with the previous one, element by
    /// element for mapped optics and structurally for optics that contain a
    /// [`convert`](Derive::convert) step. Writes to unrelated branches of the
    /// store keep this focus's reference and do not call `listener`.
    ///
    /// With `denormalize`, the listener also runs when a referenced store
    /// changes what the focus resolves to.
    pub fn subscribe_with<F>(&self, listener: F, options: SubscribeOptions) -> Subscription
    where
        F: Fn(&Value) + 'static,
    {
        if options.denormalize {
            let previous = RefCell::new(self.get());
            let weak = self.downgrade();
            let on_change = Rc::new(move || {
                if let Some(state) = weak.upgrade() {
                    notify_if_changed(&state.optic, &previous, state.get(), &listener);
                }
            });
            Tracker::attach(&self.tracker, self, on_change)
        } else {
            let previous = RefCell::new(self.get_normalized());
            let store = self.store.downgrade();
            let optic = self.optic.clone();
            let on_change = Rc::new({
                let store = store.clone();
                move || {
                    if let Some(store) = store.upgrade() {
                        let next = optic.get(&store.state());
                        notify_if_changed(&optic, &previous, next, &listener);
                    }
                }
            });
            let id = self.store.listen(on_change);
            Subscription::new(move || store.unlisten(id))
        }
    }

    /// Id of the store this optic is rooted in.
    pub fn store_id(&self) -> StoreId {
        self.store.id()
    }

    /// Name the store was created with, if any.
    pub fn store_name(&self) -> Option<Rc<str>> {
        self.store.name()
    }

    /// Number of listeners currently registered on the store.
    ///
    /// A denormalized subscription registers one listener per optic instance,
    /// however many subscribers share it.
    pub fn listener_count(&self) -> usize {
        self.store.listener_count()
    }

    /// The detached chain this optic applies to its store.
    pub const fn optic(&self) -> &Optic {
        &self.optic
    }

    /// Returns `true` when `other` is a clone of this instance.
    ///
    /// Separately derived optics are distinct instances even when they focus
    /// on the same place.
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.tracker, &other.tracker)
    }

    /// Returns `true` when both optics are rooted in the same store.
    pub fn same_store(&self, other: &Self) -> bool {
        self.store.ptr_eq(&other.store)
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn tracker(&self) -> &Rc<Tracker> {
        &self.tracker
    }

    pub(crate) fn downgrade(&self) -> WeakState {
        WeakState {
            store: self.store.downgrade(),
            optic: self.optic.clone(),
            tracker: Rc::downgrade(&self.tracker),
        }
    }
}

fn notify_if_changed(
    optic: &Optic,
    previous: &RefCell<Value>,
    next: Value,
    listener: &dyn Fn(&Value),
) {
    let changed = optic.focus_changed(&previous.borrow(), &next);
    if changed {
        previous.replace(next.clone());
        listener(&next);
    }
}

impl Derive for State {
    fn steps(&self) -> &[LensStep] {
        self.optic.steps()
    }

    fn modifier(&self) -> Modifier {
        self.optic.modifier()
    }

    fn rebuild(&self, steps: Rc<[LensStep]>, modifier: Modifier) -> Self {
        Self {
            store: self.store.clone(),
            optic: self.optic.rebuild(steps, modifier),
            tracker: Rc::new(Tracker::new()),
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("State")
            .field("store", &self.store.id())
            .field("path", &self.path())
            .field("modifier", &self.modifier())
            .finish()
    }
}

/// A `State` that keeps neither its store nor its tracker alive.
#[derive(Clone)]
pub(crate) struct WeakState {
    store: WeakStore,
    optic: Optic,
    tracker: Weak<Tracker>,
}

impl WeakState {
    pub(crate) fn upgrade(&self) -> Option<State> {
        Some(State {
            store: self.store.upgrade()?,
            optic: self.optic.clone(),
            tracker: self.tracker.upgrade()?,
        })
    }
}
