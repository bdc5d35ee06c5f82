//! Handles returned by `subscribe`.

use std::cell::RefCell;
use std::fmt;

/// A registered listener.
///
/// The listener stays registered until [`unsubscribe`](Self::unsubscribe) is
/// called; dropping the handle does not remove it.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use refract::{create_state, value};
///
/// let counter = create_state(value!(0));
/// let calls = Rc::new(Cell::new(0));
///
/// let subscription = counter.subscribe({
///     let calls = Rc::clone(&calls);
///     move |_| calls.set(calls.get() + 1)
/// });
///
/// counter.set(1);
/// subscription.unsubscribe();
/// subscription.unsubscribe();
/// counter.set(2);
///
/// assert_eq!(calls.get(), 1);
/// ```
pub struct Subscription {
    release: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub(crate) fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: RefCell::new(Some(Box::new(release))),
        }
    }

    /// Removes the listener. Calling this more than once has no effect.
    ///
    /// It is safe to call from inside any listener, including the one being
    /// removed; a removed listener is not invoked again, not even later in the
    /// notification pass that is running.
    pub fn unsubscribe(&self) {
        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }

    /// Returns `true` until [`unsubscribe`](Self::unsubscribe) is called.
    pub fn is_active(&self) -> bool {
        self.release.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
